// SPDX-License-Identifier: Apache-2.0

//! Command handlers for the bbnotify CLI.

pub mod auth;
pub mod completion;
pub mod notify;
pub mod pulls;
pub mod transition;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bbnotify_core::{AppConfig, CredentialStore, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::cli::{AuthCommand, Commands, CompletionCommand, OutputContext};
use crate::output;

/// Creates a styled spinner (only if interactive).
fn maybe_spinner(ctx: &OutputContext, message: &str) -> Option<ProgressBar> {
    if !ctx.is_interactive() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Loads the store and typed configuration.
fn load(config_path: Option<&Path>) -> Result<(Arc<CredentialStore>, AppConfig)> {
    let (store, config) = load_config(config_path)?;
    debug!(path = %store.path().display(), "Configuration loaded");
    Ok((Arc::new(store), config))
}

/// Dispatch to the appropriate command handler.
pub async fn run(command: Commands, ctx: OutputContext, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Notify {
            search,
            dry_run,
            yes,
        } => {
            let (store, config) = load(config_path)?;
            let result = notify::run(&config, store, search, dry_run, yes, &ctx).await?;
            output::render(&result, &ctx)
        }

        Commands::Pulls { search } => {
            let (store, config) = load(config_path)?;
            let spinner = maybe_spinner(&ctx, "Fetching pull requests...");
            let result = pulls::run(&config, store, search).await;
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            output::render(&result?, &ctx)
        }

        Commands::Auth(auth_cmd) => {
            let (store, config) = load(config_path)?;
            let result = match auth_cmd {
                AuthCommand::Obtain => auth::run_obtain(&config, store).await?,
                AuthCommand::Refresh => auth::run_refresh(&config, store).await?,
            };
            output::render(&result, &ctx)
        }

        Commands::Transition { issue, id } => {
            let (_store, config) = load(config_path)?;
            let result = transition::run(&config, issue, id).await?;
            output::render(&result, &ctx)
        }

        Commands::Completion(completion_cmd) => match completion_cmd {
            CompletionCommand::Generate { shell } => completion::run_generate(shell),
        },
    }
}
