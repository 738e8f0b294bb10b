// SPDX-License-Identifier: Apache-2.0

//! Full notification cycle with an optional transition prompt.

use std::sync::Arc;

use anyhow::{Context, Result};
use bbnotify_core::{AppConfig, CredentialStore, run_notification, transition_tickets};
use dialoguer::Confirm;
use tracing::info;

use super::maybe_spinner;
use super::types::NotifyResult;
use crate::cli::{OutputContext, SearchArgs};

/// Runs the notification cycle.
///
/// Ticket transitions are confirmed interactively unless `yes` is set or the
/// session is not interactive.
pub async fn run(
    config: &AppConfig,
    store: Arc<CredentialStore>,
    search: SearchArgs,
    dry_run: bool,
    yes: bool,
    ctx: &OutputContext,
) -> Result<NotifyResult> {
    let transition_id = config.notification.transition_id.clone();
    let ask_first = transition_id.is_some() && !yes && !dry_run && ctx.is_interactive();
    let options = search.into_run_options(dry_run, !ask_first);

    let spinner = maybe_spinner(ctx, "Collecting merged pull requests...");
    let report = run_notification(config, store, &options).await;
    if let Some(s) = spinner {
        s.finish_and_clear();
    }
    let mut report = report?;

    let mut transitions_declined = false;
    if ask_first
        && report.message_id.is_some()
        && let Some(transition_id) = transition_id
    {
        let ids: Vec<String> = report
            .grouped
            .ticket_ids()
            .into_iter()
            .map(str::to_string)
            .collect();

        if !ids.is_empty() {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Transition {} ticket(s) ({}) with transition {transition_id}?",
                    ids.len(),
                    ids.join(", ")
                ))
                .default(false)
                .interact()
                .context("Failed to get user confirmation")?;

            if confirmed {
                report.transitioned = transition_tickets(config, &ids, &transition_id).await?;
            } else {
                info!("User declined ticket transitions");
                transitions_declined = true;
            }
        }
    }

    Ok(NotifyResult {
        report,
        dry_run,
        transitions_declined,
    })
}
