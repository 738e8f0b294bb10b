// SPDX-License-Identifier: Apache-2.0

//! bbnotify - email your team about merged Bitbucket pull requests.
//!
//! Searches a repository for recently merged pull requests, groups them by
//! destination branch, links and transitions their Jira tickets and sends
//! the list through Gmail.

mod cli;
mod commands;
mod errors;
mod logging;
mod output;
mod table;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, OutputContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let output_ctx = OutputContext::from_cli(cli.output, cli.quiet, cli.verbose);

    match commands::run(cli.command, output_ctx, cli.config.as_deref()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let formatted = errors::format_error(&e);
            eprintln!("Error: {formatted}");
            std::process::exit(1);
        }
    }
}
