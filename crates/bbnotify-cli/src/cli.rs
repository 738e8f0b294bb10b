// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for bbnotify.
//!
//! Uses clap's derive API for declarative CLI parsing.

use std::io::IsTerminal;
use std::path::PathBuf;

use bbnotify_core::RunOptions;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Extended help text for the generate subcommand with shell-specific examples.
const COMPLETION_GENERATE_HELP: &str = r#"EXAMPLES

  bash
    Add to ~/.bashrc or ~/.bash_profile:
      eval "$(bbnotify completion generate bash)"

  zsh
    Generate completion file:
      mkdir -p ~/.zsh/completions
      bbnotify completion generate zsh > ~/.zsh/completions/_bbnotify

  fish
    Generate completion file:
      bbnotify completion generate fish > ~/.config/fish/completions/bbnotify.fish
"#;

/// Output format for CLI results.
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors (default)
    #[default]
    Text,
    /// JSON output for programmatic consumption
    Json,
    /// YAML output for programmatic consumption
    Yaml,
}

/// Global output configuration passed to commands.
#[derive(Clone)]
pub struct OutputContext {
    /// Output format (text, json, yaml)
    pub format: OutputFormat,
    /// Suppress non-essential output (spinners, prompts)
    pub quiet: bool,
    /// Enable verbose output
    pub verbose: bool,
    /// Whether stdout is a terminal (TTY)
    pub is_tty: bool,
}

impl OutputContext {
    /// Creates an `OutputContext` from CLI arguments.
    pub fn from_cli(format: OutputFormat, quiet: bool, verbose: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Returns true if interactive elements (spinners, prompts) should be shown.
    pub fn is_interactive(&self) -> bool {
        self.is_tty && !self.quiet && matches!(self.format, OutputFormat::Text)
    }
}

/// bbnotify - email your team about merged Bitbucket pull requests.
///
/// Searches a Bitbucket repository for recently merged pull requests, groups
/// them by destination branch, links their Jira tickets and sends the list
/// through Gmail.
#[derive(Parser)]
#[command(name = "bbnotify")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/bbnotify/config.json)
    #[arg(long, short = 'c', global = true, env = "BBNOTIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (text, json, yaml)
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Suppress non-essential output (spinners, prompts)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (info-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Search overrides shared by `notify` and `pulls`.
#[derive(Args, Clone, Default)]
pub struct SearchArgs {
    /// Look-back window in hours (overrides `sinceHours`)
    #[arg(long)]
    pub since_hours: Option<u32>,

    /// Destination branch (overrides `destinationBranch`)
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Raw Bitbucket filter expression (overrides every structured field)
    #[arg(long)]
    pub query: Option<String>,
}

impl SearchArgs {
    /// Converts the overrides into run options.
    pub fn into_run_options(self, dry_run: bool, transition: bool) -> RunOptions {
        RunOptions {
            dry_run,
            transition,
            since_hours: self.since_hours,
            branch: self.branch,
            query: self.query,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Email the merged pull requests and transition their tickets
    Notify {
        #[command(flatten)]
        search: SearchArgs,

        /// Fetch and render only; send nothing
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt before transitioning tickets
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List the merged pull requests without sending anything
    Pulls {
        #[command(flatten)]
        search: SearchArgs,
    },

    /// Manage Bitbucket OAuth tokens
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Transition a single Jira ticket
    Transition {
        /// Ticket id (e.g. FOO-123)
        #[arg(value_name = "ISSUE")]
        issue: String,

        /// Jira transition id
        #[arg(long)]
        id: String,
    },

    /// Generate shell completion scripts
    #[command(subcommand)]
    Completion(CompletionCommand),
}

/// Authentication subcommands
#[derive(Subcommand)]
pub enum AuthCommand {
    /// Obtain a new token pair (client-credentials grant)
    Obtain,

    /// Refresh the access token (refresh-token grant)
    Refresh,
}

/// Completion subcommands
#[derive(Subcommand)]
pub enum CompletionCommand {
    /// Generate completion script for a shell (output to stdout)
    #[command(after_long_help = COMPLETION_GENERATE_HELP)]
    Generate {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
