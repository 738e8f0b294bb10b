// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # bbnotify Core
//!
//! Core library for bbnotify - email your team about merged Bitbucket pull
//! requests.
//!
//! This crate provides reusable components for:
//! - A JSON credential store that persists exchanged OAuth tokens
//! - Bitbucket OAuth (client-credentials and refresh-token grants)
//! - Paginated pull request search with a single refresh-and-retry
//! - Jira browse links and issue transitions
//! - HTML rendering and delivery through Gmail
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bbnotify_core::{RunOptions, load_config, run_notification};
//!
//! # async fn example() -> bbnotify_core::Result<()> {
//! let (store, config) = load_config(None)?;
//! let report = run_notification(&config, Arc::new(store), &RunOptions::default()).await?;
//! println!("{} pull requests reported", report.grouped.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`bitbucket`] - Repository coordinates, search queries, pull request fetching
//! - [`config`] - Typed configuration sections and paths
//! - [`credentials`] - Validated OAuth credentials
//! - [`error`] - Error types
//! - [`jira`] - Ticket links and transitions
//! - [`notify`] - Email rendering and transport
//! - [`oauth`] - Token holder
//! - [`retry`] - Refresh-and-retry combinator
//! - [`store`] - JSON credential store

// ============================================================================
// Error Handling
// ============================================================================

pub use error::NotifyError;

/// Convenience Result type for bbnotify operations.
///
/// This is equivalent to `std::result::Result<T, NotifyError>`.
pub type Result<T> = std::result::Result<T, NotifyError>;

// ============================================================================
// Configuration and Storage
// ============================================================================

pub use config::{
    AppConfig, BitbucketConfig, GmailConfig, JiraConfig, NotificationConfig, config_dir,
    config_file_path, load_config, resolve_config_path,
};
pub use store::{CredentialStore, StoreEntry, TokenPatch};

// ============================================================================
// Authentication
// ============================================================================

pub use credentials::Credentials;
pub use oauth::{OAuthClient, TokenExchangeResult};
pub use retry::{MAX_TOKEN_REFRESHES, with_token_refresh};

// ============================================================================
// Pull Requests and Tickets
// ============================================================================

pub use bitbucket::{
    Author, BranchGroup, FetchOptions, GroupedPullRequests, PullRequestFetcher, Repository,
    SearchFilter, SearchQuery, SerializedPullRequest,
};
pub use jira::{JiraClient, NoTicketLinks, TicketLinker};

// ============================================================================
// Notification
// ============================================================================

pub use notify::{
    Delivery, EmailMessage, Envelope, GmailMailer, MailTransport, Notifier, Recipients,
    render_html,
};

// ============================================================================
// Platform API (Facade)
// ============================================================================

pub use facade::{
    NotificationReport, RunOptions, TransitionOutcome, fetch_pull_requests,
    obtain_bitbucket_tokens, refresh_bitbucket_tokens, run_notification, transition_tickets,
};

pub mod bitbucket;
pub mod config;
pub mod credentials;
pub mod error;
pub mod facade;
pub mod jira;
pub mod notify;
pub mod oauth;
pub mod retry;
pub mod store;
