// SPDX-License-Identifier: Apache-2.0

//! Error types for bbnotify.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Application code should use `anyhow::Result` for top-level error handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during bbnotify operations.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The credential store file could not be read.
    #[error("Cannot read configuration file {}", path.display())]
    ConfigUnreadable {
        /// Location of the store.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The credential store file is not a valid JSON object.
    #[error("Cannot parse configuration file {}: {message}", path.display())]
    ConfigMalformed {
        /// Location of the store.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The credential store could not be written back to disk.
    #[error("Cannot write configuration file {}: {message}", path.display())]
    ConfigWriteFailed {
        /// Location of the store.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A required configuration section is absent.
    #[error("Configuration section `{section}` is missing")]
    MissingSection {
        /// Top-level key of the section.
        section: &'static str,
    },

    /// A configuration section has the wrong shape.
    #[error("Invalid `{section}` configuration: {message}")]
    InvalidSection {
        /// Top-level key of the section.
        section: String,
        /// Error message.
        message: String,
    },

    /// A credential field was empty or missing.
    #[error("{service} {field} is missing")]
    MissingCredential {
        /// Service the credential belongs to (e.g. `bitbucket`).
        service: String,
        /// Human readable field name.
        field: &'static str,
    },

    /// Client-credentials grant failed.
    #[error("Cannot fetch {service} client tokens: {message}")]
    TokenFetchFailed {
        /// Service whose tokens were requested.
        service: String,
        /// Error message.
        message: String,
    },

    /// Refresh-token grant failed.
    #[error("Cannot refresh {service} access token by given refresh token {refresh_token}: {message}")]
    TokenRefreshFailed {
        /// Service whose token was refreshed.
        service: String,
        /// Redacted form of the refresh token that was used.
        refresh_token: String,
        /// Error message.
        message: String,
    },

    /// Ticket tracker username or authorisation token is not configured.
    #[error("Jira {field} is missing. Please check your configuration")]
    MissingCredentials {
        /// Which credential is missing.
        field: &'static str,
    },

    /// A transition was requested without an issue id.
    #[error("Issue id is missing")]
    MissingIssueId,

    /// A transition was requested without options.
    #[error("Transition options are missing")]
    MissingOptions,

    /// The ticket tracker rejected or failed the transition request.
    #[error("Cannot transition issue {issue_id} with transition {transition_id}: {message}")]
    TransitionFailed {
        /// Issue the transition was requested for.
        issue_id: String,
        /// Attempted transition id (`unknown` if the options had none).
        transition_id: String,
        /// Error message.
        message: String,
    },

    /// Repository coordinate is incomplete.
    #[error("{field} is missing")]
    InvalidRepository {
        /// Which part of the coordinate is missing.
        field: &'static str,
    },

    /// Ticket id pattern is not a valid regular expression.
    #[error("Invalid ticket id pattern: {0}")]
    InvalidTicketPattern(#[from] regex::Error),

    /// Neither a raw filter nor any structured search field was supplied.
    #[error("Missing search parameters")]
    MissingSearchParameters,

    /// The pull request search request failed.
    #[error("Cannot fetch pull requests (page {page}): {message}")]
    PullRequestFetch {
        /// Page that was being requested.
        page: u32,
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// A pull request page could not be parsed.
    #[error("Cannot parse pull requests (page {page})")]
    PullRequestParseFailed {
        /// Page that was being parsed.
        page: u32,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The operation failed again after its single refresh-and-retry.
    #[error("Maximum number of refresh token retries exceeded: {source}")]
    RetryLimitExceeded {
        /// Failure of the last attempt.
        #[source]
        source: Box<NotifyError>,
    },

    /// The operation failed and the token refresh meant to recover it failed too.
    #[error("Cannot refresh access token: {source}")]
    TokenRefreshUnavailable {
        /// Failure of the refresh.
        #[source]
        source: Box<NotifyError>,
    },

    /// Email template could not be compiled or rendered.
    #[error("Email template error: {message}")]
    Template {
        /// Error message.
        message: String,
    },

    /// Email message is incomplete.
    #[error("Invalid email: {reason}")]
    InvalidMessage {
        /// What is missing.
        reason: &'static str,
    },

    /// The mail transport rejected the message.
    #[error("Cannot send email: {message}")]
    EmailSendFailed {
        /// HTTP status, if a response was received.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl NotifyError {
    /// Whether a token refresh followed by a retry may recover this failure.
    ///
    /// Transport and HTTP-status failures qualify; parse and validation
    /// failures do not, since a fresh token cannot change their outcome.
    #[must_use]
    pub fn is_refreshable(&self) -> bool {
        matches!(
            self,
            NotifyError::PullRequestFetch { .. }
                | NotifyError::EmailSendFailed { .. }
                | NotifyError::Network(_)
        )
    }
}

/// Redacts a secret for inclusion in an error message, keeping the last four characters.
#[must_use]
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
