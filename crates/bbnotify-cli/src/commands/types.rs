// SPDX-License-Identifier: Apache-2.0

//! Result types returned by command handlers.
//!
//! These types allow command handlers to return data instead of printing
//! directly, improving testability and separation of concerns.

use bbnotify_core::{GroupedPullRequests, NotificationReport};
use serde::Serialize;

/// Result from the pulls command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PullsResult {
    /// Repository searched (`owner/repo_slug`).
    pub repository: String,
    /// Pull requests grouped by destination branch.
    pub pull_requests: GroupedPullRequests,
    /// Total pull request count.
    pub total_count: usize,
}

/// Result from the notify command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NotifyResult {
    /// What was found, sent and transitioned.
    pub report: NotificationReport,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Whether the user declined the transition prompt.
    pub transitions_declined: bool,
}

/// Result from the auth commands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthResult {
    /// Grant that was run (`obtain` or `refresh`).
    pub action: &'static str,
    /// Where the new tokens were written.
    pub config_path: String,
}

/// Result from the transition command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TransitionResult {
    /// Ticket id.
    pub issue_id: String,
    /// Transition applied.
    pub transition_id: String,
}
