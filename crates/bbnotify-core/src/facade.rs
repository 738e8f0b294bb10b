// SPDX-License-Identifier: Apache-2.0

//! High-level operations shared by front ends.
//!
//! Each function composes the Bitbucket token holder, the ticket linker, the
//! pull request fetcher and the notifier from an [`AppConfig`] and a
//! [`CredentialStore`], so callers only deal with configuration and results.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::bitbucket::{
    FetchOptions, GroupedPullRequests, PullRequestFetcher, Repository, SearchFilter, SearchQuery,
};
use crate::config::{AppConfig, NotificationConfig};
use crate::error::NotifyError;
use crate::jira::{JiraClient, transition_options};
use crate::notify::{Envelope, GmailMailer, Notifier, render_html};
use crate::oauth::OAuthClient;
use crate::store::CredentialStore;

/// Per-run overrides of the `notification` section.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Fetch and render only; send nothing and transition nothing.
    pub dry_run: bool,
    /// Transition the reported tickets when a transition id is configured.
    pub transition: bool,
    /// Overrides `sinceHours`.
    pub since_hours: Option<u32>,
    /// Overrides `destinationBranch`.
    pub branch: Option<String>,
    /// Overrides `query`.
    pub query: Option<String>,
}

/// Outcome of one ticket transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    /// Ticket id.
    pub issue_id: String,
    /// Failure message; `None` when the transition succeeded.
    pub error: Option<String>,
}

/// Result of a notification run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    /// Pull requests found, grouped by destination branch.
    pub grouped: GroupedPullRequests,
    /// Rendered email body; `None` when nothing was found.
    pub html: Option<String>,
    /// Transport message id; `None` for dry runs and empty results.
    pub message_id: Option<String>,
    /// Transition attempts, in ticket order.
    pub transitioned: Vec<TransitionOutcome>,
}

/// Creates the Bitbucket token holder persisting through `store`.
///
/// # Errors
///
/// Returns [`NotifyError::MissingCredential`] for an empty credential field.
pub fn bitbucket_oauth(
    config: &AppConfig,
    store: Arc<CredentialStore>,
) -> Result<Arc<OAuthClient>, NotifyError> {
    let credentials = config.bitbucket.credentials()?;
    Ok(Arc::new(OAuthClient::new(
        credentials,
        &config.bitbucket.oauth_url,
        store,
    )))
}

/// Creates the Jira client, if the `jira` section is present.
#[must_use]
pub fn jira_client(config: &AppConfig) -> Option<JiraClient> {
    config.jira.as_ref().map(JiraClient::from_config)
}

/// Builds the search query for a run at `now`.
///
/// `updatedOn` is `now - sinceHours` in RFC 3339 with seconds precision.
#[must_use]
pub fn search_query(
    notification: &NotificationConfig,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> SearchQuery {
    let since_hours = options.since_hours.unwrap_or(notification.since_hours);
    let updated_on = now - Duration::hours(i64::from(since_hours));

    SearchQuery::from_parts(
        options.query.clone().or_else(|| notification.query.clone()),
        SearchFilter {
            state: Some(notification.state.clone()).filter(|s| !s.is_empty()),
            updated_on: Some(updated_on.to_rfc3339_opts(SecondsFormat::Secs, true)),
            destination_branch: options
                .branch
                .clone()
                .or_else(|| notification.destination_branch.clone()),
        },
    )
}

/// Fetches the grouped pull requests for a run without notifying anyone.
///
/// # Errors
///
/// Propagates configuration, validation and fetch failures.
#[instrument(skip_all, fields(owner = %config.notification.owner, repo = %config.notification.repo_slug))]
pub async fn fetch_pull_requests(
    config: &AppConfig,
    store: Arc<CredentialStore>,
    options: &RunOptions,
) -> Result<GroupedPullRequests, NotifyError> {
    let notification = &config.notification;
    let repository = Repository::new(&notification.owner, &notification.repo_slug)?;

    let mut fetch_options = FetchOptions::with_pattern(&notification.ticket_pattern)?;
    if notification.add_ticket_links {
        match jira_client(config) {
            Some(jira) if jira.domain().is_some() => {
                fetch_options = fetch_options.with_ticket_links(Arc::new(jira));
            }
            _ => warn!("Ticket links requested but no Jira domain is configured"),
        }
    }

    let fetcher = PullRequestFetcher::new(
        bitbucket_oauth(config, store)?,
        repository,
        &config.bitbucket.api_url,
        fetch_options,
    );

    fetcher
        .get_pull_requests(&search_query(notification, options, Utc::now()))
        .await
}

/// Runs one notification cycle: fetch, render, send, transition.
///
/// Nothing is sent for an empty result. Dry runs stop after rendering.
///
/// # Errors
///
/// Propagates configuration, fetch, rendering and send failures. Failed
/// transitions do not fail the run; they are listed in the report.
#[instrument(skip_all, fields(dry_run = options.dry_run))]
pub async fn run_notification(
    config: &AppConfig,
    store: Arc<CredentialStore>,
    options: &RunOptions,
) -> Result<NotificationReport, NotifyError> {
    let grouped = fetch_pull_requests(config, store.clone(), options).await?;
    let mut report = NotificationReport {
        grouped,
        html: None,
        message_id: None,
        transitioned: Vec::new(),
    };
    if report.grouped.is_empty() {
        info!("No pull requests found");
        return Ok(report);
    }

    let template = load_template(&config.notification)?;
    if options.dry_run {
        report.html = Some(render_html(&report.grouped, template.as_deref())?);
        return Ok(report);
    }

    let envelope = Envelope::from_config(&config.notification)?;
    let mailer = GmailMailer::from_config(config.require_gmail()?, store)?;
    let notifier = Notifier::new(Arc::new(mailer)).with_template(template);

    if let Some(delivery) = notifier.notify(&report.grouped, &envelope).await? {
        report.html = Some(delivery.html);
        report.message_id = Some(delivery.message_id);
    }

    if options.transition
        && let Some(transition_id) = config.notification.transition_id.as_deref()
    {
        let ids: Vec<String> = report
            .grouped
            .ticket_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        report.transitioned = transition_tickets(config, &ids, transition_id).await?;
    }

    Ok(report)
}

/// Transitions every ticket in `issue_ids`, continuing past failures.
///
/// # Errors
///
/// Returns [`NotifyError::MissingSection`] when `jira` is not configured.
#[instrument(skip(config, issue_ids), fields(count = issue_ids.len()))]
pub async fn transition_tickets(
    config: &AppConfig,
    issue_ids: &[String],
    transition_id: &str,
) -> Result<Vec<TransitionOutcome>, NotifyError> {
    let jira = jira_client(config).ok_or(NotifyError::MissingSection { section: "jira" })?;
    let options = transition_options(transition_id);

    let mut outcomes = Vec::with_capacity(issue_ids.len());
    for issue_id in issue_ids {
        let error = match jira.transition_issue(issue_id, &options).await {
            Ok(()) => None,
            Err(e) => {
                warn!(issue_id = %issue_id, error = %e, "Transition failed");
                Some(e.to_string())
            }
        };
        outcomes.push(TransitionOutcome {
            issue_id: issue_id.clone(),
            error,
        });
    }
    Ok(outcomes)
}

/// Obtains a new Bitbucket token pair and persists it.
///
/// # Errors
///
/// Propagates [`OAuthClient::obtain_tokens`] failures.
pub async fn obtain_bitbucket_tokens(
    config: &AppConfig,
    store: Arc<CredentialStore>,
) -> Result<(), NotifyError> {
    bitbucket_oauth(config, store)?.obtain_tokens().await
}

/// Refreshes the Bitbucket access token and persists it.
///
/// # Errors
///
/// Propagates [`OAuthClient::refresh_tokens`] failures.
pub async fn refresh_bitbucket_tokens(
    config: &AppConfig,
    store: Arc<CredentialStore>,
) -> Result<(), NotifyError> {
    bitbucket_oauth(config, store)?.refresh_tokens().await
}

fn load_template(notification: &NotificationConfig) -> Result<Option<String>, NotifyError> {
    let Some(path) = &notification.template else {
        return Ok(None);
    };
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| NotifyError::Template {
            message: format!("cannot read template {}: {e}", path.display()),
        })
}
