// SPDX-License-Identifier: Apache-2.0

//! Jira ticket references.
//!
//! Computes browse URLs for ticket ids found in pull request titles and
//! requests workflow transitions for them. A client without a domain is inert:
//! it produces no URLs. Pull request serialisation goes through the
//! [`TicketLinker`] seam so that disabled linking is a [`NoTicketLinks`]
//! value chosen once at composition time.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::config::JiraConfig;
use crate::error::NotifyError;

/// Produces a link for a ticket id, if linking is possible.
pub trait TicketLinker: Send + Sync {
    /// Returns the browse URL for `ticket_id`, or `None` when unavailable.
    fn ticket_url(&self, ticket_id: &str) -> Option<String>;
}

/// Linker used when ticket links are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTicketLinks;

impl TicketLinker for NoTicketLinks {
    fn ticket_url(&self, _ticket_id: &str) -> Option<String> {
        None
    }
}

/// Builds the transition options body `{"transition": {"id": ...}}`.
#[must_use]
pub fn transition_options(transition_id: &str) -> Value {
    json!({ "transition": { "id": transition_id } })
}

/// Jira Cloud client for browse links and issue transitions.
#[derive(Debug, Clone)]
pub struct JiraClient {
    domain: Option<String>,
    base_url: Option<String>,
    username: Option<String>,
    token: Option<SecretString>,
    http: reqwest::Client,
}

impl JiraClient {
    /// Creates a client for `{domain}.atlassian.net`; `None` makes it inert.
    #[must_use]
    pub fn new(domain: Option<String>) -> Self {
        Self {
            domain: domain.filter(|d| !d.trim().is_empty()),
            base_url: None,
            username: None,
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Creates a client from the `jira` configuration section.
    #[must_use]
    pub fn from_config(config: &JiraConfig) -> Self {
        let mut client = Self::new(config.domain.clone());
        client.username = config.username.clone().filter(|u| !u.is_empty());
        client.token = config
            .authorisation_token
            .clone()
            .filter(|t| !t.is_empty())
            .map(SecretString::from);
        client.base_url = config.base_url.clone();
        client
    }

    /// Sets the account used for transitions.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, token: SecretString) -> Self {
        self.username = Some(username.into());
        self.token = Some(token);
        self
    }

    /// Overrides the REST root (defaults to `https://{domain}.atlassian.net`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Configured Atlassian site name.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns `https://{domain}.atlassian.net/browse/{ticket_id}`.
    ///
    /// `None` when either the domain or the ticket id is absent.
    #[must_use]
    pub fn generate_browse_url(&self, ticket_id: Option<&str>) -> Option<String> {
        let domain = self.domain.as_deref()?;
        let ticket_id = ticket_id.filter(|id| !id.is_empty())?;
        Some(format!("https://{domain}.atlassian.net/browse/{ticket_id}"))
    }

    /// Requests a workflow transition for `issue_id`.
    ///
    /// `options` is posted verbatim as the JSON body, normally built with
    /// [`transition_options`]. Jira answers `204 No Content` on success.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::MissingCredentials`] without a username or token
    /// - [`NotifyError::MissingIssueId`] for an empty `issue_id`
    /// - [`NotifyError::MissingOptions`] for `null` or an empty object
    /// - [`NotifyError::TransitionFailed`] on transport or non-success status
    #[instrument(skip(self, options), fields(domain = ?self.domain))]
    pub async fn transition_issue(&self, issue_id: &str, options: &Value) -> Result<(), NotifyError> {
        let username = self
            .username
            .as_deref()
            .ok_or(NotifyError::MissingCredentials { field: "username" })?;
        let token = self.token.as_ref().ok_or(NotifyError::MissingCredentials {
            field: "authorisation token",
        })?;
        if issue_id.trim().is_empty() {
            return Err(NotifyError::MissingIssueId);
        }
        if is_empty_options(options) {
            return Err(NotifyError::MissingOptions);
        }

        let failed = |message: String| NotifyError::TransitionFailed {
            issue_id: issue_id.to_string(),
            transition_id: transition_id_of(options),
            message,
        };

        let base = self
            .api_base()
            .ok_or_else(|| failed("Jira domain is missing".to_string()))?;
        let url = format!("{base}/rest/api/2/issue/{issue_id}/transitions");
        debug!(url = %url, "Requesting transition");

        let response = self
            .http
            .post(&url)
            .basic_auth(username, Some(token.expose_secret()))
            .json(options)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {}: {body}", status.as_u16())));
        }

        info!(issue_id, "Issue transitioned");
        Ok(())
    }

    fn api_base(&self) -> Option<String> {
        if let Some(base) = &self.base_url {
            return Some(base.trim_end_matches('/').to_string());
        }
        self.domain
            .as_deref()
            .map(|domain| format!("https://{domain}.atlassian.net"))
    }
}

impl TicketLinker for JiraClient {
    fn ticket_url(&self, ticket_id: &str) -> Option<String> {
        self.generate_browse_url(Some(ticket_id))
    }
}

fn is_empty_options(options: &Value) -> bool {
    match options {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn transition_id_of(options: &Value) -> String {
    match options.pointer("/transition/id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> JiraClient {
        JiraClient::new(Some("foo".to_string()))
            .with_credentials("jane", SecretString::from("token"))
    }

    #[test]
    fn test_browse_url() {
        let jira = JiraClient::new(Some("foo".to_string()));
        assert_eq!(
            jira.generate_browse_url(Some("FOO-666")).as_deref(),
            Some("https://foo.atlassian.net/browse/FOO-666")
        );
    }

    #[test]
    fn test_browse_url_without_domain() {
        let jira = JiraClient::new(None);
        assert!(jira.generate_browse_url(Some("FOO-666")).is_none());
        assert!(jira.ticket_url("FOO-666").is_none());
    }

    #[test]
    fn test_browse_url_without_ticket() {
        let jira = JiraClient::new(Some("foo".to_string()));
        assert!(jira.generate_browse_url(None).is_none());
    }

    #[test]
    fn test_no_ticket_links() {
        assert!(NoTicketLinks.ticket_url("FOO-1").is_none());
    }

    #[test]
    fn test_transition_options_shape() {
        assert_eq!(
            transition_options("323"),
            json!({"transition": {"id": "323"}})
        );
    }

    #[test]
    fn test_transition_id_extraction() {
        assert_eq!(transition_id_of(&json!({"transition": {"id": 323}})), "323");
        assert_eq!(transition_id_of(&json!({"fields": {}})), "unknown");
    }

    #[tokio::test]
    async fn test_transition_requires_username() {
        let jira = JiraClient::new(Some("foo".to_string()));
        let result = jira
            .transition_issue("FOO-1", &transition_options("1"))
            .await;
        assert!(matches!(
            result,
            Err(NotifyError::MissingCredentials { field: "username" })
        ));
    }

    #[tokio::test]
    async fn test_transition_requires_issue_id() {
        let result = configured()
            .transition_issue("", &transition_options("1"))
            .await;
        assert!(matches!(result, Err(NotifyError::MissingIssueId)));
    }

    #[tokio::test]
    async fn test_transition_requires_options() {
        let jira = configured();
        assert!(matches!(
            jira.transition_issue("FOO-1", &Value::Null).await,
            Err(NotifyError::MissingOptions)
        ));
        assert!(matches!(
            jira.transition_issue("FOO-1", &json!({})).await,
            Err(NotifyError::MissingOptions)
        ));
    }
}
