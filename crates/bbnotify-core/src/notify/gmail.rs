// SPDX-License-Identifier: Apache-2.0

//! Gmail REST API transport.
//!
//! Gmail access requires a browser consent flow, so the refresh token must
//! be obtained out of band and placed in the configuration. Only the
//! refresh-token grant is used here.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::message::EmailMessage;
use crate::config::GmailConfig;
use crate::error::NotifyError;
use crate::oauth::OAuthClient;
use crate::retry::{MAX_TOKEN_REFRESHES, with_token_refresh};
use crate::store::CredentialStore;

/// Delivers rendered email messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends `message` and returns the transport's message id.
    async fn send(&self, message: &EmailMessage) -> Result<String, NotifyError>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
}

/// Sends mail through `users.messages.send` of the Gmail API.
///
/// The configured mailbox is the `userId` path segment.
#[derive(Debug)]
pub struct GmailMailer {
    oauth: Arc<OAuthClient>,
    send_url: String,
    http: reqwest::Client,
}

impl GmailMailer {
    /// Creates a mailer sending as `user` against the API rooted at `api_url`.
    ///
    /// `user` is the mailbox address, or `me` for the account the token
    /// belongs to.
    #[must_use]
    pub fn new(oauth: Arc<OAuthClient>, api_url: &str, user: &str) -> Self {
        Self {
            oauth,
            send_url: format!(
                "{}/gmail/v1/users/{}/messages/send",
                api_url.trim_end_matches('/'),
                user.trim()
            ),
            http: reqwest::Client::new(),
        }
    }

    /// Creates a mailer from the `gmail` section, persisting refreshed
    /// tokens to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] for an empty user or
    /// credential field.
    pub fn from_config(config: &GmailConfig, store: Arc<CredentialStore>) -> Result<Self, NotifyError> {
        if config.user.trim().is_empty() {
            return Err(NotifyError::MissingCredential {
                service: "gmail".to_string(),
                field: "user",
            });
        }
        let oauth = OAuthClient::new(config.credentials()?, &config.token_url, store);
        Ok(Self::new(Arc::new(oauth), &config.api_url, &config.user))
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    async fn send_raw(&self, raw: &str) -> Result<String, NotifyError> {
        let send_failed = |status: Option<u16>, message: String| NotifyError::EmailSendFailed {
            status,
            message,
        };

        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(self.oauth.access_token().expose_secret())
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| send_failed(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(send_failed(Some(status.as_u16()), body));
        }

        // The message is out; an unreadable receipt must not trigger a resend.
        let id = match response.json::<SendResponse>().await {
            Ok(receipt) => receipt.id,
            Err(e) => {
                warn!(error = %e, "Message sent but the receipt could not be read");
                String::new()
            }
        };
        Ok(id)
    }
}

#[async_trait]
impl MailTransport for GmailMailer {
    #[instrument(skip_all, fields(subject = %message.subject()))]
    async fn send(&self, message: &EmailMessage) -> Result<String, NotifyError> {
        let raw = URL_SAFE.encode(message.to_mime().as_bytes());
        debug!(bytes = raw.len(), "Sending message");

        let raw = raw.as_str();
        let oauth = &*self.oauth;
        let id = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            move || self.send_raw(raw),
            move || oauth.refresh_tokens(),
        )
        .await?;

        info!(message_id = %id, "Message sent");
        Ok(id)
    }
}
