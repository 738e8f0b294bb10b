// SPDX-License-Identifier: Apache-2.0

//! OAuth token holder.
//!
//! Wraps a service's [`Credentials`] and keeps them current through the two
//! grants the notifier needs:
//! 1. Client-credentials grant: replaces both tokens
//! 2. Refresh-token grant: replaces the access token only
//!
//! Both grants authenticate with HTTP Basic (client id/secret) against the
//! service's token endpoint and persist the new tokens through the
//! [`CredentialStore`] under `<service>.accessToken` / `<service>.refreshToken`.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::credentials::Credentials;
use crate::error::{NotifyError, redact};
use crate::store::{CredentialStore, TokenPatch};

/// Bitbucket Cloud OAuth token endpoint.
pub const BITBUCKET_OAUTH_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Google OAuth token endpoint (used for Gmail).
pub const GOOGLE_OAUTH_URL: &str = "https://oauth2.googleapis.com/token";

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
pub struct TokenExchangeResult {
    /// Newly issued access token.
    pub access_token: String,
    /// Newly issued refresh token (absent on most refresh-only exchanges).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Holds one service's credentials and exchanges them for fresh tokens.
///
/// Token updates replace the whole [`Credentials`] value. Concurrent refreshes
/// on the same holder are not coordinated: the last completed exchange wins.
#[derive(Debug)]
pub struct OAuthClient {
    token_url: String,
    http: reqwest::Client,
    credentials: RwLock<Credentials>,
    store: Arc<CredentialStore>,
}

impl OAuthClient {
    /// Creates a token holder for `credentials` talking to `token_url`.
    pub fn new(
        credentials: Credentials,
        token_url: impl Into<String>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            http: reqwest::Client::new(),
            credentials: RwLock::new(credentials),
            store,
        }
    }

    /// Replaces the HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Service name of the held credentials.
    #[must_use]
    pub fn service(&self) -> String {
        self.credentials().service().to_string()
    }

    /// Snapshot of the current credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> SecretString {
        self.credentials().access_token().clone()
    }

    /// Obtains a new token pair with the client-credentials grant.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TokenFetchFailed`] if the request fails, the
    /// endpoint answers with a non-success status, or the body is not a token
    /// pair. Store write failures surface as [`NotifyError::ConfigWriteFailed`].
    #[instrument(skip(self), fields(service = %self.service()))]
    pub async fn obtain_tokens(&self) -> Result<(), NotifyError> {
        let current = self.credentials();
        let fetch_failed = |message: String| NotifyError::TokenFetchFailed {
            service: current.service().to_string(),
            message,
        };

        let tokens = self
            .exchange(&current, &[("grant_type", "client_credentials")])
            .await
            .map_err(fetch_failed)?;

        let refresh_token = tokens
            .refresh_token
            .ok_or_else(|| fetch_failed("response has no refresh_token".to_string()))?;
        let updated = current
            .with_tokens(tokens.access_token, refresh_token)
            .map_err(|e| fetch_failed(e.to_string()))?;

        self.replace(updated.clone());
        self.store.persist(&TokenPatch {
            service: updated.service(),
            access_token: updated.access_token().expose_secret(),
            refresh_token: Some(updated.refresh_token().expose_secret()),
        })?;

        info!("Obtained new token pair");
        Ok(())
    }

    /// Refreshes the access token with the refresh-token grant.
    ///
    /// The refresh token is kept even if the endpoint returns a new one.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TokenRefreshFailed`] (naming the redacted refresh
    /// token) on request, status or parse failure. Store write failures surface
    /// as [`NotifyError::ConfigWriteFailed`].
    #[instrument(skip(self), fields(service = %self.service()))]
    pub async fn refresh_tokens(&self) -> Result<(), NotifyError> {
        let current = self.credentials();
        let refresh_token = current.refresh_token().expose_secret().to_string();
        let refresh_failed = |message: String| NotifyError::TokenRefreshFailed {
            service: current.service().to_string(),
            refresh_token: redact(&refresh_token),
            message,
        };

        let tokens = self
            .exchange(
                &current,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ],
            )
            .await
            .map_err(refresh_failed)?;

        let updated = current
            .with_access_token(tokens.access_token)
            .map_err(|e| refresh_failed(e.to_string()))?;

        self.replace(updated.clone());
        self.store.persist(&TokenPatch {
            service: updated.service(),
            access_token: updated.access_token().expose_secret(),
            refresh_token: None,
        })?;

        info!("Refreshed access token");
        Ok(())
    }

    /// Posts a form-encoded grant and parses the token response.
    async fn exchange(
        &self,
        credentials: &Credentials,
        form: &[(&str, &str)],
    ) -> Result<TokenExchangeResult, String> {
        debug!(url = %self.token_url, "Requesting tokens");

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(
                credentials.client_id(),
                Some(credentials.client_secret().expose_secret()),
            )
            .form(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {body}", status.as_u16()));
        }

        serde_json::from_str(&body).map_err(|e| format!("cannot parse tokens: {e}"))
    }

    fn replace(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
    }
}
