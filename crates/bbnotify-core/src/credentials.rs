// SPDX-License-Identifier: Apache-2.0

//! Validated OAuth client credentials and token pair.

use secrecy::{ExposeSecret, SecretString};

use crate::error::NotifyError;

/// OAuth client id/secret plus the current access/refresh token pair.
///
/// All four fields are non-empty. The struct is immutable; token exchanges
/// produce a new value through [`Credentials::with_access_token`] or
/// [`Credentials::with_tokens`].
#[derive(Debug, Clone)]
pub struct Credentials {
    service: String,
    client_id: String,
    client_secret: SecretString,
    access_token: SecretString,
    refresh_token: SecretString,
}

impl Credentials {
    /// Builds credentials for `service`, rejecting any empty field.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] naming the first empty field,
    /// checked in the order client id, client secret, access token, refresh token.
    pub fn new(
        service: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let service = service.into();
        let client_id = require(&service, "client id", client_id.into())?;
        let client_secret = require(&service, "client secret", client_secret.into())?;
        let access_token = require(&service, "access token", access_token.into())?;
        let refresh_token = require(&service, "refresh token", refresh_token.into())?;

        Ok(Self {
            service,
            client_id,
            client_secret: SecretString::from(client_secret),
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
        })
    }

    /// Returns a copy with a new access token, keeping the refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] if `access_token` is empty.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Result<Self, NotifyError> {
        let access_token = require(&self.service, "access token", access_token.into())?;
        Ok(Self {
            access_token: SecretString::from(access_token),
            ..self.clone()
        })
    }

    /// Returns a copy with both tokens replaced.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::MissingCredential`] if either token is empty.
    pub fn with_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let access_token = require(&self.service, "access token", access_token.into())?;
        let refresh_token = require(&self.service, "refresh token", refresh_token.into())?;
        Ok(Self {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            ..self.clone()
        })
    }

    /// Service name, also the top-level key in the credential store.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// OAuth client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth client secret.
    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// Current access token.
    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

fn require(service: &str, field: &'static str, value: String) -> Result<String, NotifyError> {
    if value.trim().is_empty() {
        return Err(NotifyError::MissingCredential {
            service: service.to_string(),
            field,
        });
    }
    Ok(value)
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service
            && self.client_id == other.client_id
            && self.client_secret.expose_secret() == other.client_secret.expose_secret()
            && self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
    }
}
