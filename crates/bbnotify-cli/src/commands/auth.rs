// SPDX-License-Identifier: Apache-2.0

//! Bitbucket token commands.

use std::sync::Arc;

use anyhow::Result;
use bbnotify_core::{AppConfig, CredentialStore, obtain_bitbucket_tokens, refresh_bitbucket_tokens};

use super::types::AuthResult;

/// Obtains a new token pair with the client-credentials grant.
pub async fn run_obtain(config: &AppConfig, store: Arc<CredentialStore>) -> Result<AuthResult> {
    let config_path = store.path().display().to_string();
    obtain_bitbucket_tokens(config, store).await?;
    Ok(AuthResult {
        action: "obtain",
        config_path,
    })
}

/// Refreshes the access token with the refresh-token grant.
pub async fn run_refresh(config: &AppConfig, store: Arc<CredentialStore>) -> Result<AuthResult> {
    let config_path = store.path().display().to_string();
    refresh_bitbucket_tokens(config, store).await?;
    Ok(AuthResult {
        action: "refresh",
        config_path,
    })
}
