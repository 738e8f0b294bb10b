// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bbnotify_core::{CredentialStore, Credentials, OAuthClient};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Writes `tree` to a fresh config file and loads it.
pub fn store_with(tree: &Value) -> (TempDir, Arc<CredentialStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(tree).unwrap()).unwrap();
    let store = CredentialStore::read(&path).unwrap();
    (dir, Arc::new(store))
}

/// Re-reads the store file from disk.
pub fn reread(store: &CredentialStore) -> CredentialStore {
    CredentialStore::read(store.path()).unwrap()
}

/// Bitbucket section with known tokens.
pub fn bitbucket_section() -> Value {
    json!({
        "clientId": "id",
        "clientSecret": "secret",
        "accessToken": "old-access",
        "refreshToken": "refresh-0001"
    })
}

/// Token holder for `bitbucket` talking to `token_url`.
pub fn bitbucket_oauth(token_url: &str, store: Arc<CredentialStore>) -> Arc<OAuthClient> {
    let credentials =
        Credentials::new("bitbucket", "id", "secret", "old-access", "refresh-0001").unwrap();
    Arc::new(OAuthClient::new(credentials, token_url, store))
}

/// One search result in Bitbucket's wire format.
pub fn pull_request(title: &str, branch: &str, id: u32) -> Value {
    json!({
        "title": title,
        "destination": {"branch": {"name": branch}},
        "links": {"html": {"href": format!("https://bitbucket.org/team/project/pull-requests/{id}")}},
        "author": {
            "display_name": "Jane Doe",
            "links": {"html": {"href": "https://bitbucket.org/jane"}}
        }
    })
}
