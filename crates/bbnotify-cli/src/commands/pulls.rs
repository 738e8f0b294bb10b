// SPDX-License-Identifier: Apache-2.0

//! List merged pull requests without notifying anyone.

use std::sync::Arc;

use anyhow::Result;
use bbnotify_core::{AppConfig, CredentialStore, fetch_pull_requests};

use super::types::PullsResult;
use crate::cli::SearchArgs;

/// Fetches the grouped pull requests for the configured repository.
pub async fn run(
    config: &AppConfig,
    store: Arc<CredentialStore>,
    search: SearchArgs,
) -> Result<PullsResult> {
    let options = search.into_run_options(true, false);
    let grouped = fetch_pull_requests(config, store, &options).await?;

    Ok(PullsResult {
        repository: format!(
            "{}/{}",
            config.notification.owner, config.notification.repo_slug
        ),
        total_count: grouped.len(),
        pull_requests: grouped,
    })
}
