// SPDX-License-Identifier: Apache-2.0

//! Single ticket transition.

use anyhow::Result;
use bbnotify_core::jira::transition_options;
use bbnotify_core::facade::jira_client;
use bbnotify_core::{AppConfig, NotifyError};

use super::types::TransitionResult;

/// Transitions `issue_id` with `transition_id`.
pub async fn run(config: &AppConfig, issue_id: String, transition_id: String) -> Result<TransitionResult> {
    let jira = jira_client(config).ok_or(NotifyError::MissingSection { section: "jira" })?;
    jira.transition_issue(&issue_id, &transition_options(&transition_id))
        .await?;

    Ok(TransitionResult {
        issue_id,
        transition_id,
    })
}
