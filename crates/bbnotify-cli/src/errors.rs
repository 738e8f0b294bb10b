// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to `NotifyError` and appends a hint pointing at
//! the configuration or the command that fixes the problem.

use anyhow::Error;
use bbnotify_core::NotifyError;

/// Formats an error for CLI display with helpful hints.
///
/// If the error is not a `NotifyError`, returns the original error chain.
pub fn format_error(error: &Error) -> String {
    let Some(notify_err) = error.downcast_ref::<NotifyError>() else {
        return format!("{error:#}");
    };

    match hint(notify_err) {
        Some(tip) => format!("{notify_err}\n\nTip: {tip}"),
        None => notify_err.to_string(),
    }
}

fn hint(error: &NotifyError) -> Option<String> {
    match error {
        NotifyError::ConfigUnreadable { path, .. } => Some(format!(
            "Create {} or point --config / BBNOTIFY_CONFIG at your configuration.",
            path.display()
        )),
        NotifyError::ConfigMalformed { .. }
        | NotifyError::InvalidSection { .. }
        | NotifyError::MissingSection { .. }
        | NotifyError::MissingCredential { .. }
        | NotifyError::MissingCredentials { .. }
        | NotifyError::InvalidRepository { .. }
        | NotifyError::InvalidTicketPattern(_) => {
            Some("Check the matching section of your configuration file.".to_string())
        }
        NotifyError::ConfigWriteFailed { .. } => Some(
            "New tokens were not saved; check that the configuration file is writable.".to_string(),
        ),
        NotifyError::TokenFetchFailed { .. } => {
            Some("Check the Bitbucket OAuth consumer key and secret.".to_string())
        }
        NotifyError::TokenRefreshFailed { .. } | NotifyError::TokenRefreshUnavailable { .. } => {
            Some("Run `bbnotify auth obtain` to get a new token pair.".to_string())
        }
        NotifyError::RetryLimitExceeded { source } => hint(source).or_else(|| {
            Some("The request failed even with a fresh access token; try again later.".to_string())
        }),
        NotifyError::MissingSearchParameters => Some(
            "Set `state`, `destinationBranch` or `query` in the notification section.".to_string(),
        ),
        NotifyError::Template { .. } => {
            Some("Check the `template` file of the notification section.".to_string())
        }
        NotifyError::InvalidMessage { .. } => Some(
            "Check `sender`, `to` and `subject` in the notification section.".to_string(),
        ),
        NotifyError::Network(_) => {
            Some("Check your internet connection and try again.".to_string())
        }
        NotifyError::PullRequestFetch { .. }
        | NotifyError::PullRequestParseFailed { .. }
        | NotifyError::MissingIssueId
        | NotifyError::MissingOptions
        | NotifyError::TransitionFailed { .. }
        | NotifyError::EmailSendFailed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_non_notify_error() {
        let err = anyhow::anyhow!("plain failure");
        assert_eq!(format_error(&err), "plain failure");
    }

    #[test]
    fn test_refresh_failure_hint() {
        let err = Error::new(NotifyError::TokenRefreshUnavailable {
            source: Box::new(NotifyError::TokenRefreshFailed {
                service: "bitbucket".to_string(),
                refresh_token: "****abcd".to_string(),
                message: "HTTP 400".to_string(),
            }),
        });
        let formatted = format_error(&err);
        assert!(formatted.contains("Tip: Run `bbnotify auth obtain`"));
    }

    #[test]
    fn test_retry_limit_uses_inner_hint() {
        let err = Error::new(NotifyError::RetryLimitExceeded {
            source: Box::new(NotifyError::MissingSearchParameters),
        });
        assert!(format_error(&err).contains("notification section"));
    }

    #[test]
    fn test_no_hint_for_transition_failure() {
        let err = Error::new(NotifyError::TransitionFailed {
            issue_id: "FOO-1".to_string(),
            transition_id: "323".to_string(),
            message: "HTTP 400".to_string(),
        });
        assert!(!format_error(&err).contains("Tip:"));
    }
}
