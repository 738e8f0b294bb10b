// SPDX-License-Identifier: Apache-2.0

//! Refresh-and-retry for token-authenticated operations.
//!
//! A failed authenticated call is recovered by refreshing the access token and
//! running the whole operation again. The refresh budget is an explicit
//! argument; every notifier call site uses [`MAX_TOKEN_REFRESHES`].

use std::future::Future;

use tracing::{debug, warn};

use crate::error::NotifyError;

/// Number of refresh-and-retry rounds allowed per operation.
pub const MAX_TOKEN_REFRESHES: u32 = 1;

/// Runs `operation`, refreshing credentials and retrying on refreshable failures.
///
/// On each refreshable failure (see [`NotifyError::is_refreshable`]) while
/// budget remains, `refresh` is awaited and `operation` is started again from
/// the top. Failures that cannot be fixed by a refresh consume the whole budget
/// immediately.
///
/// # Arguments
///
/// * `max_refreshes` - Number of refresh-and-retry rounds allowed
/// * `operation` - Zero-argument retryable operation
/// * `refresh` - Credential refresh run before each retry
///
/// # Errors
///
/// - [`NotifyError::RetryLimitExceeded`] wrapping the last failure once the
///   budget is spent (or the failure was not refreshable)
/// - [`NotifyError::TokenRefreshUnavailable`] wrapping the refresh failure if
///   `refresh` itself fails
pub async fn with_token_refresh<T, Op, OpFut, Refresh, RefreshFut>(
    max_refreshes: u32,
    mut operation: Op,
    mut refresh: Refresh,
) -> Result<T, NotifyError>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, NotifyError>>,
    Refresh: FnMut() -> RefreshFut,
    RefreshFut: Future<Output = Result<(), NotifyError>>,
{
    let mut refreshes_used = 0;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_refreshable() || refreshes_used >= max_refreshes {
            debug!(refreshes_used, "Giving up after failure");
            return Err(NotifyError::RetryLimitExceeded {
                source: Box::new(error),
            });
        }

        refreshes_used += 1;
        warn!(error = %error, "Authenticated call failed, refreshing token and retrying");

        refresh()
            .await
            .map_err(|e| NotifyError::TokenRefreshUnavailable {
                source: Box::new(e),
            })?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fetch_error() -> NotifyError {
        NotifyError::PullRequestFetch {
            page: 1,
            status: Some(401),
            message: "Unauthorized".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_without_refresh() {
        let refreshes = &AtomicU32::new(0);
        let result = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            || async move { Ok::<_, NotifyError>(42) },
            || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recovers_after_one_refresh() {
        let calls = &AtomicU32::new(0);
        let refreshes = &AtomicU32::new(0);
        let result = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(fetch_error())
                } else {
                    Ok("done")
                }
            },
            || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fails_after_budget_spent() {
        let calls = &AtomicU32::new(0);
        let refreshes = &AtomicU32::new(0);
        let result: Result<(), _> = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(fetch_error())
            },
            || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(NotifyError::RetryLimitExceeded { ref source })
                if matches!(**source, NotifyError::PullRequestFetch { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_terminal() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(fetch_error())
            },
            || async move {
                Err(NotifyError::TokenRefreshFailed {
                    service: "bitbucket".to_string(),
                    refresh_token: "****oken".to_string(),
                    message: "bad tokens".to_string(),
                })
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(NotifyError::TokenRefreshUnavailable { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_refreshable_failure_skips_refresh() {
        let refreshes = &AtomicU32::new(0);
        let result: Result<(), _> = with_token_refresh(
            MAX_TOKEN_REFRESHES,
            || async move { Err(NotifyError::MissingSearchParameters) },
            || async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(NotifyError::RetryLimitExceeded { .. })
        ));
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_budget_never_refreshes() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = with_token_refresh(
            0,
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(fetch_error())
            },
            || async move { Ok(()) },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
