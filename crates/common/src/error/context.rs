//! Normalisation of cancellation and deadline failures.
//!
//! Every operation that observes a cancellation token or a deadline
//! translates the platform failure into the canonical `cancelled` or
//! `timeout` kinds at the nearest boundary, so callers never match on
//! runtime-specific error types.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{cancellation_kind, BoxError, Error, ErrorKind, Result};

/// Convert a platform cancellation or deadline error to its canonical kind.
///
/// Tokio's deadline error becomes `timeout`; a chain already carrying
/// `cancelled` or `timeout` keeps that kind; anything else passes through
/// wrapped as `unexpected` with its cause chain intact.
pub fn convert_context_error(err: impl Into<BoxError>) -> Error {
    let err = err.into();
    match err.downcast::<Error>() {
        Ok(ours) => *ours,
        Err(foreign) => match cancellation_kind(foreign.as_ref()) {
            Some(ErrorKind::Timeout) => Error::wrap(ErrorKind::Timeout, foreign, "deadline exceeded"),
            Some(kind) => Error::wrap(kind, foreign, ""),
            None => Error::wrap(ErrorKind::Unexpected, foreign, ""),
        },
    }
}

/// Fail with `cancelled` when the token has fired.
///
/// Checked at operation entry and re-checked at each blocking boundary.
pub fn ensure_live(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(Error::new(ErrorKind::Cancelled, "operation cancelled"))
    } else {
        Ok(())
    }
}

/// Run a future under a deadline, normalising expiry to `timeout`.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(elapsed) => Err(Error::wrap(ErrorKind::Timeout, elapsed, "deadline exceeded")),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for context-error conversion.
    use super::*;

    #[tokio::test]
    async fn test_elapsed_converts_to_timeout() {
        let result = tokio::time::timeout(Duration::from_millis(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        let elapsed = result.expect_err("should time out");
        let err = convert_context_error(elapsed);
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_canonical_errors_pass_through() {
        let err = convert_context_error(Error::new(ErrorKind::NotFound, "gone"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "gone");
    }

    #[test]
    fn test_foreign_errors_wrap_as_unexpected() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = convert_context_error(io);
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_ensure_live_reports_cancellation() {
        let token = CancellationToken::new();
        assert!(ensure_live(&token).is_ok());

        token.cancel();
        let err = ensure_live(&token).expect_err("should be cancelled");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let value = with_deadline(Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(value.expect("should succeed"), 42);
    }

    #[tokio::test]
    async fn test_with_deadline_normalises_expiry() {
        let result: Result<()> = with_deadline(Duration::from_millis(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.expect_err("should time out");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
