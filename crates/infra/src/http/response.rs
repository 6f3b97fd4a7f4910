//! Composition of final errors for failed API calls.

use bytes::Bytes;
use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{status, Error, ErrorKind, Result};
use reqwest::Response;
use tokio_util::sync::CancellationToken;

use crate::errors::IntoCanonical;

/// Compose the final error for an API call, or `None` when it succeeded.
///
/// A response below 400 with no client-side error is a success. Otherwise
/// the status-mapped kind becomes the outer kind and the message strings
/// together the caller context, the status in parentheses, whatever
/// `extract_body` pulls out of the response body, and the client-side
/// transport error. Body-extraction failures propagate as the resulting
/// error, except `unserialisable` ones, which simply leave the body out.
pub async fn format_api_error<F>(
    token: &CancellationToken,
    context: &str,
    response: Response,
    client_err: Option<Error>,
    extract_body: F,
) -> Option<Error>
where
    F: FnOnce(&Bytes) -> Result<String>,
{
    if let Err(err) = ensure_live(token) {
        return Some(err);
    }

    let status_code = response.status().as_u16();
    if status_code < 400 && client_err.is_none() {
        return None;
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => return Some(err.into_canonical()),
    };

    let extracted = match extract_body(&body) {
        Ok(text) => Some(text),
        Err(err) if err.is(ErrorKind::Unserialisable) => None,
        Err(err) => return Some(err),
    };

    Some(status::api_error(context, status_code, extracted.as_deref(), client_err))
}

/// Body extractor treating the payload as plain UTF-8 text.
pub fn extract_text(body: &Bytes) -> Result<String> {
    std::str::from_utf8(body)
        .map(|text| text.trim().to_string())
        .map_err(|err| Error::wrap(ErrorKind::Unserialisable, err, "response body is not utf-8"))
}

#[cfg(test)]
mod tests {
    //! Unit tests for API error composition.
    use super::*;

    fn response(status: u16, body: &'static str) -> Response {
        let inner = http::Response::builder()
            .status(status)
            .body(body.to_string())
            .expect("response");
        Response::from(inner)
    }

    #[tokio::test]
    async fn test_success_without_client_error_is_none() {
        let token = CancellationToken::new();
        let outcome =
            format_api_error(&token, "listing entries", response(200, "ok"), None, extract_text)
                .await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_failure_composes_context_status_and_body() {
        let token = CancellationToken::new();
        let err = format_api_error(
            &token,
            "listing entries",
            response(404, "no such collection"),
            None,
            extract_text,
        )
        .await
        .expect("error");

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "not-found: listing entries (404): no such collection");
    }

    #[tokio::test]
    async fn test_client_error_is_appended() {
        let token = CancellationToken::new();
        let transport = Error::new(ErrorKind::Timeout, "read deadline");
        let err = format_api_error(
            &token,
            "posting entry",
            response(502, ""),
            Some(transport),
            extract_text,
        )
        .await
        .expect("error");

        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("; timeout: read deadline"));
    }

    #[tokio::test]
    async fn test_unserialisable_extraction_is_tolerated() {
        let token = CancellationToken::new();
        let err = format_api_error(&token, "probing", response(409, "{}"), None, |_body| {
            Err(Error::new(ErrorKind::Unserialisable, "not the shape we expected"))
        })
        .await
        .expect("error");

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "conflict: probing (409)");
    }

    #[tokio::test]
    async fn test_other_extraction_failures_propagate() {
        let token = CancellationToken::new();
        let err = format_api_error(&token, "probing", response(500, "body"), None, |_body| {
            Err(Error::new(ErrorKind::Malicious, "payload looks hostile"))
        })
        .await
        .expect("error");

        assert_eq!(err.kind(), ErrorKind::Malicious);
    }

    #[tokio::test]
    async fn test_cancelled_caller_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let err = format_api_error(&token, "probing", response(200, ""), None, extract_text)
            .await
            .expect("error");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
