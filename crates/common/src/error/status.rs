//! HTTP status mapping into the canonical taxonomy.

use super::{Error, ErrorKind};

/// Map an HTTP status code to a canonical kind.
///
/// Statuses below 400 map to `None`. The 405→`not-found` mapping is
/// intentional and load-bearing for callers that treat a missing route and a
/// missing resource alike; keep it.
pub fn kind_for_status(status: u16) -> Option<ErrorKind> {
    if status < 400 {
        return None;
    }
    Some(match status {
        400 | 411 => ErrorKind::Invalid,
        401 | 407 | 511 => ErrorKind::Unauthorised,
        403 => ErrorKind::Forbidden,
        404 | 405 | 410 => ErrorKind::NotFound,
        406 | 415 | 417 | 421 | 426 | 505 => ErrorKind::Unsupported,
        408 | 504 => ErrorKind::Timeout,
        409 => ErrorKind::Conflict,
        412 | 428 => ErrorKind::FailedCondition,
        413 | 414 | 431 => ErrorKind::TooLarge,
        416 => ErrorKind::OutOfRange,
        422 => ErrorKind::Unserialisable,
        423 => ErrorKind::Locked,
        424 => ErrorKind::Failed,
        429 | 451 | 502 | 503 => ErrorKind::Unavailable,
        501 => ErrorKind::NotImplemented,
        // 500, 506-510, 425 and anything unlisted
        _ => ErrorKind::Unexpected,
    })
}

/// Build a canonical error for a failing HTTP status, or `None` below 400.
pub fn error_from_status(status: u16, context: &str) -> Option<Error> {
    kind_for_status(status).map(|kind| Error::new(kind, format!("{context} ({status})")))
}

/// Compose the final error for a failed API call.
///
/// The status-mapped kind is the outer kind; the message concatenates the
/// caller context, the status in parentheses, the extracted response body
/// (joined with `": "`), and the client-side transport error (joined with
/// `"; "`). A transport error with no failing status yields `unexpected`.
pub fn api_error(
    context: &str,
    status: u16,
    body: Option<&str>,
    transport: Option<Error>,
) -> Error {
    let kind = kind_for_status(status).unwrap_or(ErrorKind::Unexpected);
    let mut message = format!("{context} ({status})");
    if let Some(body) = body {
        let body = body.trim();
        if !body.is_empty() {
            message.push_str(": ");
            message.push_str(body);
        }
    }
    if let Some(transport) = transport {
        message.push_str("; ");
        message.push_str(&transport.to_string());
    }
    Error::new(kind, message)
}
