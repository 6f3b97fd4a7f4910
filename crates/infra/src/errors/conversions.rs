//! Conversions from external infrastructure errors into canonical errors.
//!
//! The orphan rule keeps these conversions out of `groundwork-common`, so an
//! extension trait carries them on the infrastructure side. Call sites use
//! `err.into_canonical()` instead of hand-rolling kind selection.

use groundwork_common::error::{status, Error, ErrorKind};

/// Extension trait converting external error types into the canonical form.
pub trait IntoCanonical {
    /// Convert into a canonical [`Error`], choosing the closest kind.
    fn into_canonical(self) -> Error;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → Error */
/* -------------------------------------------------------------------------- */

impl IntoCanonical for reqwest::Error {
    fn into_canonical(self) -> Error {
        if self.is_timeout() {
            return Error::wrap(ErrorKind::Timeout, self, "http request timed out");
        }
        if self.is_connect() {
            return Error::wrap(ErrorKind::Unavailable, self, "connection failed");
        }
        if self.is_body() || self.is_decode() {
            return Error::wrap(ErrorKind::Unserialisable, self, "reading response body");
        }
        if let Some(code) = self.status() {
            let kind = status::kind_for_status(code.as_u16()).unwrap_or(ErrorKind::Unexpected);
            return Error::wrap(kind, self, format!("http status {code}"));
        }
        if self.is_request() {
            return Error::wrap(ErrorKind::Invalid, self, "building http request");
        }
        Error::wrap(ErrorKind::Unexpected, self, "http request failed")
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → Error */
/* -------------------------------------------------------------------------- */

impl IntoCanonical for std::io::Error {
    fn into_canonical(self) -> Error {
        use std::io::ErrorKind as IoKind;

        let kind = match self.kind() {
            IoKind::NotFound => ErrorKind::NotFound,
            IoKind::PermissionDenied => ErrorKind::Forbidden,
            IoKind::AlreadyExists => ErrorKind::AlreadyExists,
            IoKind::TimedOut => ErrorKind::Timeout,
            IoKind::InvalidInput | IoKind::InvalidData => ErrorKind::Invalid,
            IoKind::UnexpectedEof => ErrorKind::EndOfFile,
            IoKind::Interrupted => ErrorKind::Cancelled,
            _ => ErrorKind::Unexpected,
        };
        Error::wrap(kind, self, "filesystem operation failed")
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → Error */
/* -------------------------------------------------------------------------- */

impl IntoCanonical for url::ParseError {
    fn into_canonical(self) -> Error {
        Error::wrap(ErrorKind::Invalid, self, "parsing url")
    }
}
