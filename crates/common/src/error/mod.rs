//! Canonical error type shared across the Groundwork crates.
//!
//! Every fallible operation in the workspace surfaces an [`Error`]: a
//! canonical [`ErrorKind`], a human message, and an optional cause chain.
//! Callers match on the kind (directly or anywhere in the chain), log the
//! textual form, and ship it across process boundaries through the codec in
//! [`codec`].
//!
//! Kind equality walks the cause chain: an `unexpected` error wrapping a
//! `timeout` satisfies both `is(Unexpected)` and `is(Timeout)`. Cancellation
//! is sticky across wrapping: wrapping a `cancelled` or `timeout` cause under
//! any target kind preserves the cancellation kind instead.

use std::error::Error as StdError;

pub mod codec;
#[cfg(feature = "runtime")]
pub mod context;
mod kind;
pub mod status;

pub use kind::ErrorKind;

/// Boxed error trait object accepted as a cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Standard result type using the canonical [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Canonical error: a kind, a message, and an optional cause chain.
///
/// The textual form is `"<kind>: <message>"` (message omitted when blank),
/// with the cause chain appended `": <cause>"` and a `"warning: "` prefix
/// when the error has been downgraded to a warning.
#[derive(Debug, thiserror::Error)]
#[error("{}", render(.kind, .message, .warning, .source))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    warning: bool,
    #[source]
    source: Option<BoxError>,
}

fn render(kind: &ErrorKind, message: &str, warning: &bool, source: &Option<BoxError>) -> String {
    let mut text = String::new();
    if *warning {
        text.push_str("warning: ");
    }
    text.push_str(kind.as_str());
    if !message.is_empty() {
        text.push_str(": ");
        text.push_str(message);
    }
    if let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
    }
    text
}

impl Error {
    /// Create an error of the given kind.
    ///
    /// A message that is empty or only whitespace is treated as absent: the
    /// textual form is then the bare kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into().trim().to_string(), warning: false, source: None }
    }

    /// Wrap a cause under a new kind.
    ///
    /// Cancellation semantics are preserved across wrapping: when the cause
    /// chain denotes cancellation or a missed deadline, the target kind is
    /// overridden to `cancelled` or `timeout` respectively.
    pub fn wrap(kind: ErrorKind, source: impl Into<BoxError>, message: impl Into<String>) -> Self {
        let source = source.into();
        let kind = cancellation_kind(source.as_ref()).unwrap_or(kind);
        Self {
            kind,
            message: message.into().trim().to_string(),
            warning: false,
            source: Some(source),
        }
    }

    /// The error's direct kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error's own message, without the kind prefix or cause chain.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error or anything in its cause chain has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        if self.kind == kind {
            return true;
        }
        let mut current = StdError::source(self);
        while let Some(err) = current {
            if let Some(ours) = err.downcast_ref::<Error>() {
                if ours.kind == kind {
                    return true;
                }
            }
            current = err.source();
        }
        false
    }

    /// Whether the error matches any of the given kinds (chain-aware).
    pub fn is_any(&self, kinds: &[ErrorKind]) -> bool {
        kinds.iter().any(|kind| self.is(*kind))
    }

    /// Whether the error matches none of the given kinds (chain-aware).
    pub fn is_none_of(&self, kinds: &[ErrorKind]) -> bool {
        !self.is_any(kinds)
    }

    /// Case-insensitive substring match of any description against the
    /// error's full textual form.
    pub fn corresponds_to(&self, descriptions: &[&str]) -> bool {
        let text = self.to_string().to_lowercase();
        descriptions.iter().any(|needle| text.contains(&needle.to_lowercase()))
    }

    /// Discard the error when it matches any of the given kinds.
    ///
    /// Returns `None` for a match, the error unchanged otherwise.
    pub fn ignore(self, kinds: &[ErrorKind]) -> Option<Error> {
        if self.is_any(kinds) {
            None
        } else {
            Some(self)
        }
    }

    /// Downgrade an error to a warning, keeping its kind.
    ///
    /// Idempotent: a warning of a warning is the same warning.
    pub fn warning(err: Error) -> Error {
        if err.warning {
            err
        } else {
            Error { warning: true, ..err }
        }
    }

    /// Whether the error is a warning.
    pub fn is_warning(&self) -> bool {
        self.warning || self.kind == ErrorKind::Warning
    }

    /// Recover the error a warning was made from.
    ///
    /// Warnings produced by [`Error::warning`] have their flag cleared;
    /// warnings deserialised from text re-parse their payload. Anything else
    /// passes through unchanged.
    pub fn parse_warning(err: Error) -> Error {
        if err.warning {
            return Error { warning: false, ..err };
        }
        if err.kind == ErrorKind::Warning && !err.message.is_empty() {
            if let Some(inner) = codec::deserialise(&err.message).into_iter().next() {
                return inner;
            }
        }
        err
    }
}

impl PartialEq for Error {
    /// Kind-equality: two errors are equal when their direct kind, message
    /// and warning flag agree. Cause chains are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.warning == other.warning
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind, "")
    }
}

/// Whether a message looks like the textual form of one of the given kinds.
///
/// Prefix match against each kind's stable text; used to classify errors that
/// external systems return as plain strings.
pub fn relates_to(message: &str, kinds: &[ErrorKind]) -> bool {
    let trimmed = message.trim_start();
    kinds.iter().any(|kind| trimmed.starts_with(kind.as_str()))
}

/// Cancellation kind carried anywhere in a cause chain, if any.
///
/// Recognises the canonical `cancelled`/`timeout` kinds and, under the
/// runtime tier, tokio's deadline error.
pub(crate) fn cancellation_kind(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(ours) = e.downcast_ref::<Error>() {
            if matches!(ours.kind, ErrorKind::Cancelled | ErrorKind::Timeout) {
                return Some(ours.kind);
            }
        }
        #[cfg(feature = "runtime")]
        if e.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
            return Some(ErrorKind::Timeout);
        }
        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    //! Unit tests for the canonical error type.
    use super::*;

    #[test]
    fn test_textual_form_with_message() {
        let err = Error::new(ErrorKind::NotFound, "no such key");
        assert_eq!(err.to_string(), "not-found: no such key");
    }

    #[test]
    fn test_textual_form_without_message() {
        assert_eq!(Error::new(ErrorKind::Timeout, "").to_string(), "timeout");
        assert_eq!(Error::new(ErrorKind::Timeout, "   ").to_string(), "timeout");
    }

    #[test]
    fn test_wrap_appends_cause_text() {
        let cause = Error::new(ErrorKind::NotFound, "missing entry");
        let err = Error::wrap(ErrorKind::Unexpected, cause, "cache lookup");
        assert_eq!(err.to_string(), "unexpected: cache lookup: not-found: missing entry");
    }

    #[test]
    fn test_kind_equality_walks_chain() {
        let cause = Error::new(ErrorKind::NotFound, "missing");
        let err = Error::wrap(ErrorKind::Unexpected, cause, "outer");
        assert!(err.is(ErrorKind::Unexpected));
        assert!(err.is(ErrorKind::NotFound));
        assert!(!err.is(ErrorKind::Invalid));
    }

    #[test]
    fn test_is_any_and_none_of() {
        let err = Error::new(ErrorKind::Conflict, "busy");
        assert!(err.is_any(&[ErrorKind::Invalid, ErrorKind::Conflict]));
        assert!(err.is_none_of(&[ErrorKind::Invalid, ErrorKind::NotFound]));
    }

    #[test]
    fn test_wrap_preserves_cancellation() {
        let cause = Error::new(ErrorKind::Cancelled, "stopped");
        let err = Error::wrap(ErrorKind::Unexpected, cause, "while copying");
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let cause = Error::new(ErrorKind::Timeout, "deadline");
        let err = Error::wrap(ErrorKind::Failed, cause, "while fetching");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_wrap_preserves_nested_cancellation() {
        let inner = Error::new(ErrorKind::Cancelled, "stopped");
        let middle = Error::wrap(ErrorKind::Unexpected, inner, "copy");
        let outer = Error::wrap(ErrorKind::Failed, middle, "store");
        assert_eq!(outer.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_corresponds_to_is_case_insensitive() {
        let err = Error::new(ErrorKind::Unauthorised, "Token Expired");
        assert!(err.corresponds_to(&["token expired"]));
        assert!(err.corresponds_to(&["nope", "UNAUTHORISED"]));
        assert!(!err.corresponds_to(&["forbidden"]));
    }

    #[test]
    fn test_relates_to_matches_kind_prefix() {
        assert!(relates_to("not-found: no such key", &[ErrorKind::NotFound]));
        assert!(relates_to("  timeout", &[ErrorKind::Timeout, ErrorKind::Cancelled]));
        assert!(!relates_to("something else", &[ErrorKind::NotFound]));
    }

    #[test]
    fn test_ignore_discards_matching_kinds() {
        let err = Error::new(ErrorKind::NotFound, "gone");
        assert!(err.ignore(&[ErrorKind::NotFound]).is_none());

        let err = Error::new(ErrorKind::Conflict, "busy");
        let kept = err.ignore(&[ErrorKind::NotFound]).expect("should keep");
        assert_eq!(kept.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_warning_is_idempotent() {
        let base = Error::new(ErrorKind::NotFound, "gone");
        let warned = Error::warning(base);
        assert!(warned.is_warning());
        assert_eq!(warned.to_string(), "warning: not-found: gone");

        let twice = Error::warning(warned);
        assert_eq!(twice.to_string(), "warning: not-found: gone");
        assert_eq!(twice.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_parse_warning_recovers_inner() {
        let base = Error::new(ErrorKind::NotFound, "gone");
        let recovered = Error::parse_warning(Error::warning(Error::new(
            ErrorKind::NotFound,
            "gone",
        )));
        assert_eq!(recovered, base);
        assert!(!recovered.is_warning());
    }

    #[test]
    fn test_kind_equality_sense() {
        let a = Error::new(ErrorKind::Invalid, "bad port");
        let b = Error::new(ErrorKind::Invalid, "bad port");
        let c = Error::new(ErrorKind::Invalid, "other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
