//! Canonical error kinds and their textual forms.
//!
//! The kebab-case text returned by [`ErrorKind::as_str`] is the single source
//! of truth for the wire codec: serialisation writes it, deserialisation
//! matches it, and callers pattern on it across process boundaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Error;

/// Closed enumeration of canonical error kinds.
///
/// Every error surfaced by Groundwork carries exactly one of these kinds.
/// The set is closed on purpose: downstream callers match on the stable
/// textual prefix, so adding a kind is a compatibility event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The operation is not implemented.
    NotImplemented,
    /// A required extension point has no registration.
    NoExtension,
    /// No logger was supplied.
    NoLogger,
    /// No logger source was supplied.
    NoLoggerSource,
    /// No log source was supplied.
    NoLogSource,
    /// A required value was left undefined.
    Undefined,
    /// The destination of a copy or move is unusable.
    InvalidDestination,
    /// A deadline elapsed before the operation completed.
    Timeout,
    /// The resource is locked.
    Locked,
    /// The resource is held by a lock whose owner is gone.
    StaleLock,
    /// The resource already exists.
    AlreadyExists,
    /// The resource was not found.
    NotFound,
    /// The operation or input is not supported.
    Unsupported,
    /// The collaborating service is unavailable.
    Unavailable,
    /// The operation ran as the wrong user.
    WrongUser,
    /// Authentication is missing or was rejected.
    Unauthorised,
    /// The failure could not be classified.
    Unknown,
    /// The input is invalid.
    Invalid,
    /// The operation conflicts with current state.
    Conflict,
    /// The value cannot be serialised or deserialised.
    Unserialisable,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// A required value was empty.
    Empty,
    /// An invariant was violated.
    Unexpected,
    /// The input exceeds a size limit.
    TooLarge,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// A precondition evaluated to false.
    FailedCondition,
    /// The end of a stream was reached.
    EndOfFile,
    /// The input looks deliberately malicious.
    Malicious,
    /// A value is outside the acceptable range.
    OutOfRange,
    /// A recoverable condition the caller may log and drop.
    Warning,
    /// A dependent operation failed.
    Failed,
}

impl ErrorKind {
    /// Every canonical kind, in declaration order.
    ///
    /// Drives the codec's prefix matching; keep in sync with the enum.
    pub const ALL: [ErrorKind; 31] = [
        ErrorKind::NotImplemented,
        ErrorKind::NoExtension,
        ErrorKind::NoLogger,
        ErrorKind::NoLoggerSource,
        ErrorKind::NoLogSource,
        ErrorKind::Undefined,
        ErrorKind::InvalidDestination,
        ErrorKind::Timeout,
        ErrorKind::Locked,
        ErrorKind::StaleLock,
        ErrorKind::AlreadyExists,
        ErrorKind::NotFound,
        ErrorKind::Unsupported,
        ErrorKind::Unavailable,
        ErrorKind::WrongUser,
        ErrorKind::Unauthorised,
        ErrorKind::Unknown,
        ErrorKind::Invalid,
        ErrorKind::Conflict,
        ErrorKind::Unserialisable,
        ErrorKind::Cancelled,
        ErrorKind::Empty,
        ErrorKind::Unexpected,
        ErrorKind::TooLarge,
        ErrorKind::Forbidden,
        ErrorKind::FailedCondition,
        ErrorKind::EndOfFile,
        ErrorKind::Malicious,
        ErrorKind::OutOfRange,
        ErrorKind::Warning,
        ErrorKind::Failed,
    ];

    /// Stable textual form of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotImplemented => "not-implemented",
            ErrorKind::NoExtension => "no-extension",
            ErrorKind::NoLogger => "no-logger",
            ErrorKind::NoLoggerSource => "no-logger-source",
            ErrorKind::NoLogSource => "no-log-source",
            ErrorKind::Undefined => "undefined",
            ErrorKind::InvalidDestination => "invalid-destination",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Locked => "locked",
            ErrorKind::StaleLock => "stale-lock",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::WrongUser => "wrong-user",
            ErrorKind::Unauthorised => "unauthorised",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unserialisable => "unserialisable",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Empty => "empty",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::TooLarge => "too-large",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::FailedCondition => "failed-condition",
            ErrorKind::EndOfFile => "end-of-file",
            ErrorKind::Malicious => "malicious",
            ErrorKind::OutOfRange => "out-of-range",
            ErrorKind::Warning => "warning",
            ErrorKind::Failed => "failed",
        }
    }

    /// Exact, case-sensitive lookup of a kind from its textual form.
    pub fn from_text(text: &str) -> Option<ErrorKind> {
        ErrorKind::ALL.iter().copied().find(|kind| kind.as_str() == text)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::from_text(s.trim())
            .ok_or_else(|| Error::new(ErrorKind::Unknown, format!("unknown error kind: {s}")))
    }
}
