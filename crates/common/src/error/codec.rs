//! Text codec for canonical errors.
//!
//! Wire convention: `"<kind>: <reason>"` for a single error, multiple errors
//! joined by newlines. The kind prefix is matched case-sensitively against
//! the closed kind set; whitespace around separators is trimmed on both
//! sides. For any canonical kind `K` and reason `R` free of the separator,
//! `deserialise(serialise(new(K, R)))` recovers an error equal to
//! `new(K, R)` in the kind-equality sense.

use std::error::Error as StdError;

use super::{Error, ErrorKind};

/// Separator between the kind prefix and the reason.
const KIND_SEPARATOR: char = ':';

/// Serialise a canonical error to its textual form.
pub fn serialise(err: &Error) -> String {
    err.to_string()
}

/// Serialise several errors, newline-joined.
pub fn serialise_all(errors: &[Error]) -> String {
    errors.iter().map(Error::to_string).collect::<Vec<_>>().join("\n")
}

/// Serialise an arbitrary error.
///
/// When the error's text does not start with a canonical kind, the output is
/// an `unknown` line whose reason records the original text, so the result
/// always deserialises to something classifiable.
pub fn serialise_any(err: &(dyn StdError + 'static)) -> String {
    let text = err.to_string();
    let prefix = text.split(KIND_SEPARATOR).next().unwrap_or_default().trim();
    if ErrorKind::from_text(prefix).is_some() {
        text
    } else {
        format!("{}: {}", ErrorKind::Unknown, text.trim())
    }
}

/// Deserialise one error per input line.
///
/// Each line is split on the first `':'`; the left side is matched against
/// the closed kind set. Unknown prefixes yield an `unknown` error carrying
/// the raw line as its reason. Blank lines are skipped.
pub fn deserialise(input: &str) -> Vec<Error> {
    input.lines().filter(|line| !line.trim().is_empty()).map(deserialise_line).collect()
}

fn deserialise_line(line: &str) -> Error {
    let line = line.trim();
    match line.split_once(KIND_SEPARATOR) {
        Some((prefix, reason)) => match ErrorKind::from_text(prefix.trim_end()) {
            Some(kind) => Error::new(kind, reason.trim_start()),
            None => Error::new(ErrorKind::Unknown, line),
        },
        None => match ErrorKind::from_text(line) {
            Some(kind) => Error::new(kind, ""),
            None => Error::new(ErrorKind::Unknown, line),
        },
    }
}
