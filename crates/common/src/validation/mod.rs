//! Validation rules shared by configuration and boundary code.
//!
//! The two rules exposed here guard values that cross trust boundaries: TCP
//! ports arriving as integers, strings or raw bytes, and base64 payloads in
//! any of the four standard alphabets.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};

/// A value offered for port validation.
///
/// Accepts every base integer type plus string and byte-slice forms, so
/// callers can validate config fields without normalising first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCandidate {
    /// Any integer form.
    Integer(i128),
    /// A textual form, parsed as decimal.
    Text(String),
}

macro_rules! impl_port_candidate_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PortCandidate {
                fn from(value: $ty) -> Self {
                    PortCandidate::Integer(i128::from(value))
                }
            }
        )*
    };
}

impl_port_candidate_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<&str> for PortCandidate {
    fn from(value: &str) -> Self {
        PortCandidate::Text(value.to_string())
    }
}

impl From<String> for PortCandidate {
    fn from(value: String) -> Self {
        PortCandidate::Text(value)
    }
}

impl From<&[u8]> for PortCandidate {
    fn from(value: &[u8]) -> Self {
        PortCandidate::Text(String::from_utf8_lossy(value).into_owned())
    }
}

impl From<Vec<u8>> for PortCandidate {
    fn from(value: Vec<u8>) -> Self {
        PortCandidate::Text(String::from_utf8_lossy(&value).into_owned())
    }
}

/// Validate a TCP port.
///
/// Returns the port on success; `unserialisable` when the value cannot be
/// read as an integer, `invalid` when it falls outside `1..=65535`.
pub fn is_port(value: impl Into<PortCandidate>) -> Result<u16> {
    let number = match value.into() {
        PortCandidate::Integer(number) => number,
        PortCandidate::Text(text) => text.trim().parse::<i128>().map_err(|err| {
            Error::wrap(ErrorKind::Unserialisable, err, format!("not a port number: {text:?}"))
        })?,
    };
    if (1..=65535).contains(&number) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(number as u16)
    } else {
        Err(Error::new(ErrorKind::Invalid, format!("port out of range: {number}")))
    }
}

/// Validate a base64 string against the four standard alphabets.
///
/// The empty string is valid. Decoding is attempted with the standard and
/// URL-safe alphabets, padded and unpadded.
pub fn is_base64(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    if decode_base64(value).is_some() {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Invalid, format!("not base64: {value:?}")))
    }
}

/// Decode a base64 string, trying each standard alphabet in turn.
pub fn decode_base64(value: &str) -> Option<Vec<u8>> {
    [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(value).ok())
}
