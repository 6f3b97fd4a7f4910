//! Request body normalisation.
//!
//! Callers hand bodies over in whatever shape they have (nothing, bytes,
//! text, form pairs, or a readable stream) and the client normalises them
//! here. The closed enum is what rules out unsupported body types: anything
//! representable is sendable.

use std::fmt;

use bytes::Bytes;
use groundwork_common::error::{Error, ErrorKind, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;

/// A normalised request body.
pub enum RequestBody {
    /// No body.
    Empty,
    /// An in-memory byte payload.
    Bytes(Bytes),
    /// A UTF-8 text payload.
    Text(String),
    /// URL-encoded form pairs, encoded at send time.
    Form(Vec<(String, String)>),
    /// A readable stream of unknown length.
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl RequestBody {
    /// Wrap a readable stream.
    pub fn from_reader(reader: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        RequestBody::Stream(Box::new(reader))
    }

    /// Declared length in bytes, when knowable without reading.
    ///
    /// Form bodies are encoded at send time and streams have no length until
    /// drained, so both report `None`.
    pub fn len(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(bytes) => Some(bytes.len() as u64),
            RequestBody::Text(text) => Some(text.len() as u64),
            RequestBody::Form(_) | RequestBody::Stream(_) => None,
        }
    }

    /// Whether the body is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Cheap copy for repeated sends; streams cannot be copied.
    pub fn try_clone(&self) -> Option<RequestBody> {
        match self {
            RequestBody::Empty => Some(RequestBody::Empty),
            RequestBody::Bytes(bytes) => Some(RequestBody::Bytes(bytes.clone())),
            RequestBody::Text(text) => Some(RequestBody::Text(text.clone())),
            RequestBody::Form(pairs) => Some(RequestBody::Form(pairs.clone())),
            RequestBody::Stream(_) => None,
        }
    }

    /// Buffer the body so it can be re-sent and has a known length.
    ///
    /// Streams are drained into memory (consuming the original reader);
    /// every other variant passes through unchanged.
    pub async fn into_buffered(self) -> Result<RequestBody> {
        match self {
            RequestBody::Stream(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await.map_err(|err| {
                    Error::wrap(ErrorKind::Unexpected, err, "buffering request body")
                })?;
                Ok(RequestBody::Bytes(Bytes::from(buffer)))
            }
            other => Ok(other),
        }
    }

    /// Convert into a reqwest body.
    ///
    /// Form bodies are handled by the client through form encoding and never
    /// reach this conversion.
    pub(crate) fn into_reqwest(self) -> reqwest::Body {
        match self {
            RequestBody::Empty => reqwest::Body::default(),
            RequestBody::Bytes(bytes) => reqwest::Body::from(bytes),
            RequestBody::Text(text) => reqwest::Body::from(text),
            RequestBody::Form(pairs) => {
                let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                reqwest::Body::from(encoded)
            }
            RequestBody::Stream(reader) => reqwest::Body::wrap_stream(ReaderStream::new(reader)),
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("RequestBody::Empty"),
            RequestBody::Bytes(bytes) => write!(f, "RequestBody::Bytes({} bytes)", bytes.len()),
            RequestBody::Text(text) => write!(f, "RequestBody::Text({} bytes)", text.len()),
            RequestBody::Form(pairs) => write!(f, "RequestBody::Form({} pairs)", pairs.len()),
            RequestBody::Stream(_) => f.write_str("RequestBody::Stream(..)"),
        }
    }
}

impl From<()> for RequestBody {
    fn from((): ()) -> Self {
        RequestBody::Empty
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for RequestBody {
    fn from(bytes: &[u8]) -> Self {
        RequestBody::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Vec<(String, String)>> for RequestBody {
    fn from(pairs: Vec<(String, String)>) -> Self {
        RequestBody::Form(pairs)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for request body normalisation.
    use super::*;

    #[test]
    fn test_lengths() {
        assert_eq!(RequestBody::Empty.len(), Some(0));
        assert_eq!(RequestBody::from("hello").len(), Some(5));
        assert_eq!(RequestBody::from(vec![1_u8, 2, 3]).len(), Some(3));
        assert_eq!(RequestBody::from(vec![("a".to_string(), "b".to_string())]).len(), None);
        assert_eq!(RequestBody::from_reader(std::io::Cursor::new(b"xyz".to_vec())).len(), None);
    }

    #[test]
    fn test_try_clone_everything_but_streams() {
        assert!(RequestBody::Empty.try_clone().is_some());
        assert!(RequestBody::from("text").try_clone().is_some());
        assert!(RequestBody::from(b"bytes".as_slice()).try_clone().is_some());
        assert!(RequestBody::from_reader(std::io::Cursor::new(Vec::new())).try_clone().is_none());
    }

    #[tokio::test]
    async fn test_into_buffered_drains_stream() {
        let body = RequestBody::from_reader(std::io::Cursor::new(b"stream payload".to_vec()));
        let buffered = body.into_buffered().await.expect("buffer");
        assert_eq!(buffered.len(), Some(14));
        match buffered {
            RequestBody::Bytes(bytes) => assert_eq!(&bytes[..], b"stream payload"),
            other => panic!("expected bytes, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_buffered_passes_bytes_through() {
        let body = RequestBody::from("as is");
        let buffered = body.into_buffered().await.expect("buffer");
        assert_eq!(buffered.len(), Some(5));
    }
}
