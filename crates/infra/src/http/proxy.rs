//! Request rewriting and response forwarding.
//!
//! `proxy_request` rebuilds an inbound request against a new endpoint,
//! keeping only safe headers plus `Authorization` and preserving the
//! declared `Content-Length` exactly. `proxy_response` forwards an upstream
//! response into a [`ResponseSink`], sanitising headers, stripping CORS
//! metadata, and reporting the number of bytes actually written.

use async_trait::async_trait;
use futures::StreamExt;
use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{Error, ErrorKind, Result};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use http::Method;
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::errors::IntoCanonical;

use super::body::RequestBody;
use super::headers::HeaderSet;

/// CORS headers removed from every proxied response in addition to the
/// allow-list sanitisation.
pub const CORS_DISALLOWED_HEADERS: &[&str] = &[
    "access-control-allow-credentials",
    "access-control-allow-headers",
    "access-control-allow-methods",
    "access-control-allow-origin",
    "access-control-expose-headers",
    "access-control-max-age",
    "access-control-request-headers",
    "access-control-request-method",
];

/// Rebuild a request for forwarding to a new endpoint.
///
/// Safe headers plus `Authorization` (the sole explicit allow-addition) are
/// copied; everything else is discarded. A missing method defaults to GET.
/// When the source declared a `Content-Length`, the rebuilt request must
/// carry the same length: bodies of unknown length are drained into memory
/// (closing the original reader) and a mismatch between the declared and
/// rebuilt lengths is a fatal `unexpected` error.
pub async fn proxy_request(
    source: http::Request<RequestBody>,
    method: Option<Method>,
    endpoint: &Url,
) -> Result<http::Request<RequestBody>> {
    let (parts, body) = source.into_parts();
    let method = method.unwrap_or(Method::GET);

    let mut headers = HeaderSet::from(parts.headers).retain_safe(&["authorization"]).into_map();

    let declared = declared_length(&headers)?;
    let body = match declared {
        Some(declared) => {
            // Re-wrap bodies that would lose their length (non-seekable
            // readers) in buffered form, then re-assert the length.
            let body = body.into_buffered().await?;
            let rebuilt = body.len().unwrap_or(0);
            if rebuilt != declared {
                return Err(Error::new(
                    ErrorKind::Unexpected,
                    format!("content-length mismatch: declared {declared}, rebuilt {rebuilt}"),
                ));
            }
            headers.insert(CONTENT_LENGTH, HeaderValue::from(rebuilt));
            body
        }
        None => body,
    };

    let mut builder = http::Request::builder().method(method).uri(endpoint.as_str());
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }
    builder
        .body(body)
        .map_err(|err| Error::wrap(ErrorKind::Unexpected, err, "rebuilding proxied request"))
}

fn declared_length(headers: &HeaderMap) -> Result<Option<u64>> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "content-length header"))?;
    let length = text
        .trim()
        .parse::<u64>()
        .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "content-length header"))?;
    Ok(Some(length))
}

/// Destination for a forwarded response.
///
/// The proxy sets headers first, streams body chunks, updates
/// `Content-Length` to the bytes actually written, and writes the status
/// code last; implementations must tolerate that ordering.
#[async_trait]
pub trait ResponseSink: Send {
    /// Add a header value, preserving earlier values of the same name.
    fn append_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Replace a header with a single value.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Write one body chunk.
    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Record the response status.
    fn write_status(&mut self, status: u16);
}

/// In-memory [`ResponseSink`] for tests and buffered embedding.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    /// Status code, recorded last.
    pub status: Option<u16>,
    /// Forwarded headers.
    pub headers: HeaderMap,
    /// Forwarded body bytes.
    pub body: Vec<u8>,
}

impl BufferedResponse {
    /// Create an empty buffered response.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseSink for BufferedResponse {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    fn write_status(&mut self, status: u16) {
        self.status = Some(status);
    }
}

/// Forward an upstream response into a sink.
///
/// Headers are sanitised to the allow-list and the CORS disallow-list is
/// removed on top. The body is streamed with context-aware copying: a
/// cancellation observed mid-stream aborts with `cancelled`.
pub async fn proxy_response(
    token: &CancellationToken,
    response: Response,
    sink: &mut dyn ResponseSink,
) -> Result<()> {
    ensure_live(token)?;

    let status = response.status().as_u16();

    let mut headers = HeaderSet::from(response.headers());
    headers.sanitise();
    let headers = headers.without(CORS_DISALLOWED_HEADERS);

    for (name, value) in headers.as_map() {
        if name != CONTENT_LENGTH {
            sink.append_header(name.clone(), value.clone());
        }
    }

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                return Err(Error::new(ErrorKind::Cancelled, "response copy cancelled"));
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    sink.write_chunk(&bytes).await?;
                    written += bytes.len() as u64;
                }
                Some(Err(err)) => return Err(err.into_canonical()),
                None => break,
            }
        }
    }

    debug!(status, written, "forwarded upstream response");
    sink.set_header(CONTENT_LENGTH, HeaderValue::from(written));
    sink.write_status(status);
    Ok(())
}
