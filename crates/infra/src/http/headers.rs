//! Header set model and authorisation header handling.
//!
//! [`HeaderSet`] wraps `http::HeaderMap` with the allow/disallow operations
//! the client, proxy, and logging share. The safe-header list is closed:
//! `Authorization`, cookies, and `Sec-WebSocket-Protocol` are never safe and
//! can only travel through an explicit allow-addition.

use groundwork_common::error::{Error, ErrorKind, Result};
use groundwork_common::validation::decode_base64;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};

use super::auth::AuthScheme;

/// Headers that may be logged or forwarded without privacy review.
///
/// HTTP-standard headers plus the extension headers the platform speaks
/// (TUS resumable uploads, WebSocket handshake metadata, deprecation
/// signalling, rate-limit reporting). Credentials are deliberately absent.
pub const SAFE_HEADERS: &[&str] = &[
    // HTTP standard
    "accept",
    "accept-charset",
    "accept-encoding",
    "accept-language",
    "accept-ranges",
    "age",
    "allow",
    "cache-control",
    "connection",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-range",
    "content-type",
    "date",
    "etag",
    "expect",
    "expires",
    "from",
    "host",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "last-modified",
    "link",
    "location",
    "max-forwards",
    "pragma",
    "range",
    "referer",
    "retry-after",
    "server",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "user-agent",
    "vary",
    "via",
    "warning",
    "www-authenticate",
    // Security metadata
    "strict-transport-security",
    "x-content-type-options",
    "x-frame-options",
    // Deprecation signalling
    "deprecation",
    "sunset",
    // Rate limiting
    "ratelimit-limit",
    "ratelimit-remaining",
    "ratelimit-reset",
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
    // TUS resumable uploads
    "tus-resumable",
    "tus-version",
    "tus-extension",
    "tus-max-size",
    "tus-checksum-algorithm",
    "upload-concat",
    "upload-defer-length",
    "upload-expires",
    "upload-length",
    "upload-metadata",
    "upload-offset",
    // WebSocket handshake (the sub-protocol header is NOT safe)
    "sec-websocket-accept",
    "sec-websocket-extensions",
    "sec-websocket-key",
    "sec-websocket-version",
    // Request correlation
    "x-http-method-override",
    "x-request-id",
    "x-requested-with",
];

/// Marker sub-protocol announcing a base64-encoded WebSocket handshake.
const WEBSOCKET_BASE64_MARKER: &str = "base64.binary.k8s.io";
/// Prefix of the sub-protocol carrying a base64url bearer credential.
const WEBSOCKET_BEARER_PREFIX: &str = "base64url.bearer.authorization.k8s.io.";

/// Whether a header may be logged or forwarded without review.
pub fn is_safe_header(name: &str) -> bool {
    let folded = name.to_ascii_lowercase();
    SAFE_HEADERS.contains(&folded.as_str())
}

/// An ordered, case-folded header mapping with allow/disallow support.
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    inner: HeaderMap,
}

impl HeaderSet {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, folding the name per the HTTP convention.
    pub fn append(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "invalid header name"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "invalid header value"))?;
        self.inner.append(name, value);
        Ok(())
    }

    /// First value for a header, looked up case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether the header is present.
    pub fn has(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Number of header values held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the set holds no headers.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Clone with the named headers removed (disallow-list).
    pub fn without(&self, names: &[&str]) -> HeaderSet {
        let mut clone = self.clone();
        for name in names {
            clone.inner.remove(*name);
        }
        clone
    }

    /// Clone retaining only safe headers plus the explicit additions
    /// (allow-list).
    pub fn retain_safe(&self, extra: &[&str]) -> HeaderSet {
        let mut kept = HeaderMap::new();
        for (name, value) in &self.inner {
            let allowed = is_safe_header(name.as_str())
                || extra.iter().any(|e| e.eq_ignore_ascii_case(name.as_str()));
            if allowed {
                kept.append(name.clone(), value.clone());
            }
        }
        HeaderSet { inner: kept }
    }

    /// Reduce the set to its allow-list form in place.
    ///
    /// Used before logging a header set and before forwarding one through
    /// the proxy.
    pub fn sanitise(&mut self) {
        self.inner = self.retain_safe(&[]).inner;
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &HeaderMap {
        &self.inner
    }

    /// Consume into the underlying map.
    pub fn into_map(self) -> HeaderMap {
        self.inner
    }
}

impl From<HeaderMap> for HeaderSet {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

impl From<&HeaderMap> for HeaderSet {
    fn from(inner: &HeaderMap) -> Self {
        Self { inner: inner.clone() }
    }
}

/// Resolve the effective authorisation credential for a WebSocket handshake.
///
/// Three workarounds are tried in order: a plain `Authorization` header; a
/// `Sec-WebSocket-Protocol` value following the literal `Authorization`
/// element; and the Kubernetes `base64url.bearer.authorization` sub-protocol
/// (accepted in any of the four standard base64 alphabets) when the
/// `base64.binary.k8s.io` marker is also announced. On success the resolved
/// credential is written back into `Authorization` so downstream handling
/// only ever looks in one place.
pub fn fetch_websocket_authorisation(headers: &mut HeaderMap) -> Result<Option<String>> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "authorization header"))?;
        return Ok(Some(value.to_string()));
    }

    let protocols: Vec<String> = headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|element| element.trim().to_string())
        .filter(|element| !element.is_empty())
        .collect();

    if let Some(credential) = credential_after_authorization_element(&protocols) {
        write_back_authorisation(headers, &credential)?;
        return Ok(Some(credential));
    }

    if let Some(credential) = kubernetes_bearer_credential(&protocols)? {
        write_back_authorisation(headers, &credential)?;
        return Ok(Some(credential));
    }

    Ok(None)
}

/// Workaround (b): the credential is the element following the literal
/// `Authorization` in the sub-protocol list.
fn credential_after_authorization_element(protocols: &[String]) -> Option<String> {
    let position = protocols.iter().position(|p| p.eq_ignore_ascii_case("authorization"))?;
    protocols.get(position + 1).cloned()
}

/// Workaround (c): the Kubernetes base64url bearer sub-protocol.
fn kubernetes_bearer_credential(protocols: &[String]) -> Result<Option<String>> {
    let has_marker = protocols.iter().any(|p| p == WEBSOCKET_BASE64_MARKER);
    if !has_marker {
        return Ok(None);
    }
    let Some(encoded) = protocols
        .iter()
        .find_map(|p| p.strip_prefix(WEBSOCKET_BEARER_PREFIX))
    else {
        return Ok(None);
    };
    let decoded = decode_base64(encoded).ok_or_else(|| {
        Error::new(ErrorKind::Invalid, "websocket bearer sub-protocol is not base64")
    })?;
    let credential = String::from_utf8(decoded).map_err(|err| {
        Error::wrap(ErrorKind::Unserialisable, err, "decoded websocket credential is not utf-8")
    })?;
    Ok(Some(credential))
}

fn write_back_authorisation(headers: &mut HeaderMap, credential: &str) -> Result<()> {
    let value = HeaderValue::from_str(credential)
        .map_err(|err| Error::wrap(ErrorKind::Invalid, err, "authorization credential"))?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Split an authorisation value into its scheme and token.
///
/// The value must be exactly `<scheme> <token>` with the scheme drawn from
/// the closed scheme set; anything else is `invalid` (wrong shape) or
/// `unsupported` (unknown scheme).
pub fn parse_authorization_value(value: &str) -> Result<(AuthScheme, String)> {
    let mut parts = value.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::new(
            ErrorKind::Invalid,
            "authorization value must be `<scheme> <token>`",
        ));
    };
    let scheme = AuthScheme::parse(scheme)?;
    Ok((scheme, token.to_string()))
}

/// Resolve and parse the effective authorisation for a request.
///
/// Applies the WebSocket workarounds, then validates the resulting value.
/// A request carrying no credential at all fails with `unauthorised`.
pub fn parse_authorization_header(headers: &mut HeaderMap) -> Result<(AuthScheme, String)> {
    match fetch_websocket_authorisation(headers)? {
        Some(value) => parse_authorization_value(&value),
        None => Err(Error::new(ErrorKind::Unauthorised, "no authorization header")),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the header set and authorisation parsing.
    use super::*;

    fn set_of(pairs: &[(&str, &str)]) -> HeaderSet {
        let mut set = HeaderSet::new();
        for (name, value) in pairs {
            set.append(name, value).expect("valid header");
        }
        set
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let set = set_of(&[("Content-Type", "text/plain")]);
        assert_eq!(set.get("content-type"), Some("text/plain"));
        assert_eq!(set.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(set.has("Content-type"));
    }

    #[test]
    fn test_without_removes_named_headers() {
        let set = set_of(&[("accept", "*/*"), ("cookie", "id=1"), ("host", "example.org")]);
        let trimmed = set.without(&["Cookie"]);
        assert!(!trimmed.has("cookie"));
        assert!(trimmed.has("accept"));
        assert_eq!(set.len(), 3, "original is untouched");
    }

    #[test]
    fn test_sanitise_strips_credentials() {
        let mut set = set_of(&[
            ("accept", "*/*"),
            ("authorization", "Bearer secret"),
            ("cookie", "id=1"),
            ("set-cookie", "id=1"),
            ("sec-websocket-protocol", "base64.binary.k8s.io"),
            ("content-type", "application/json"),
        ]);
        set.sanitise();
        assert!(set.has("accept"));
        assert!(set.has("content-type"));
        assert!(!set.has("authorization"));
        assert!(!set.has("cookie"));
        assert!(!set.has("set-cookie"));
        assert!(!set.has("sec-websocket-protocol"));
    }

    #[test]
    fn test_retain_safe_honours_explicit_additions() {
        let set = set_of(&[("authorization", "Bearer abc"), ("x-internal-trace", "1")]);
        let kept = set.retain_safe(&["Authorization"]);
        assert!(kept.has("authorization"));
        assert!(!kept.has("x-internal-trace"));
    }

    #[test]
    fn test_websocket_auth_plain_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("Authorization, zzz"));

        let credential =
            fetch_websocket_authorisation(&mut headers).expect("ok").expect("present");
        assert_eq!(credential, "Bearer abc");
    }

    #[test]
    fn test_websocket_auth_from_protocol_element() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("Authorization, Bearer xyz"),
        );

        let credential =
            fetch_websocket_authorisation(&mut headers).expect("ok").expect("present");
        assert_eq!(credential, "Bearer xyz");
        assert_eq!(headers.get(AUTHORIZATION).expect("written back"), "Bearer xyz");
    }

    #[test]
    fn test_websocket_auth_kubernetes_subprotocol() {
        // "VG9rZW4gYWJj" decodes to "Token abc"
        let mut headers = HeaderMap::new();
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(
                "base64.binary.k8s.io, base64url.bearer.authorization.k8s.io.VG9rZW4gYWJj",
            ),
        );

        let (scheme, token) = parse_authorization_header(&mut headers).expect("parsed");
        assert_eq!(scheme, AuthScheme::Token);
        assert_eq!(token, "abc");
        assert_eq!(headers.get(AUTHORIZATION).expect("written back"), "Token abc");
    }

    #[test]
    fn test_websocket_auth_requires_marker_for_bearer_subprotocol() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("base64url.bearer.authorization.k8s.io.VG9rZW4gYWJj"),
        );

        let result = fetch_websocket_authorisation(&mut headers).expect("ok");
        assert!(result.is_none(), "bearer sub-protocol without marker must be ignored");
    }

    #[test]
    fn test_missing_authorisation_is_unauthorised() {
        let mut headers = HeaderMap::new();
        let err = parse_authorization_header(&mut headers).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Unauthorised);
    }

    #[test]
    fn test_parse_authorization_value_shapes() {
        let (scheme, token) = parse_authorization_value("Bearer abc123").expect("ok");
        assert_eq!(scheme, AuthScheme::Bearer);
        assert_eq!(token, "abc123");

        assert_eq!(
            parse_authorization_value("Bearer").expect_err("one part").kind(),
            ErrorKind::Invalid
        );
        assert_eq!(
            parse_authorization_value("Bearer a b").expect_err("three parts").kind(),
            ErrorKind::Invalid
        );
        assert_eq!(
            parse_authorization_value("Wizardry abc").expect_err("unknown scheme").kind(),
            ErrorKind::Unsupported
        );
    }
}
