//! Integration tests for request proxying and header sanitisation
//!
//! **Coverage:**
//! - Request rewriting: safe headers + Authorization survive, CORS and
//!   cookies do not; body and declared length preserved end to end
//! - Response forwarding: allow-list sanitisation, CORS strip, accurate
//!   Content-Length, status written last
//! - WebSocket authorisation workarounds feeding the proxy path
//! - Cancellation mid-forward
//!
//! **Infrastructure:** WireMock as the upstream origin, `BufferedResponse`
//! as the downstream sink.

use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use http::Method;
use groundwork_common::error::ErrorKind;
use groundwork_infra::http::{
    parse_authorization_header, proxy_request, proxy_response, AuthScheme, BufferedResponse,
    HttpClient, HttpClientConfig, RequestBody,
};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn proxied_request_keeps_credentials_and_drops_cors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/new"))
        .and(header("authorization", "Bearer xyz"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let source = http::Request::builder()
        .method(Method::POST)
        .uri("https://origin.example.org/old")
        .header("authorization", "Bearer xyz")
        .header("access-control-allow-origin", "*")
        .header("cookie", "session=1")
        .header("content-type", "text/plain")
        .header("content-length", "5")
        .body(RequestBody::from("hello"))
        .expect("request");

    let endpoint = Url::parse(&format!("{}/new", server.uri())).expect("endpoint");
    let proxied = proxy_request(source, Some(Method::PUT), &endpoint).await.expect("proxied");

    assert_eq!(proxied.method(), Method::PUT);
    assert!(proxied.headers().contains_key("authorization"));
    assert!(!proxied.headers().contains_key("access-control-allow-origin"));
    assert!(!proxied.headers().contains_key("cookie"));
    assert_eq!(
        proxied.headers().get("content-length").and_then(|v| v.to_str().ok()),
        Some("5")
    );

    // the rewritten request is sendable as-is
    let client = HttpClient::pooled(HttpClientConfig::default()).expect("client");
    let token = CancellationToken::new();
    let response = client.send_request(&token, proxied).await.expect("sent");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn proxied_response_is_sanitised_with_accurate_length() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("forwarded payload")
                .insert_header("content-type", "text/plain")
                .insert_header("access-control-allow-origin", "*")
                .insert_header("access-control-expose-headers", "X-Anything")
                .insert_header("set-cookie", "id=1")
                .insert_header("x-internal-node", "backend-7"),
        )
        .mount(&server)
        .await;

    let client = HttpClient::pooled(HttpClientConfig::default()).expect("client");
    let upstream = client.get(server.uri()).await.expect("upstream");

    let token = CancellationToken::new();
    let mut sink = BufferedResponse::new();
    proxy_response(&token, upstream, &mut sink).await.expect("forwarded");

    assert_eq!(sink.status, Some(200));
    assert_eq!(sink.body, b"forwarded payload");
    assert_eq!(
        sink.headers.get("content-length").and_then(|v| v.to_str().ok()),
        Some("17"),
        "content-length reflects the bytes actually written"
    );
    assert!(sink.headers.contains_key("content-type"));
    assert!(!sink.headers.contains_key("access-control-allow-origin"));
    assert!(!sink.headers.contains_key("access-control-expose-headers"));
    assert!(!sink.headers.contains_key("set-cookie"));
    assert!(!sink.headers.contains_key("x-internal-node"));
}

#[tokio::test]
async fn cancelled_forward_aborts_with_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body"))
        .mount(&server)
        .await;

    let client = HttpClient::pooled(HttpClientConfig::default()).expect("client");
    let upstream = client.get(server.uri()).await.expect("upstream");

    let token = CancellationToken::new();
    token.cancel();
    let mut sink = BufferedResponse::new();
    let err = proxy_response(&token, upstream, &mut sink).await.expect_err("cancelled");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(sink.status, None, "status is never written for an aborted forward");
}

#[tokio::test]
async fn websocket_workaround_feeds_the_authorization_header() {
    // Kubernetes-style handshake: marker + base64url bearer sub-protocol.
    // "VG9rZW4gYWJj" decodes to "Token abc".
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

    // The resolved credential now rides the normal proxy path.
    let mut builder = http::Request::builder().uri("https://origin.example.org/ws");
    if let Some(target) = builder.headers_mut() {
        *target = headers;
    }
    let source = builder.body(RequestBody::Empty).expect("request");

    let endpoint = Url::parse("https://upstream.example.org/ws").expect("endpoint");
    let proxied = proxy_request(source, None, &endpoint).await.expect("proxied");
    assert_eq!(
        proxied.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
        Some("Token abc")
    );
    assert!(
        !proxied.headers().contains_key(SEC_WEBSOCKET_PROTOCOL),
        "sub-protocol never crosses the proxy"
    );
}
