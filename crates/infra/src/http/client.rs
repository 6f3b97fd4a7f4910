//! Layered HTTP client with retry support.
//!
//! Three layers, constructible independently:
//! 1. generic: a thin wrapper over reqwest with a private connection pool;
//! 2. pooled: a shared-per-instance transport configured from
//!    [`HttpClientConfig`]; process-global state is never touched;
//! 3. retryable: the pooled client driven through the retry fabric, turning
//!    transient failures (network errors, 5xx except 501, 429) into retries
//!    while honouring server `Retry-After` hints.
//!
//! An authorisation-wrapping constructor injects an `Authorization` header
//! on every outbound request; arbitrary headers can be added, removed, and
//! cleared at runtime.

use std::sync::Arc;

use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{Error, ErrorKind, Result};
use groundwork_common::resilience::{
    retry_after_hint, sleep_cancellable, with_scheduling_jitter, WaitStrategy,
};
use parking_lot::RwLock;
use reqwest::{Client as ReqwestClient, IntoUrl, Method, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::errors::IntoCanonical;

use super::auth::AuthConfig;
use super::body::RequestBody;
use super::config::HttpClientConfig;
use super::headers::HeaderSet;

/// Transport-error kinds worth another attempt.
const RETRYABLE_TRANSPORT: &[ErrorKind] =
    &[ErrorKind::Timeout, ErrorKind::Unavailable, ErrorKind::Unexpected];

/// HTTP client with configurable pooling, retries, and injected headers.
#[derive(Clone, Debug)]
pub struct HttpClient {
    /// `None` once the client has been closed.
    inner: Arc<RwLock<Option<ReqwestClient>>>,
    config: HttpClientConfig,
    headers: Arc<RwLock<HeaderSet>>,
    retrying: bool,
    token: CancellationToken,
}

impl HttpClient {
    /// Thin client over the platform HTTP implementation.
    ///
    /// Each instance owns its connection pool; nothing is shared and no
    /// retries are performed.
    pub fn generic() -> Result<Self> {
        let client =
            ReqwestClient::builder().no_proxy().build().map_err(IntoCanonical::into_canonical)?;
        Ok(Self::assemble(client, HttpClientConfig::default(), false))
    }

    /// Pooled client configured from [`HttpClientConfig`].
    pub fn pooled(config: HttpClientConfig) -> Result<Self> {
        let client = Self::build_transport(&config)?;
        Ok(Self::assemble(client, config, false))
    }

    /// Pooled client driven through the retry engine on every verb.
    pub fn retryable(config: HttpClientConfig) -> Result<Self> {
        let client = Self::build_transport(&config)?;
        Ok(Self::assemble(client, config, true))
    }

    /// Retryable client that adds `Authorization: <scheme> <token>` to every
    /// outbound request.
    pub fn with_authorisation(config: HttpClientConfig, auth: &AuthConfig) -> Result<Self> {
        let client = Self::retryable(config)?;
        client.add_header("authorization", &auth.header_value()?)?;
        Ok(client)
    }

    fn build_transport(config: &HttpClientConfig) -> Result<ReqwestClient> {
        config.validate()?;
        let mut builder = ReqwestClient::builder().no_proxy();
        if !config.idle_timeout.is_zero() {
            builder = builder.pool_idle_timeout(config.idle_timeout);
        }
        if config.max_idle_conns_per_host > 0 {
            builder = builder.pool_max_idle_per_host(config.max_idle_conns_per_host as usize);
        }
        if !config.tls_handshake_timeout.is_zero() {
            builder = builder.connect_timeout(config.tls_handshake_timeout);
        }
        builder.build().map_err(IntoCanonical::into_canonical)
    }

    fn assemble(client: ReqwestClient, config: HttpClientConfig, retrying: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(client))),
            config,
            headers: Arc::new(RwLock::new(HeaderSet::new())),
            retrying,
            token: CancellationToken::new(),
        }
    }

    /// The underlying transport-equipped client.
    pub fn standard_client(&self) -> Result<ReqwestClient> {
        self.transport()
    }

    /// Release pooled connections. Idempotent; subsequent verb calls fail
    /// with `conflict`.
    pub fn close(&self) {
        self.token.cancel();
        *self.inner.write() = None;
    }

    /// Add an injected header applied to every outbound request.
    pub fn add_header(&self, name: &str, value: &str) -> Result<()> {
        self.headers.write().append(name, value)
    }

    /// Remove an injected header.
    pub fn remove_header(&self, name: &str) {
        let trimmed = self.headers.read().without(&[name]);
        *self.headers.write() = trimmed;
    }

    /// Drop all injected headers.
    pub fn clear_headers(&self) {
        *self.headers.write() = HeaderSet::new();
    }

    /// Snapshot of the injected headers (sanitised form is the caller's
    /// business; this is the raw set).
    pub fn injected_headers(&self) -> HeaderSet {
        self.headers.read().clone()
    }

    /// Issue a GET request.
    pub async fn get(&self, url: impl IntoUrl) -> Result<Response> {
        self.execute(Method::GET, url, RequestBody::Empty).await
    }

    /// Issue a HEAD request.
    pub async fn head(&self, url: impl IntoUrl) -> Result<Response> {
        self.execute(Method::HEAD, url, RequestBody::Empty).await
    }

    /// Issue an OPTIONS request.
    pub async fn options(&self, url: impl IntoUrl) -> Result<Response> {
        self.execute(Method::OPTIONS, url, RequestBody::Empty).await
    }

    /// Issue a DELETE request.
    pub async fn delete(&self, url: impl IntoUrl) -> Result<Response> {
        self.execute(Method::DELETE, url, RequestBody::Empty).await
    }

    /// Issue a POST request with a normalised body.
    pub async fn post(&self, url: impl IntoUrl, body: impl Into<RequestBody>) -> Result<Response> {
        self.execute(Method::POST, url, body).await
    }

    /// Issue a POST request with URL-encoded form pairs.
    pub async fn post_form(&self, url: impl IntoUrl, pairs: &[(&str, &str)]) -> Result<Response> {
        let pairs: Vec<(String, String)> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        self.execute(Method::POST, url, RequestBody::Form(pairs)).await
    }

    /// Issue a PUT request with a normalised body.
    pub async fn put(&self, url: impl IntoUrl, body: impl Into<RequestBody>) -> Result<Response> {
        self.execute(Method::PUT, url, body).await
    }

    /// Issue a request with the client's own cancellation scope.
    pub async fn execute(
        &self,
        method: Method,
        url: impl IntoUrl,
        body: impl Into<RequestBody>,
    ) -> Result<Response> {
        let token = self.token.clone();
        self.request(&token, method, url, body).await
    }

    /// Issue a request under a caller-supplied cancellation token.
    pub async fn request(
        &self,
        token: &CancellationToken,
        method: Method,
        url: impl IntoUrl,
        body: impl Into<RequestBody>,
    ) -> Result<Response> {
        let url = url.into_url().map_err(IntoCanonical::into_canonical)?;
        self.dispatch(token, method, url, body.into(), None).await
    }

    /// Dispatch a rebuilt request, e.g. one produced by
    /// [`super::proxy::proxy_request`].
    ///
    /// The request's own headers are applied on top of the client's injected
    /// set.
    pub async fn send_request(
        &self,
        token: &CancellationToken,
        request: http::Request<RequestBody>,
    ) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let url = Url::parse(&parts.uri.to_string()).map_err(IntoCanonical::into_canonical)?;
        self.dispatch(token, parts.method, url, body, Some(parts.headers)).await
    }

    async fn dispatch(
        &self,
        token: &CancellationToken,
        method: Method,
        url: Url,
        body: RequestBody,
        extra_headers: Option<http::HeaderMap>,
    ) -> Result<Response> {
        let client = self.transport()?;
        let extra = extra_headers.as_ref();

        let policy = &self.config.retry;
        if !self.retrying || !policy.enabled {
            ensure_live(token)?;
            return self.attempt(&client, token, &method, &url, body, extra).await;
        }

        policy.validate()?;
        let strategy = WaitStrategy::from_policy(policy);
        let attempts = policy.max_attempts.max(1);
        // Streams cannot be replayed; buffer once so every attempt can send.
        let body = body.into_buffered().await?;

        for attempt in 0..attempts {
            ensure_live(token)?;

            let attempt_body = body.try_clone().ok_or_else(|| {
                Error::new(ErrorKind::Unexpected, "request body cannot be replayed for retries")
            })?;

            match self.attempt(&client, token, &method, &url, attempt_body, extra).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !transient_status(status) || attempt + 1 == attempts {
                        return Ok(response);
                    }

                    let hint = if policy.ignore_server_retry_after {
                        None
                    } else {
                        let header = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        retry_after_hint(status, header.as_deref())
                    };

                    warn!(attempt = attempt + 1, status, %url, "retrying failed request");
                    // Drain the body so the pooled connection is released.
                    let _ = response.bytes().await;

                    let delay = strategy.delay(policy.wait_min, policy.wait_max, attempt, hint);
                    sleep_cancellable(token, with_scheduling_jitter(delay)).await?;
                }
                Err(err) => {
                    if attempt + 1 == attempts || !err.is_any(RETRYABLE_TRANSPORT) {
                        return Err(err);
                    }

                    warn!(attempt = attempt + 1, error = %err, %url, "retrying transport failure");
                    let delay = strategy.delay(policy.wait_min, policy.wait_max, attempt, None);
                    sleep_cancellable(token, with_scheduling_jitter(delay)).await?;
                }
            }
        }

        Err(Error::new(
            ErrorKind::Unexpected,
            "http client exhausted retries without producing a result",
        ))
    }

    async fn attempt(
        &self,
        client: &ReqwestClient,
        token: &CancellationToken,
        method: &Method,
        url: &Url,
        body: RequestBody,
        extra_headers: Option<&http::HeaderMap>,
    ) -> Result<Response> {
        let mut builder = client.request(method.clone(), url.clone());

        let injected = self.headers.read().clone();
        if !injected.is_empty() {
            builder = builder.headers(injected.into_map());
        }
        if let Some(extra) = extra_headers {
            builder = builder.headers(extra.clone());
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            other => builder.body(other.into_reqwest()),
        };

        debug!(%method, %url, "sending http request");
        tokio::select! {
            _ = token.cancelled() => {
                Err(Error::new(ErrorKind::Cancelled, "request cancelled"))
            }
            result = builder.send() => result.map_err(IntoCanonical::into_canonical),
        }
    }

    fn transport(&self) -> Result<ReqwestClient> {
        self.inner
            .read()
            .clone()
            .ok_or_else(|| Error::new(ErrorKind::Conflict, "http client is closed"))
    }
}

/// Whether a status is transient: 5xx except 501, plus 429.
fn transient_status(status: u16) -> bool {
    (status >= 500 && status != 501) || status == 429
}

#[cfg(test)]
mod tests {
    //! Unit tests for client construction and classification.
    use super::*;

    #[test]
    fn test_transient_status_classification() {
        assert!(transient_status(500));
        assert!(transient_status(502));
        assert!(transient_status(503));
        assert!(transient_status(429));
        assert!(!transient_status(501), "not-implemented is never transient");
        assert!(!transient_status(404));
        assert!(!transient_status(400));
        assert!(!transient_status(200));
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = HttpClient::generic().expect("client");
        assert!(client.standard_client().is_ok());

        client.close();
        client.close();
        let err = client.standard_client().expect_err("closed");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let client = HttpClient::generic().expect("client");
        client.close();
        let err = client.get("http://localhost/unreachable").await.expect_err("closed");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_header_add_remove_clear() {
        let client = HttpClient::generic().expect("client");
        client.add_header("x-request-id", "abc").expect("add");
        client.add_header("accept", "application/json").expect("add");
        assert!(client.injected_headers().has("x-request-id"));

        client.remove_header("x-request-id");
        assert!(!client.injected_headers().has("x-request-id"));
        assert!(client.injected_headers().has("accept"));

        client.clear_headers();
        assert!(client.injected_headers().is_empty());
    }

    #[test]
    fn test_authorisation_wrapper_installs_header() {
        use super::super::auth::AuthScheme;

        let auth = AuthConfig::enforced(AuthScheme::Bearer, "tok-123");
        let client =
            HttpClient::with_authorisation(HttpClientConfig::default(), &auth).expect("client");
        assert_eq!(client.injected_headers().get("authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = HttpClientConfig {
            max_idle_conns: 1,
            max_idle_conns_per_host: 2,
            ..HttpClientConfig::default()
        };
        let err = HttpClient::pooled(config).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }
}
