//! HTTP transport configuration.

use std::time::Duration;

use groundwork_common::error::{Error, ErrorKind, Result};
use groundwork_common::resilience::RetryPolicy;
use groundwork_common::utils::serde::duration_millis;
use serde::{Deserialize, Serialize};

/// Transport and retry configuration for [`crate::http::HttpClient`].
///
/// Reqwest exposes only part of the classic transport surface:
/// `max_idle_conns_per_host` maps to the pool's per-host idle cap,
/// `idle_timeout` to the pool idle timeout, and `tls_handshake_timeout` to
/// the connect timeout (the closest knob the transport offers). The
/// remaining fields are validated and kept for config parity with peer
/// services but do not reach the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Cap on total connections per host; zero means unlimited.
    pub max_conns_per_host: u32,
    /// Cap on idle connections across all hosts; zero means unlimited.
    pub max_idle_conns: u32,
    /// Cap on idle connections per host; zero means unlimited.
    pub max_idle_conns_per_host: u32,
    /// How long an idle pooled connection is kept alive.
    #[serde(with = "duration_millis")]
    pub idle_timeout: Duration,
    /// Budget for establishing a connection, TLS handshake included.
    #[serde(with = "duration_millis")]
    pub tls_handshake_timeout: Duration,
    /// Budget for a `100 Continue` response before sending the body.
    #[serde(with = "duration_millis")]
    pub expect_continue_timeout: Duration,
    /// Retry policy applied by the retryable client layer.
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_conns_per_host: 0,
            max_idle_conns: 100,
            max_idle_conns_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            tls_handshake_timeout: Duration::from_secs(10),
            expect_continue_timeout: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Start building a configuration.
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.max_idle_conns > 0
            && self.max_idle_conns_per_host > 0
            && self.max_idle_conns_per_host > self.max_idle_conns
        {
            return Err(Error::new(
                ErrorKind::Invalid,
                format!(
                    "per-host idle cap {} exceeds total idle cap {}",
                    self.max_idle_conns_per_host, self.max_idle_conns
                ),
            ));
        }
        self.retry.validate()
    }
}

/// Builder for [`HttpClientConfig`].
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the total connections-per-host cap.
    pub fn max_conns_per_host(mut self, cap: u32) -> Self {
        self.config.max_conns_per_host = cap;
        self
    }

    /// Set the total idle-connection cap.
    pub fn max_idle_conns(mut self, cap: u32) -> Self {
        self.config.max_idle_conns = cap;
        self
    }

    /// Set the per-host idle-connection cap.
    pub fn max_idle_conns_per_host(mut self, cap: u32) -> Self {
        self.config.max_idle_conns_per_host = cap;
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the TLS handshake (connect) timeout.
    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.tls_handshake_timeout = timeout;
        self
    }

    /// Set the expect-continue timeout.
    pub fn expect_continue_timeout(mut self, timeout: Duration) -> Self {
        self.config.expect_continue_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<HttpClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
