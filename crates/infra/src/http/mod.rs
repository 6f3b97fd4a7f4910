//! Resilient HTTP client, header middleware, and request proxy.
//!
//! The client composes three independently constructible layers (generic,
//! pooled, retryable) on top of the retry fabric in
//! [`groundwork_common::resilience`]. Header handling is centralised in
//! [`HeaderSet`] so logging, proxying, and authorisation all share the same
//! closed safe-header list.

pub mod auth;
pub mod body;
pub mod client;
pub mod config;
pub mod headers;
pub mod proxy;
pub mod response;

pub use auth::{AuthConfig, AuthScheme};
pub use body::RequestBody;
pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use headers::{
    fetch_websocket_authorisation, parse_authorization_header, parse_authorization_value,
    HeaderSet,
};
pub use proxy::{proxy_request, proxy_response, BufferedResponse, ResponseSink};
pub use response::{extract_text, format_api_error};
