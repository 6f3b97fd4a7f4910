//! Authorisation configuration and the closed scheme registry.

use std::fmt;

use groundwork_common::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// HTTP authentication schemes accepted in `Authorization` headers.
///
/// The closed set mirrors the IANA HTTP Authentication Schemes registry;
/// anything outside it is rejected as `unsupported`. Matching is
/// case-insensitive, output uses the registry casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
    /// Opaque token scheme.
    Token,
    /// RFC 7617 basic credentials.
    Basic,
    /// RFC 6750 bearer token.
    Bearer,
    /// Concealed HTTP authentication.
    Concealed,
    /// RFC 7616 digest access authentication.
    Digest,
    /// Demonstrating proof of possession.
    #[serde(rename = "DPoP")]
    DPoP,
    /// Grant negotiation and authorization protocol.
    #[serde(rename = "GNAP")]
    Gnap,
    /// HTTP origin-bound authentication.
    #[serde(rename = "HOBA")]
    Hoba,
    /// Mutual authentication.
    Mutual,
    /// SPNEGO-based negotiation.
    Negotiate,
    /// OAuth 1.0 protocol parameters.
    OAuth,
    /// Privacy Pass private tokens.
    PrivateToken,
    /// Salted challenge response, SHA-1 variant.
    #[serde(rename = "SCRAM-SHA-1")]
    ScramSha1,
    /// Salted challenge response, SHA-256 variant.
    #[serde(rename = "SCRAM-SHA-256")]
    ScramSha256,
    /// Voluntary application server identification (web push).
    #[serde(rename = "vapid")]
    Vapid,
}

impl AuthScheme {
    /// Every accepted scheme.
    pub const ALL: [AuthScheme; 15] = [
        AuthScheme::Token,
        AuthScheme::Basic,
        AuthScheme::Bearer,
        AuthScheme::Concealed,
        AuthScheme::Digest,
        AuthScheme::DPoP,
        AuthScheme::Gnap,
        AuthScheme::Hoba,
        AuthScheme::Mutual,
        AuthScheme::Negotiate,
        AuthScheme::OAuth,
        AuthScheme::PrivateToken,
        AuthScheme::ScramSha1,
        AuthScheme::ScramSha256,
        AuthScheme::Vapid,
    ];

    /// Registry casing of the scheme.
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthScheme::Token => "Token",
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
            AuthScheme::Concealed => "Concealed",
            AuthScheme::Digest => "Digest",
            AuthScheme::DPoP => "DPoP",
            AuthScheme::Gnap => "GNAP",
            AuthScheme::Hoba => "HOBA",
            AuthScheme::Mutual => "Mutual",
            AuthScheme::Negotiate => "Negotiate",
            AuthScheme::OAuth => "OAuth",
            AuthScheme::PrivateToken => "PrivateToken",
            AuthScheme::ScramSha1 => "SCRAM-SHA-1",
            AuthScheme::ScramSha256 => "SCRAM-SHA-256",
            AuthScheme::Vapid => "vapid",
        }
    }

    /// Case-insensitive lookup; unknown schemes are `unsupported`.
    pub fn parse(value: &str) -> Result<AuthScheme> {
        let value = value.trim();
        AuthScheme::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                Error::new(ErrorKind::Unsupported, format!("authorisation scheme {value:?}"))
            })
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorisation configuration for outbound clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether authorisation is enforced on every request.
    pub enforced: bool,
    /// Scheme to present; required when enforced.
    pub scheme: Option<AuthScheme>,
    /// Access token to present; required when enforced.
    pub access_token: String,
}

impl AuthConfig {
    /// Enforced configuration for the given scheme and token.
    pub fn enforced(scheme: AuthScheme, access_token: impl Into<String>) -> Self {
        Self { enforced: true, scheme: Some(scheme), access_token: access_token.into() }
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.enforced {
            return Ok(());
        }
        if self.scheme.is_none() {
            return Err(Error::new(
                ErrorKind::Undefined,
                "authorisation is enforced but no scheme is configured",
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(Error::new(
                ErrorKind::Empty,
                "authorisation is enforced but the access token is empty",
            ));
        }
        Ok(())
    }

    /// The `Authorization` header value this configuration produces.
    pub fn header_value(&self) -> Result<String> {
        self.validate()?;
        match self.scheme {
            Some(scheme) if self.enforced => Ok(format!("{scheme} {}", self.access_token)),
            _ => Err(Error::new(ErrorKind::Undefined, "authorisation is not enforced")),
        }
    }
}
