//! OAuth 2.0 types and structures
//!
//! Credential records, token endpoint payloads, and the OAuth client
//! configuration for an Oracle IDCS tenant.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A bearer token plus its lifecycle metadata
///
/// Records are replaced wholesale on every exchange or refresh; there is no
/// partial mutation. A record with no expiry instant is never considered
/// usable, which forces the acquisition chain to re-validate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Opaque bearer token for Oracle REST/SOAP calls
    pub access_token: String,

    /// Absolute expiry instant (UTC), when the token endpoint reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Refresh token, when issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl CredentialRecord {
    /// Whether the token is still usable given a safety margin.
    ///
    /// A record is usable only while `now < expires_at - margin`. Records
    /// without an expiry instant are never usable.
    #[must_use]
    pub fn is_usable(&self, margin_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(margin_seconds) < expires_at,
            None => false,
        }
    }

    /// Seconds until expiry, if an expiry instant is known.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }
}

/// Token endpoint response (RFC 6749)
///
/// `access_token` is the only field IDCS guarantees; `expires_in` and
/// `refresh_token` are carried through when present.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

impl From<TokenResponse> for CredentialRecord {
    fn from(response: TokenResponse) -> Self {
        let expires_at =
            response.expires_in.map(|seconds| Utc::now() + Duration::seconds(seconds));
        Self { access_token: response.access_token, expires_at, refresh_token: response.refresh_token }
    }
}

/// OAuth error response from the token endpoint (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// OAuth client configuration for one IDCS tenant
///
/// IDCS endpoints do not follow a single-domain URL pattern, so the
/// authorize and token endpoints are configured as full URLs.
#[derive(Debug, Clone)]
pub struct OracleOAuthConfig {
    /// Authorization endpoint (full URL)
    pub auth_url: String,

    /// Token endpoint (full URL)
    pub token_url: String,

    /// OAuth client ID
    pub client_id: String,

    /// Scope string for the Fusion instance
    pub scope: String,

    /// Redirect URI registered for the client (loopback)
    pub redirect_uri: String,
}
