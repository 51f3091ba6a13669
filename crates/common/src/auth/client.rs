//! OAuth 2.0 client for Oracle IDCS
//!
//! Handles the wire-level pieces of the authorization-code flow:
//! - Authorization URL building (with a caller-supplied PKCE challenge)
//! - Authorization code exchange
//! - Token refresh
//!
//! The interactive orchestration (listener, browser) lives in infra; this
//! client is deliberately stateless so a PKCE pair never outlives its
//! authorization attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use super::traits::OAuthClientApi;
use super::types::{CredentialRecord, OAuthErrorBody, OracleOAuthConfig, TokenResponse};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for OAuth client operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// HTTP request failed before a response was produced
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The token endpoint returned a non-success status
    #[error("token endpoint rejected the request (HTTP {status}): {message}")]
    Endpoint { status: u16, message: String },

    /// A success response could not be parsed
    #[error("failed to parse token response: {0}")]
    Parse(String),

    /// Refresh was attempted without a refresh token
    #[error("no refresh token available")]
    NoRefreshToken,
}

/// OAuth 2.0 client with PKCE support for Oracle IDCS
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OracleOAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new client for the given tenant configuration.
    #[must_use]
    pub fn new(config: OracleOAuthConfig) -> Self {
        let client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Build the authorization URL for a browser-based login.
    ///
    /// Query parameters follow the IDCS contract: `client_id`,
    /// `response_type=code`, `redirect_uri`, `scope`, `code_challenge`,
    /// `code_challenge_method=S256`.
    #[must_use]
    pub fn authorization_url(&self, code_challenge: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scope.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.auth_url, query)
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// Returns an error if the request fails, the endpoint rejects the code,
    /// or the response cannot be parsed.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        info!("exchanging authorization code for access token");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        self.token_request(&form).await
    }

    /// Refresh the access token using a refresh token.
    ///
    /// An expired refresh token is rejected by the endpoint like any other
    /// invalid grant; callers treat that as an ordinary refresh failure.
    ///
    /// # Errors
    /// Returns an error if no refresh token is supplied, the request fails,
    /// or the endpoint rejects the grant.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        info!("refreshing access token");

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        self.token_request(&form).await
    }

    /// The redirect URI registered for this client.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
    ) -> Result<CredentialRecord, OAuthClientError> {
        debug!(url = %self.config.token_url, "posting to token endpoint");

        let response = self.client.post(&self.config.token_url).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthErrorBody>(&body)
                .map(|err| err.to_string())
                .unwrap_or(body);
            return Err(OAuthClientError::Endpoint { status: status.as_u16(), message });
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::Parse(e.to_string()))?;

        debug!(
            token_length = token_response.access_token.len(),
            has_refresh_token = token_response.refresh_token.is_some(),
            expires_in = token_response.expires_in,
            "token endpoint responded"
        );

        Ok(token_response.into())
    }
}

#[async_trait]
impl OAuthClientApi for OAuthClient {
    fn authorization_url(&self, code_challenge: &str) -> String {
        self.authorization_url(code_challenge)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        self.exchange_code(code, code_verifier).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        self.refresh_access_token(refresh_token).await
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uri()
    }
}
