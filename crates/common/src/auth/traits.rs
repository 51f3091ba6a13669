//! Traits for OAuth and credential storage operations
//!
//! These seams enable dependency injection and testing: the token manager is
//! generic over both, and `testing` provides in-memory doubles.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::CredentialRecord;
use crate::security::KeychainError;

/// OAuth client operations needed by the token lifecycle.
#[async_trait]
pub trait OAuthClientApi: Send + Sync {
    /// Build the authorization URL for a browser-based login.
    ///
    /// `code_challenge` is the S256 challenge of the PKCE pair owned by the
    /// caller; the matching verifier must be supplied to [`Self::exchange_code`].
    fn authorization_url(&self, code_challenge: &str) -> String;

    /// Exchange an authorization code for a credential record.
    ///
    /// # Errors
    /// Returns an error if the exchange request fails, the endpoint rejects
    /// the code, or the response cannot be parsed.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<CredentialRecord, OAuthClientError>;

    /// Obtain a fresh credential record using a refresh token.
    ///
    /// # Errors
    /// Returns an error if the request fails or the endpoint rejects the
    /// refresh token (expired tokens are rejected the same way).
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<CredentialRecord, OAuthClientError>;

    /// The redirect URI registered for this client.
    fn redirect_uri(&self) -> &str;
}

/// Persistence seam for credential records.
///
/// Implementations must serialize mutations so that a save or clear is
/// atomic with respect to a concurrent load.
#[async_trait]
pub trait CredentialStoreApi: Send + Sync {
    /// Persist a record, replacing whatever was stored.
    async fn save(&self, record: &CredentialRecord) -> Result<(), KeychainError>;

    /// Load the stored record.
    ///
    /// # Errors
    /// Returns [`KeychainError::NotFound`] when no record is stored.
    async fn load(&self) -> Result<CredentialRecord, KeychainError>;

    /// Remove every stored secret (idempotent).
    async fn clear(&self) -> Result<(), KeychainError>;
}
