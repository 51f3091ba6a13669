//! OAuth credential storage layered on top of [`SecretStore`].
//!
//! Three fixed accounts hold the credential record, mirroring the secret
//! layout the Oracle tooling has always used:
//!
//! - `oauth_token` — the access token
//! - `oauth_token_expiry` — expiry instant as a stringified float (UNIX
//!   seconds)
//! - `oauth_refresh_token` — the refresh token, when one was issued
//!
//! Mutations are serialized behind a mutex so a save or clear is atomic with
//! respect to a load from a concurrent tool invocation.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, warn};

use super::traits::CredentialStoreApi;
use super::types::CredentialRecord;
use crate::security::{KeychainError, KeychainProvider, SecretStore};

const ACCESS_TOKEN_ACCOUNT: &str = "oauth_token";
const EXPIRY_ACCOUNT: &str = "oauth_token_expiry";
const REFRESH_TOKEN_ACCOUNT: &str = "oauth_refresh_token";

/// Credential store backed by the platform keychain.
///
/// Generic over [`SecretStore`] so tests can substitute the in-memory
/// provider; production code uses [`KeychainProvider`].
pub struct KeychainCredentialStore<P: SecretStore = KeychainProvider> {
    provider: P,
    lock: Mutex<()>,
}

impl<P: SecretStore> KeychainCredentialStore<P> {
    /// Wrap a secret store.
    pub fn new(provider: P) -> Self {
        Self { provider, lock: Mutex::new(()) }
    }

    fn save_sync(&self, record: &CredentialRecord) -> Result<(), KeychainError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        self.provider.set_secret(ACCESS_TOKEN_ACCOUNT, &record.access_token)?;

        match record.expires_at {
            Some(expires_at) => {
                let expiry = expires_at.timestamp_millis() as f64 / 1000.0;
                self.provider.set_secret(EXPIRY_ACCOUNT, &expiry.to_string())?;
            }
            None => self.provider.delete_secret(EXPIRY_ACCOUNT)?,
        }

        match &record.refresh_token {
            Some(refresh) => self.provider.set_secret(REFRESH_TOKEN_ACCOUNT, refresh)?,
            None => {
                // Retain any previously stored refresh token. Refresh
                // responses that omit the field do not revoke the old one.
            }
        }

        debug!("credential record saved to keychain");
        Ok(())
    }

    fn load_sync(&self) -> Result<CredentialRecord, KeychainError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let access_token = self.provider.get_secret(ACCESS_TOKEN_ACCOUNT)?;

        let expires_at = match self.provider.get_secret(EXPIRY_ACCOUNT) {
            Ok(raw) => parse_expiry(&raw),
            Err(KeychainError::NotFound) => None,
            Err(other) => return Err(other),
        };

        let refresh_token = match self.provider.get_secret(REFRESH_TOKEN_ACCOUNT) {
            Ok(value) => Some(value),
            Err(KeychainError::NotFound) => None,
            Err(other) => return Err(other),
        };

        Ok(CredentialRecord { access_token, expires_at, refresh_token })
    }

    fn clear_sync(&self) -> Result<(), KeychainError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        self.provider.delete_secret(ACCESS_TOKEN_ACCOUNT)?;
        self.provider.delete_secret(EXPIRY_ACCOUNT)?;
        self.provider.delete_secret(REFRESH_TOKEN_ACCOUNT)?;

        debug!("credential record cleared from keychain");
        Ok(())
    }
}

fn parse_expiry(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    match raw.trim().parse::<f64>() {
        Ok(seconds) => DateTime::from_timestamp_millis((seconds * 1000.0) as i64),
        Err(_) => {
            warn!("stored token expiry is not a valid float; treating as absent");
            None
        }
    }
}

#[async_trait]
impl<P: SecretStore> CredentialStoreApi for KeychainCredentialStore<P> {
    async fn save(&self, record: &CredentialRecord) -> Result<(), KeychainError> {
        self.save_sync(record)
    }

    async fn load(&self) -> Result<CredentialRecord, KeychainError> {
        self.load_sync()
    }

    async fn clear(&self) -> Result<(), KeychainError> {
        self.clear_sync()
    }
}
