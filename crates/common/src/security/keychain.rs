//! Generic keychain provider for secure credential storage
//!
//! A thin wrapper over the platform keychain for storing arbitrary secrets
//! across macOS (Keychain Access), Windows (Credential Manager), and Linux
//! (Secret Service API).
//!
//! The [`SecretStore`] trait is the seam consumed by higher layers; the
//! OAuth-specific storage helpers in `auth::keychain` are built on top of it,
//! and `testing::MockKeychainProvider` implements the same trait in memory.

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,
}

/// Abstract secret storage keyed by a logical account name.
///
/// Implementations must be usable from concurrent tool invocations; the
/// OAuth storage layer serializes multi-secret mutations on top of this.
pub trait SecretStore: Send + Sync {
    /// Persist a secret value.
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Retrieve a secret value.
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Delete a secret (idempotent; deleting a missing entry is not an
    /// error).
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Check whether a secret exists.
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

/// Platform keychain provider.
///
/// Entries are addressed by a fixed service name chosen at construction plus
/// the per-secret account key, so independent credential sets (for example
/// one per Oracle environment) never collide.
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Arguments
    /// * `service_name` - Service identifier (e.g., "ScmLink.oracle.PROD")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "deleting secret from keychain");

        let entry = self.create_entry(key)?;
        if let Err(e) = entry.delete_credential() {
            if !matches!(e, keyring::Error::NoEntry) {
                return Err(KeychainError::AccessFailed(format!(
                    "Failed to delete secret for {key}: {e}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Provider behaviour against the real keychain is environment-dependent;
    //! these tests cover the trait contract through the in-memory double.
    use super::*;
    use crate::testing::MockKeychainProvider;

    #[test]
    fn set_get_and_delete_secret() {
        let keychain = MockKeychainProvider::new("ScmLinkTest.secrets");

        keychain.set_secret("test.secret", "super-secret").unwrap();
        assert!(keychain.secret_exists("test.secret"));

        let retrieved = keychain.get_secret("test.secret").unwrap();
        assert_eq!(retrieved, "super-secret");

        keychain.delete_secret("test.secret").unwrap();
        assert!(!keychain.secret_exists("test.secret"));
    }

    #[test]
    fn delete_secret_is_idempotent() {
        let keychain = MockKeychainProvider::new("ScmLinkTest.secrets");

        keychain.delete_secret("test.secret.delete").unwrap();
        keychain.set_secret("test.secret.delete", "value").unwrap();
        keychain.delete_secret("test.secret.delete").unwrap();
        keychain.delete_secret("test.secret.delete").unwrap();
    }

    #[test]
    fn get_secret_not_found() {
        let keychain = MockKeychainProvider::new("ScmLinkTest.secrets");
        let result = keychain.get_secret("missing.secret");
        assert!(matches!(result, Err(KeychainError::NotFound)));
    }
}
