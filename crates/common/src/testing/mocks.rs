//! Mock implementations of the auth and storage traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::auth::client::OAuthClientError;
use crate::auth::traits::{CredentialStoreApi, OAuthClientApi};
use crate::auth::types::CredentialRecord;
use crate::security::{KeychainError, SecretStore};

// Mutex poisoning is acceptable in test doubles; a panicking test fails
// regardless, so locks below simply unwrap.

/// In-memory [`SecretStore`] with the same account-key semantics as the
/// platform keychain provider.
pub struct MockKeychainProvider {
    #[allow(dead_code)]
    service_name: String,
    secrets: Mutex<HashMap<String, String>>,
}

impl MockKeychainProvider {
    /// Create an isolated in-memory provider.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), secrets: Mutex::new(HashMap::new()) }
    }
}

impl SecretStore for MockKeychainProvider {
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.secrets.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        self.secrets.lock().unwrap().get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.secrets.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory credential store holding a single record.
#[derive(Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<CredentialRecord>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record in the store without going through `save`.
    pub fn seed(&self, record: CredentialRecord) {
        *self.record.lock().unwrap() = Some(record);
    }

    /// Inspect the stored record.
    #[must_use]
    pub fn stored(&self) -> Option<CredentialRecord> {
        self.record.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStoreApi for MemoryCredentialStore {
    async fn save(&self, record: &CredentialRecord) -> Result<(), KeychainError> {
        *self.record.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<CredentialRecord, KeychainError> {
        self.record.lock().unwrap().clone().ok_or(KeychainError::NotFound)
    }

    async fn clear(&self) -> Result<(), KeychainError> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

type ScriptedResult = Result<CredentialRecord, String>;

/// Scripted OAuth client double with call accounting.
///
/// Results are configured as `Result<CredentialRecord, String>`; error
/// strings surface as a synthetic endpoint rejection.
pub struct MockOAuthClient {
    redirect_uri: String,
    refresh_result: Mutex<ScriptedResult>,
    exchange_result: Mutex<ScriptedResult>,
    refresh_calls: Mutex<u32>,
    exchange_calls: Mutex<u32>,
    last_refresh_token: Mutex<Option<String>>,
}

impl Default for MockOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOAuthClient {
    /// Create a client that fails every scripted call until configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            redirect_uri: "http://127.0.0.1:3009/callback".to_string(),
            refresh_result: Mutex::new(Err("no refresh result configured".to_string())),
            exchange_result: Mutex::new(Err("no exchange result configured".to_string())),
            refresh_calls: Mutex::new(0),
            exchange_calls: Mutex::new(0),
            last_refresh_token: Mutex::new(None),
        }
    }

    /// Script the next (and all subsequent) refresh outcomes.
    pub fn set_refresh_result(&self, result: Result<CredentialRecord, String>) {
        *self.refresh_result.lock().unwrap() = result;
    }

    /// Script refresh to fail with an endpoint rejection.
    pub fn set_refresh_failure(&self, message: &str) {
        self.set_refresh_result(Err(message.to_string()));
    }

    /// Script the code-exchange outcome.
    pub fn set_exchange_result(&self, result: Result<CredentialRecord, String>) {
        *self.exchange_result.lock().unwrap() = result;
    }

    /// Number of refresh calls made.
    #[must_use]
    pub fn refresh_calls(&self) -> u32 {
        *self.refresh_calls.lock().unwrap()
    }

    /// Number of exchange calls made.
    #[must_use]
    pub fn exchange_calls(&self) -> u32 {
        *self.exchange_calls.lock().unwrap()
    }

    /// The refresh token supplied to the most recent refresh call.
    #[must_use]
    pub fn last_refresh_token(&self) -> Option<String> {
        self.last_refresh_token.lock().unwrap().clone()
    }

    fn materialize(result: &ScriptedResult) -> Result<CredentialRecord, OAuthClientError> {
        match result {
            Ok(record) => Ok(record.clone()),
            Err(message) => {
                Err(OAuthClientError::Endpoint { status: 400, message: message.clone() })
            }
        }
    }
}

#[async_trait]
impl OAuthClientApi for MockOAuthClient {
    fn authorization_url(&self, code_challenge: &str) -> String {
        format!("https://auth.invalid/oauth2/v1/authorize?code_challenge={code_challenge}")
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        *self.exchange_calls.lock().unwrap() += 1;
        Self::materialize(&self.exchange_result.lock().unwrap())
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<CredentialRecord, OAuthClientError> {
        *self.refresh_calls.lock().unwrap() += 1;
        *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());
        Self::materialize(&self.refresh_result.lock().unwrap())
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}
