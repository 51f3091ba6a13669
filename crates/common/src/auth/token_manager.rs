//! Token lifecycle manager
//!
//! Owns the non-interactive part of the "get a valid token" chain:
//!
//! 1. in-memory record, if still outside the expiry margin
//! 2. credential-store record, promoted to memory when usable
//! 3. refresh, using a refresh token from memory or the store
//!
//! Every expiry comparison honors the same safety margin, including the one
//! applied to records freshly loaded from persistent storage. A failed
//! refresh clears all stored credentials so a dead refresh token is never
//! retried indefinitely; the interactive fallback is the caller's job
//! (`scmlink-infra`'s auth manager).

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::traits::{CredentialStoreApi, OAuthClientApi};
use super::types::CredentialRecord;
use crate::security::KeychainError;

/// Default safety margin applied to expiry checks, in seconds.
pub const DEFAULT_EXPIRY_MARGIN_SECONDS: i64 = 300;

/// Manages cached, persisted, and refreshed access tokens.
///
/// One manager exists per Oracle environment; it is a plain caller-owned
/// value with no process-wide state. Concurrent invocations may share it
/// through an `Arc`.
pub struct TokenManager<C: OAuthClientApi, S: CredentialStoreApi> {
    oauth_client: Arc<C>,
    store: Arc<S>,
    current: Arc<RwLock<Option<CredentialRecord>>>,
    expiry_margin_seconds: i64,
}

impl<C: OAuthClientApi, S: CredentialStoreApi> TokenManager<C, S> {
    /// Create a manager with the given collaborators and expiry margin.
    #[must_use]
    pub fn new(oauth_client: Arc<C>, store: Arc<S>, expiry_margin_seconds: i64) -> Self {
        Self {
            oauth_client,
            store,
            current: Arc::new(RwLock::new(None)),
            expiry_margin_seconds,
        }
    }

    /// Safety margin applied to every expiry comparison.
    #[must_use]
    pub fn expiry_margin(&self) -> i64 {
        self.expiry_margin_seconds
    }

    /// Try every non-interactive acquisition path in order.
    ///
    /// Returns `None` when nothing short of a full interactive flow can
    /// produce a usable token. Persistence failures are logged and treated
    /// as "no stored credential"; refresh failures clear stored state before
    /// returning `None`.
    pub async fn acquire_cached(&self) -> Option<String> {
        // 1. In-memory fast path
        if let Some(record) = self.current.read().await.as_ref() {
            if record.is_usable(self.expiry_margin_seconds) {
                debug!("using in-memory access token");
                return Some(record.access_token.clone());
            }
        }

        // 2. Credential store, promoting a usable record to memory
        let stored = match self.store.load().await {
            Ok(record) => Some(record),
            Err(KeychainError::NotFound) => {
                debug!("no credential record in store");
                None
            }
            Err(e) => {
                warn!(error = %e, "credential store read failed; treating as empty");
                None
            }
        };

        if let Some(record) = &stored {
            if record.is_usable(self.expiry_margin_seconds) {
                info!("using access token loaded from credential store");
                let token = record.access_token.clone();
                *self.current.write().await = stored;
                return Some(token);
            }
        }

        // 3. Refresh, with the refresh token from memory or the store
        let refresh_token = {
            let current = self.current.read().await;
            current
                .as_ref()
                .and_then(|r| r.refresh_token.clone())
                .or_else(|| stored.and_then(|r| r.refresh_token))
        };

        let Some(refresh_token) = refresh_token else {
            debug!("no refresh token available");
            return None;
        };

        match self.oauth_client.refresh_access_token(&refresh_token).await {
            Ok(mut record) => {
                // Endpoints that do not rotate the refresh token expect the
                // old one to stay in use.
                if record.refresh_token.is_none() {
                    record.refresh_token = Some(refresh_token);
                }
                info!("access token refreshed");
                let token = record.access_token.clone();
                self.store_record(record).await;
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed; clearing stored credentials");
                self.invalidate().await;
                None
            }
        }
    }

    /// Persist a freshly obtained record and promote it to memory.
    ///
    /// Persistence failures are logged, not propagated; the in-memory copy
    /// still serves until it expires.
    pub async fn store_record(&self, record: CredentialRecord) {
        if let Err(e) = self.store.save(&record).await {
            warn!(error = %e, "failed to persist credential record");
        }
        *self.current.write().await = Some(record);
    }

    /// Clear the in-memory record and every stored secret.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear credential store");
        } else {
            info!("credentials invalidated");
        }
    }

    /// Current in-memory record, if any (no acquisition attempted).
    pub async fn current_record(&self) -> Option<CredentialRecord> {
        self.current.read().await.clone()
    }
}
