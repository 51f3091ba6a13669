//! Oracle IDCS authentication orchestration.
//!
//! `OracleAuthManager` is the front door for bearer tokens: it layers the
//! non-interactive acquisition chain from `scmlink-common` under the full
//! interactive PKCE flow (loopback listener, system browser, code exchange).
//! One manager exists per Oracle environment; construct it where the
//! application wires its dependencies and share it with `Arc`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scmlink_common::auth::{
    CredentialStoreApi, KeychainCredentialStore, OAuthClient, OracleOAuthConfig, PkcePair,
    TokenManager,
};
use scmlink_common::security::KeychainProvider;
use scmlink_domain::{OracleConfig, Result, ScmLinkError};
use tracing::{debug, info, warn};

use super::callback::CallbackServer;
use crate::errors::map_oauth_client_error;

/// Ceiling on the interactive flow, browser open to captured code.
pub const AUTH_FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Safety margin applied to every token expiry comparison, in seconds.
pub const EXPIRY_MARGIN_SECONDS: i64 = 300;

const KEYCHAIN_SERVICE_PREFIX: &str = "ScmLink.oracle";

/// Bearer-token lifecycle manager for one Oracle environment.
pub struct OracleAuthManager<S: CredentialStoreApi + 'static = KeychainCredentialStore> {
    config: OracleConfig,
    oauth_client: Arc<OAuthClient>,
    token_manager: TokenManager<OAuthClient, S>,
}

impl OracleAuthManager<KeychainCredentialStore> {
    /// Create a manager persisting credentials in the platform keychain.
    ///
    /// The keychain service name embeds the environment
    /// (`ScmLink.oracle.<ENV>`) so each environment keeps an independent
    /// credential set.
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        let service_name = format!("{KEYCHAIN_SERVICE_PREFIX}.{}", config.env);
        let store =
            Arc::new(KeychainCredentialStore::new(KeychainProvider::new(service_name)));
        Self::with_store(config, store)
    }
}

impl<S: CredentialStoreApi + 'static> OracleAuthManager<S> {
    /// Create a manager with an explicit credential store (tests inject an
    /// in-memory one here).
    #[must_use]
    pub fn with_store(config: OracleConfig, store: Arc<S>) -> Self {
        let oauth_client = Arc::new(OAuthClient::new(OracleOAuthConfig {
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            scope: config.scope.clone(),
            redirect_uri: config.redirect_uri(),
        }));

        let token_manager =
            TokenManager::new(oauth_client.clone(), store, EXPIRY_MARGIN_SECONDS);

        info!(env = %config.env, client_id = %config.client_id, "initialized Oracle auth manager");

        Self { config, oauth_client, token_manager }
    }

    /// Get a bearer token guaranteed usable for at least the expiry margin.
    ///
    /// Tries, in order: the in-memory token, the credential store, a token
    /// refresh, and finally the full interactive authorization flow. Only
    /// the interactive path produces user-visible side effects (browser
    /// launch, loopback listener).
    ///
    /// # Errors
    /// Propagates interactive-flow failures: listener bind errors, browser
    /// launch failures, the 300-second authorization timeout, and token
    /// exchange rejections. Non-interactive failures never surface here;
    /// they fall through to the next acquisition layer.
    pub async fn get_valid_token(&self) -> Result<String> {
        if let Some(token) = self.token_manager.acquire_cached().await {
            return Ok(token);
        }

        info!("no cached or refreshable token; starting interactive authorization flow");
        self.interactive_login().await
    }

    /// Clear the in-memory token state and the credential store.
    pub async fn invalidate(&self) {
        info!("invalidating Oracle credentials");
        self.token_manager.invalidate().await;
    }

    /// Headers for authenticated Oracle REST calls.
    ///
    /// # Errors
    /// Returns `ScmLinkError::Auth` when no token could be obtained.
    pub async fn bearer_headers(&self) -> Result<HashMap<String, String>> {
        let token = self.get_valid_token().await?;
        Ok(HashMap::from([
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]))
    }

    async fn interactive_login(&self) -> Result<String> {
        // Fresh single-use pair per authorization attempt
        let pkce = PkcePair::generate();

        let mut server = CallbackServer::bind(self.config.redirect_port).await?;
        let auth_url = self.oauth_client.authorization_url(&pkce.challenge);
        debug!(url = %auth_url, "authorization URL generated");

        info!("opening browser for authorization");
        if let Err(e) = open::that(&auth_url) {
            let _ = server.shutdown().await;
            return Err(ScmLinkError::Platform(format!("failed to open browser: {e}")));
        }

        let code = match server.wait_for_code(AUTH_FLOW_TIMEOUT).await {
            Ok(code) => code,
            Err(e) => {
                // The listener is stopped before the timeout propagates so
                // the port is free for the next attempt
                if let Err(shutdown_err) = server.shutdown().await {
                    warn!(error = %shutdown_err, "callback listener shutdown failed");
                }
                return Err(e);
            }
        };
        server.shutdown().await?;

        let record = self
            .oauth_client
            .exchange_code(&code, &pkce.verifier)
            .await
            .map_err(map_oauth_client_error)?;

        let token = record.access_token.clone();
        self.token_manager.store_record(record).await;

        info!("interactive authorization completed");
        Ok(token)
    }
}

/// Allow the auth manager (typically behind an `Arc`) to be used anywhere a
/// bearer token source is required.
#[async_trait]
impl<S: CredentialStoreApi + 'static> super::report::AccessTokenProvider for OracleAuthManager<S> {
    async fn access_token(&self) -> Result<String> {
        self.get_valid_token()
            .await
            .map_err(|e| ScmLinkError::Auth(format!("failed to get Oracle access token: {e}")))
    }
}
