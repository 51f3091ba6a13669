//! Loopback HTTP server that receives the OAuth authorization redirect.
//!
//! Binds `127.0.0.1` on the fixed port registered for the redirect URI and
//! captures the `code` query parameter of a single GET. The captured code is
//! handed to the waiting orchestrator through a one-shot channel, so the
//! wait is event-driven rather than polled; the caller bounds it with
//! `wait_for_code`'s timeout and then shuts the server down explicitly.
//!
//! Exactly one code is accepted per server instance. Axum's default request
//! logging is not enabled, so stray requests stay quiet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use scmlink_domain::{Result, ScmLinkError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Complete</title></head>
<body><h1>Authorization successful!</h1><p>You can close this window.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization failed!</h1><p>No authorization code received.</p></body>
</html>"#;

type CodeSender = Arc<StdMutex<Option<oneshot::Sender<String>>>>;

/// One-shot loopback server for the authorization redirect.
pub struct CallbackServer {
    port: u16,
    code_rx: Option<oneshot::Receiver<String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the listener on `127.0.0.1:port`.
    ///
    /// Port 0 binds an ephemeral port (used by tests); the fixed registered
    /// port comes from the environment configuration. Binding fails while
    /// another authorization session holds the port, which is what enforces
    /// one active session at a time.
    ///
    /// # Errors
    /// Returns `ScmLinkError::Network` if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            ScmLinkError::Network(format!("failed to bind OAuth callback listener on port {port}: {e}"))
        })?;

        let port = listener
            .local_addr()
            .map_err(|e| ScmLinkError::Network(format!("failed to determine callback port: {e}")))?
            .port();

        let (code_tx, code_rx) = oneshot::channel();
        let code_tx: CodeSender = Arc::new(StdMutex::new(Some(code_tx)));

        let app = Router::new().route(
            "/callback",
            get(move |query: Query<HashMap<String, String>>| {
                handle_callback(query, code_tx.clone())
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("OAuth callback server error: {e}");
            }
        });

        info!(port, "OAuth callback listener started");

        Ok(Self { port, code_rx: Some(code_rx), shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    /// Port the listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI served by this listener.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Await the authorization code, bounded by `timeout`.
    ///
    /// # Errors
    /// - `ScmLinkError::AuthTimeout` when no code arrives in time
    /// - `ScmLinkError::Internal` if called twice or the server died
    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<String> {
        let rx = self
            .code_rx
            .take()
            .ok_or_else(|| ScmLinkError::Internal("authorization code already consumed".to_string()))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(code)) => {
                info!("authorization code received");
                Ok(code)
            }
            Ok(Err(_)) => {
                Err(ScmLinkError::Internal("callback listener closed unexpectedly".to_string()))
            }
            Err(_) => Err(ScmLinkError::AuthTimeout(timeout.as_secs())),
        }
    }

    /// Shut the listener down gracefully and release the port.
    ///
    /// # Errors
    /// Returns `ScmLinkError::Internal` if the serving task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    return Err(ScmLinkError::Internal(format!(
                        "OAuth callback server panicked: {e}"
                    )));
                }
            }
        }

        debug!(port = self.port, "OAuth callback listener stopped");
        Ok(())
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(
    Query(params): Query<HashMap<String, String>>,
    code_tx: CodeSender,
) -> (StatusCode, Html<&'static str>) {
    match params.get("code").filter(|code| !code.is_empty()) {
        Some(code) => {
            let sender = code_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
            match sender {
                Some(tx) => {
                    // The receiver may already be gone (timed-out wait); the
                    // browser still gets the success page either way.
                    let _ = tx.send(code.clone());
                }
                None => debug!("duplicate authorization callback ignored"),
            }
            (StatusCode::OK, Html(SUCCESS_PAGE))
        }
        None => {
            debug!("authorization callback without code rejected");
            (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redirect_uri_reflects_bound_port() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port();
        assert!(port > 0);
        assert_eq!(server.redirect_uri(), format!("http://127.0.0.1:{port}/callback"));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn wait_times_out_without_a_callback() {
        let mut server = CallbackServer::bind(0).await.unwrap();
        let err = server.wait_for_code(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ScmLinkError::AuthTimeout(_)));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn waiting_twice_is_an_error() {
        let mut server = CallbackServer::bind(0).await.unwrap();
        let _ = server.wait_for_code(Duration::from_millis(10)).await;
        let err = server.wait_for_code(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, ScmLinkError::Internal(_)));
        server.shutdown().await.unwrap();
    }
}
