//! Oracle environment configuration loader
//!
//! Resolves the active environment from `ORACLE_ENV` (`DEV1`, `TEST`,
//! `PROD`; default `PROD`) against the built-in tenant table, then applies
//! per-field environment-variable overrides.
//!
//! ## Environment Variables
//! - `ORACLE_ENV`: environment selector
//! - `ORACLE_BASE_URL`: SCM cloud base URL override
//! - `ORACLE_AUTH_URL`: IDCS authorization endpoint override
//! - `ORACLE_TOKEN_URL`: IDCS token endpoint override
//! - `ORACLE_CLIENT_ID`: OAuth client ID override
//! - `ORACLE_SCOPE`: OAuth scope override
//! - `ORACLE_REDIRECT_PORT`: loopback callback port override (default 3009)

use scmlink_domain::{OracleConfig, OracleEnv, Result, ScmLinkError};
use tracing::info;

/// Loopback port baked into the registered redirect URIs.
pub const DEFAULT_REDIRECT_PORT: u16 = 3009;

struct TenantEntry {
    base_url: &'static str,
    auth_url: &'static str,
    token_url: &'static str,
    client_id: &'static str,
    scope: &'static str,
}

fn tenant_entry(env: OracleEnv) -> TenantEntry {
    match env {
        OracleEnv::Dev1 => TenantEntry {
            base_url: "https://ehsg-dev1.fa.us6.oraclecloud.com",
            auth_url: "https://idcs-10a29e74c18944ec81b18f08f9fc1362.identity.oraclecloud.com/oauth2/v1/authorize",
            token_url: "https://idcs-10a29e74c18944ec81b18f08f9fc1362.identity.oraclecloud.com/oauth2/v1/token",
            client_id: "522f1ba486ff4d32951f94faba65ec64",
            scope: "urn:opc:resource:fa:instanceid=589866548urn:opc:resource:consumer::all",
        },
        OracleEnv::Test => TenantEntry {
            base_url: "https://ehsg-test.fa.us6.oraclecloud.com",
            auth_url: "https://idcs-a57149b4f14045039295c03cb5771671.identity.oraclecloud.com/oauth2/v1/authorize",
            token_url: "https://idcs-a57149b4f14045039295c03cb5771671.identity.oraclecloud.com/oauth2/v1/token",
            client_id: "b2be270e16a64940ad414af496795d93",
            scope: "urn:opc:resource:fa:instanceid=589866549urn:opc:resource:consumer::all",
        },
        OracleEnv::Prod => TenantEntry {
            base_url: "https://ehsg.fa.us6.oraclecloud.com",
            auth_url: "https://idcs-24cbca7916e44e3da0d4b5bfda3820a3.identity.oraclecloud.com/oauth2/v1/authorize",
            token_url: "https://idcs-24cbca7916e44e3da0d4b5bfda3820a3.identity.oraclecloud.com/oauth2/v1/token",
            client_id: "d93df868766f45d9b6ac4fb9c6d8bcad",
            scope: "urn:opc:resource:fa:instanceid=1716952urn:opc:resource:consumer::all",
        },
    }
}

/// Load the configuration for the environment named by `ORACLE_ENV`.
///
/// # Errors
/// Returns `ScmLinkError::Config` if the environment name or the redirect
/// port override is invalid.
pub fn load() -> Result<OracleConfig> {
    let env_name = std::env::var("ORACLE_ENV").unwrap_or_else(|_| "PROD".to_string());
    let env: OracleEnv = env_name.parse()?;
    load_for_env(env)
}

/// Load the configuration for a specific environment, applying overrides.
///
/// # Errors
/// Returns `ScmLinkError::Config` if the redirect port override is invalid.
pub fn load_for_env(env: OracleEnv) -> Result<OracleConfig> {
    let entry = tenant_entry(env);

    let redirect_port = match std::env::var("ORACLE_REDIRECT_PORT") {
        Ok(raw) => raw.parse::<u16>().map_err(|e| {
            ScmLinkError::Config(format!("invalid ORACLE_REDIRECT_PORT '{raw}': {e}"))
        })?,
        Err(_) => DEFAULT_REDIRECT_PORT,
    };

    let config = OracleConfig {
        env,
        base_url: override_var("ORACLE_BASE_URL", entry.base_url),
        auth_url: override_var("ORACLE_AUTH_URL", entry.auth_url),
        token_url: override_var("ORACLE_TOKEN_URL", entry.token_url),
        client_id: override_var("ORACLE_CLIENT_ID", entry.client_id),
        scope: override_var("ORACLE_SCOPE", entry.scope),
        redirect_port,
    };

    info!(env = %config.env, base_url = %config.base_url, "resolved Oracle environment configuration");
    Ok(config)
}

fn override_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
