//! Oracle environment configuration types.
//!
//! An [`OracleConfig`] describes one Oracle Fusion tenant: the SCM base URL
//! plus the IDCS OAuth endpoints registered for it. Configs are resolved by
//! the infra loader; one config (and one auth manager built from it) exists
//! per environment so dev/test/prod credential sets stay independent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ScmLinkError;

/// Known Oracle environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleEnv {
    Dev1,
    Test,
    Prod,
}

impl OracleEnv {
    /// All recognized environments, in resolution-table order.
    pub const ALL: [Self; 3] = [Self::Dev1, Self::Test, Self::Prod];

    /// Canonical uppercase name used in `ORACLE_ENV` and keychain service
    /// names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev1 => "DEV1",
            Self::Test => "TEST",
            Self::Prod => "PROD",
        }
    }
}

impl fmt::Display for OracleEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OracleEnv {
    type Err = ScmLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEV1" => Ok(Self::Dev1),
            "TEST" => Ok(Self::Test),
            "PROD" => Ok(Self::Prod),
            other => Err(ScmLinkError::Config(format!(
                "invalid Oracle environment '{other}'; valid values are DEV1, TEST, PROD"
            ))),
        }
    }
}

/// Configuration for a single Oracle environment/tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Which environment this configuration describes
    pub env: OracleEnv,

    /// SCM cloud base URL (no trailing slash expected; consumers strip it)
    pub base_url: String,

    /// IDCS authorization endpoint (full URL)
    pub auth_url: String,

    /// IDCS token endpoint (full URL)
    pub token_url: String,

    /// OAuth client ID registered for this tenant
    pub client_id: String,

    /// OAuth scope string for the Fusion instance
    pub scope: String,

    /// Loopback port for the registered redirect URI
    pub redirect_port: u16,
}

impl OracleConfig {
    /// The redirect URI matching the statically registered OAuth client.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }
}
