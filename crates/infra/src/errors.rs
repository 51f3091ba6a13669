//! Conversions from `scmlink-common` errors into the domain error.
//!
//! The common crate keeps module-local error enums; this module is the only
//! place where they are flattened into `ScmLinkError`, keeping the mapping
//! on the infrastructure side.

use scmlink_common::auth::OAuthClientError;
use scmlink_common::security::KeychainError;
use scmlink_domain::ScmLinkError;

/// Map OAuth client failures into the domain taxonomy.
pub(crate) fn map_oauth_client_error(err: OAuthClientError) -> ScmLinkError {
    match err {
        OAuthClientError::RequestFailed(e) => ScmLinkError::Network(e.to_string()),
        OAuthClientError::Endpoint { status, message } => {
            ScmLinkError::Auth(format!("token endpoint rejected the request (HTTP {status}): {message}"))
        }
        OAuthClientError::Parse(msg) => ScmLinkError::Protocol(msg),
        OAuthClientError::NoRefreshToken => {
            ScmLinkError::Auth("no refresh token available".to_string())
        }
    }
}

/// Map keychain failures into the domain taxonomy.
#[allow(dead_code)]
pub(crate) fn map_keychain_error(err: KeychainError) -> ScmLinkError {
    match err {
        KeychainError::NotFound => ScmLinkError::NotFound("keychain entry not found".to_string()),
        KeychainError::AccessFailed(msg) => ScmLinkError::Security(msg),
    }
}
