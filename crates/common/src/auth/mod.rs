//! OAuth 2.0 + PKCE infrastructure for Oracle IDCS
//!
//! This module implements the authorization-code-with-PKCE flow used against
//! Oracle Identity Cloud Service, plus the token lifecycle around it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   TokenManager   │  Layered token acquisition (memory → store → refresh)
//! └────────┬─────────┘
//!          │
//!          ├──► OAuthClient              (authorize URL, code exchange, refresh)
//!          ├──► KeychainCredentialStore  (three-secret keychain persistence)
//!          └──► PKCE utilities           (verifier + S256 challenge)
//! ```
//!
//! The interactive part of the flow (loopback listener, browser launch) lives
//! in `scmlink-infra`; this module owns everything that does not need a
//! second execution context.

pub mod client;
pub mod keychain;
pub mod pkce;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use client::{OAuthClient, OAuthClientError};
pub use keychain::KeychainCredentialStore;
pub use pkce::{derive_challenge, generate_verifier, PkcePair};
pub use token_manager::TokenManager;
pub use traits::{CredentialStoreApi, OAuthClientApi};
pub use types::{CredentialRecord, OracleOAuthConfig, TokenResponse};
