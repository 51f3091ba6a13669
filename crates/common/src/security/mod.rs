//! Secure credential storage.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider, SecretStore};
