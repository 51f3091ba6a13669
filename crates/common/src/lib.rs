//! # ScmLink Common
//!
//! OAuth 2.0 + PKCE infrastructure shared by the ScmLink integration crates.
//!
//! This crate contains:
//! - `auth`: PKCE generation, the IDCS OAuth client, credential records, and
//!   the layered token lifecycle manager
//! - `security`: generic platform keychain access
//! - `testing`: in-memory doubles for the storage and OAuth seams
//!
//! ## Architecture
//! - No dependency on `scmlink-domain`; modules expose their own error types
//!   and the infra crate maps them into the domain error at its boundary

pub mod auth;
pub mod security;
pub mod testing;
