//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without an embedded client secret.
//! IDCS requires the S256 challenge method.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::debug;

/// RFC 7636 unreserved character set for code verifiers.
const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier length. RFC 7636 allows 43-128; the full 128 is used here.
const VERIFIER_LEN: usize = 128;

/// Generate a cryptographically secure code verifier
///
/// Returns a 128-character string drawn uniformly from the RFC 7636
/// unreserved set `[A-Za-z0-9-._~]`, sourced from the OS RNG.
#[must_use]
pub fn generate_verifier() -> String {
    let index = Uniform::from(0..VERIFIER_CHARSET.len());
    let mut rng = OsRng;
    let verifier: String =
        (0..VERIFIER_LEN).map(|_| VERIFIER_CHARSET[index.sample(&mut rng)] as char).collect();

    debug!(length = verifier.len(), "generated PKCE code verifier");
    verifier
}

/// Derive the code challenge from a verifier using SHA-256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
/// with padding stripped. Pure function; deterministic given its input.
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// PKCE verifier/challenge pair for one authorization attempt
///
/// A pair is single-use: generated fresh per attempt and never persisted.
/// The verifier is kept secret until the token exchange; the challenge goes
/// into the authorization request.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Random 128-character string, sent during token exchange
    pub verifier: String,

    /// SHA-256 hash of the verifier (base64url, no padding), sent in the
    /// authorization request
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = derive_challenge(&verifier);
        Self { verifier, challenge }
    }

    /// Challenge method sent to the authorization endpoint (always "S256").
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn verifier_is_128_chars_from_unreserved_set() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 128);
        assert!(verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')));
    }

    #[test]
    fn verifiers_are_pairwise_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_verifier()), "duplicate verifier generated");
        }
    }

    #[test]
    fn challenge_is_deterministic() {
        let pair = PkcePair::generate();
        assert_eq!(pair.challenge, derive_challenge(&pair.verifier));
        assert_eq!(derive_challenge(&pair.verifier), derive_challenge(&pair.verifier));
    }

    #[test]
    fn challenge_is_url_safe_without_padding() {
        let challenge = derive_challenge("test-verifier");
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
        assert!(!challenge.ends_with('='));
        // SHA-256 digest encodes to 43 base64url characters
        assert_eq!(challenge.len(), 43);
    }

    #[test]
    fn known_vector_matches_rfc_transform() {
        // Appendix B of RFC 7636
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(derive_challenge(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn challenge_method_is_s256() {
        assert_eq!(PkcePair::generate().challenge_method(), "S256");
    }
}
