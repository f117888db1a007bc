//! PKCE (Proof Key for Code Exchange) support for OAuth 2.0.
//!
//! Implements the S256 method of RFC 7636 for securing authorization code flows.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{config_error, ConfigErrorKind, Error};

/// Verifier length used by the authorization URL builder.
pub const DEFAULT_VERIFIER_LENGTH: usize = 64;

const MIN_VERIFIER_LENGTH: usize = 43;
const MAX_VERIFIER_LENGTH: usize = 128;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of 62 that fits in a byte; bytes at or above it are
// rejected so every alphabet character is equally likely.
const REJECTION_BOUND: u8 = 248;

/// PKCE code verifier (random string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a new random verifier of exactly `length` characters.
    ///
    /// Every character is drawn from the 62-character alphanumeric alphabet,
    /// which is a subset of the base64url alphabet.
    pub fn generate(length: usize) -> Result<Self, Error> {
        if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
            return Err(config_error(
                ConfigErrorKind::InvalidValue,
                &format!(
                    "PKCE verifier length must be between {} and {}, got {}",
                    MIN_VERIFIER_LENGTH, MAX_VERIFIER_LENGTH, length
                ),
            ));
        }

        let mut rng = rand::thread_rng();
        let mut verifier = String::with_capacity(length);
        let mut buf = [0u8; 64];
        while verifier.len() < length {
            rng.fill_bytes(&mut buf);
            for byte in buf.iter().copied().filter(|b| *b < REJECTION_BOUND) {
                if verifier.len() == length {
                    break;
                }
                verifier.push(ALPHABET[(byte % 62) as usize] as char);
            }
        }
        Ok(Self(verifier))
    }

    /// Create a PKCE verifier from an existing string.
    pub fn from_string(verifier: String) -> Self {
        Self(verifier)
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Generate the corresponding code challenge.
    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge::from_verifier(self)
    }
}

/// PKCE code challenge (SHA256 hash of verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create a code challenge from a verifier: base64url(SHA-256(verifier)), no padding.
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let hash = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    /// Get the challenge string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generate an S256 challenge/verifier pair with a verifier of `length` characters.
pub fn generate_s256(length: usize) -> Result<(PkceChallenge, PkceVerifier), Error> {
    let verifier = PkceVerifier::generate(length)?;
    Ok((verifier.challenge(), verifier))
}
