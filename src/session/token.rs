//! Opaque session tokens
//!
//! The plaintext goes to the client exactly once. Only its SHA-256 hex digest
//! is stored, so a leaked sessions table cannot be replayed.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Entropy per token, before encoding
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh token, returning `(plaintext, digest)`
pub fn generate_session_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let digest = hash_token(&plaintext);
    (plaintext, digest)
}

/// Lowercase hex SHA-256 of the token text
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
