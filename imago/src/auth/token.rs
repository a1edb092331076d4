//! Bearer token generation and hashing.
//!
//! Tokens are random bytes encoded as URL-safe base64. Storage only ever sees
//! [`hash_token`] of a token, which is a plain SHA-256: the input already
//! carries at least 256 bits of entropy, so no salt or work factor is needed.

use base64::{Engine, engine::general_purpose::URL_SAFE};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Lower bound on random bytes per token
pub const MIN_TOKEN_BYTES: usize = 32;

/// Generate a fresh raw token from `bytes` random bytes.
///
/// Values below [`MIN_TOKEN_BYTES`] are raised to it.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(MIN_TOKEN_BYTES)];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE.encode(&buf)
}

/// Deterministic digest of a raw token, used as the storage lookup key.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE.encode(digest)
}
