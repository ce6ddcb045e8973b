//! Content hashing for duplicate detection.
//!
//! Message hashes are MD5 digests of the normalised text so that rows
//! written by earlier deployments of the bot keep matching.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase the text and collapse every whitespace run into one space.
///
/// Leading and trailing whitespace is dropped.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hex MD5 digest of the normalised text (32 lowercase hex chars).
pub fn message_hash(text: &str) -> String {
    let digest = md5::compute(normalize_text(text).as_bytes());
    format!("{digest:x}")
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compare two secrets in constant time.
///
/// Both sides are hashed first, so neither the position of the first
/// mismatch nor a length difference shows up in timing.
pub fn secrets_match(supplied: &str, expected: &str) -> bool {
    let supplied = Sha256::digest(supplied.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    supplied.as_slice().ct_eq(expected.as_slice()).into()
}
