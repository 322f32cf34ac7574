//! Content verification for documents whose digest was declared by a parent
//! document.
//!
//! The registry's root index declares a SHA-256 for every provider shard, and
//! each shard declares one for every per-package provider document. A body is
//! only trusted once it hashes to the digest its parent asserted.
//!
//! ```
//! use packmirror_verify::{sha256_hex, verify};
//!
//! let body = br#"{"providers":{}}"#;
//! let digest = sha256_hex(body);
//! assert!(verify(body, &digest));
//! assert!(verify(body, &digest.to_uppercase()));
//! assert!(!verify(b"tampered", &digest));
//! ```

pub use self::error::{Result, VerificationError};
pub use self::hasher::{Hasher, Sha256Hasher};

mod error;
mod hasher;

/// Hex-encoded SHA-256 of `data`, lowercase.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256Hasher::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether `body` hashes to `expected_hex` (compared case-insensitively).
pub fn verify(body: &[u8], expected_hex: &str) -> bool { check(body, expected_hex).is_ok() }

/// Like [`verify`], but reports both digests on mismatch.
pub fn check(body: &[u8], expected_hex: &str) -> Result<()> {
    let actual = sha256_hex(body);
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        Ok(())
    } else {
        Err(VerificationError::Mismatch {
            expected: expected_hex.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn verify_checksum_valid() {
        assert!(verify(b"hello world", HELLO_WORLD));
    }

    #[test]
    fn verify_checksum_uppercase() {
        assert!(verify(b"hello world", &HELLO_WORLD.to_ascii_uppercase()));
    }

    #[test]
    fn verify_checksum_invalid() {
        let zero = "0".repeat(64);
        assert!(!verify(b"hello world", &zero));

        match check(b"hello world", &zero) {
            Err(VerificationError::Mismatch { expected, actual }) => {
                assert_eq!(expected, zero);
                assert_eq!(actual, HELLO_WORLD);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn verify_rejects_empty_digest() {
        assert!(!verify(b"hello world", ""));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hex::encode(hasher.finalize()), HELLO_WORLD);
    }
}
