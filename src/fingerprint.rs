//! Source fingerprinting
//!
//! The SHA-256 hex of the raw source bytes is the universal join key across
//! contracts, analyses and generated tests. No normalization is applied:
//! byte-identical sources, and only those, share a fingerprint.

use sha2::{Digest, Sha256};

/// Compute the fingerprint of a source artifact: 64-char lowercase hex.
pub fn source_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            source_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_no_normalization() {
        // Line endings matter: the fingerprint is over raw bytes
        assert_ne!(source_hash("contract A {}\n"), source_hash("contract A {}\r\n"));
    }

    proptest! {
        #[test]
        fn prop_shape_and_determinism(source in ".*") {
            let hash = source_hash(&source);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            prop_assert_eq!(&hash, &source_hash(&source));
        }

        #[test]
        fn prop_distinct_inputs_distinct_hashes(a in ".*", b in ".*") {
            prop_assume!(a != b);
            prop_assert_ne!(source_hash(&a), source_hash(&b));
        }
    }
}
