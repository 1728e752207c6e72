use sha2::{Digest, Sha224};

use nativerw_types::Content;

use crate::digest::{ContentDigest, DIGEST_LEN};

/// SHA-224 content hasher.
///
/// Digests are computed over the content's canonical form (see
/// [`Content::canonical_bytes`]) so that JSON documents differing only in key
/// order hash identically.
pub struct NativeHasher;

impl NativeHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> ContentDigest {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&Sha224::digest(data));
        ContentDigest::from_hash(out)
    }

    /// Hash raw bytes and return lowercase hex.
    pub fn hash_hex(data: &[u8]) -> String {
        Self::hash(data).to_hex()
    }

    /// Hash a resource's content in canonical form.
    pub fn hash_content(content: &Content) -> Result<ContentDigest, HasherError> {
        let data = content
            .canonical_bytes()
            .map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(Self::hash(&data))
    }

    /// Returns `true` if `content` hashes to the hex digest `expected`.
    ///
    /// An unparseable `expected` never matches.
    pub fn verify(content: &Content, expected: &str) -> Result<bool, HasherError> {
        let Ok(expected) = ContentDigest::from_hex(expected) else {
            return Ok(false);
        };
        Ok(Self::hash_content(content)? == expected)
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_sha224_vector() {
        // SHA-224("abc"), FIPS 180-2 appendix.
        assert_eq!(
            NativeHasher::hash_hex(b"abc"),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
    }

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            NativeHasher::hash_hex(b""),
            "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(NativeHasher::hash(b"payload"), NativeHasher::hash(b"payload"));
        assert_ne!(NativeHasher::hash(b"payload"), NativeHasher::hash(b"payload2"));
    }

    #[test]
    fn json_key_order_does_not_matter() {
        let a = Content::json(serde_json::from_str(r#"{"z":1,"a":[1,2]}"#).unwrap());
        let b = Content::json(json!({"a": [1, 2], "z": 1}));
        assert_eq!(
            NativeHasher::hash_content(&a).unwrap(),
            NativeHasher::hash_content(&b).unwrap()
        );
    }

    #[test]
    fn json_content_hashes_compact_form() {
        let c = Content::json(json!({"a": 1}));
        assert_eq!(
            NativeHasher::hash_content(&c).unwrap().to_hex(),
            NativeHasher::hash_hex(br#"{"a":1}"#)
        );
    }

    #[test]
    fn verify_matches_and_mismatches() {
        let c = Content::binary(&b"bytes"[..]);
        let digest = NativeHasher::hash_hex(b"bytes");
        assert!(NativeHasher::verify(&c, &digest).unwrap());
        assert!(NativeHasher::verify(&c, &digest.to_uppercase()).unwrap());
        assert!(!NativeHasher::verify(&c, &NativeHasher::hash_hex(b"other")).unwrap());
        assert!(!NativeHasher::verify(&c, "not-hex").unwrap());
    }
}
