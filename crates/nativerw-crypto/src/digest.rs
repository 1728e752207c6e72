use std::fmt;

use crate::hasher::HasherError;

/// Length in bytes of a SHA-224 digest.
pub const DIGEST_LEN: usize = 28;

/// SHA-224 digest of a payload's canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Wrap raw SHA-224 output.
    pub fn from_hash(hash: [u8; DIGEST_LEN]) -> Self {
        Self(hash)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex form (56 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex digest. Surrounding whitespace is ignored and either
    /// letter case is accepted.
    pub fn from_hex(s: &str) -> Result<Self, HasherError> {
        let bytes = hex::decode(s.trim()).map_err(|e| HasherError::InvalidHex(e.to_string()))?;
        let arr: [u8; DIGEST_LEN] = bytes.as_slice().try_into().map_err(|_| HasherError::InvalidLength {
            expected: DIGEST_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse_accepts_uppercase_and_whitespace() {
        let d = ContentDigest::from_hash([0xab; DIGEST_LEN]);
        let upper = format!("  {}\n", d.to_hex().to_uppercase());
        assert_eq!(ContentDigest::from_hex(&upper).unwrap(), d);
    }

    #[test]
    fn hex_parse_rejects_wrong_length() {
        let err = ContentDigest::from_hex("abcd").unwrap_err();
        assert_eq!(err, HasherError::InvalidLength { expected: 28, actual: 2 });
    }

    #[test]
    fn hex_parse_rejects_garbage() {
        assert!(matches!(ContentDigest::from_hex("zz"), Err(HasherError::InvalidHex(_))));
    }

    #[test]
    fn display_is_full_hex() {
        let d = ContentDigest::from_hash([1; DIGEST_LEN]);
        assert_eq!(format!("{d}").len(), 56);
    }
}
