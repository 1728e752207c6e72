use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Identifier addressing a resource across all of its revisions.
///
/// Parsed identifiers must be in canonical form: lowercase, hyphenated, with
/// a UUID version nibble between 1 and 5. The binary form (16 bytes) is what
/// the store persists; the canonical string is what callers see.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Length of the canonical hyphenated string form.
    pub const CANONICAL_LEN: usize = 36;

    /// Parse and validate a canonical identifier string.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidIdentifier {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.len() != Self::CANONICAL_LEN {
            return Err(invalid("expected 36 characters"));
        }
        let uuid = Uuid::try_parse(value).map_err(|e| invalid(&e.to_string()))?;
        if uuid.hyphenated().to_string() != value {
            return Err(invalid("must be lowercase hyphenated"));
        }
        if !(1..=5).contains(&uuid.get_version_num()) {
            return Err(invalid("unsupported UUID version"));
        }
        Ok(Self(uuid))
    }

    /// Rebuild an identifier from its stored binary form.
    ///
    /// No version check is applied here: anything that made it into the
    /// store was validated on the way in.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(Uuid::from_bytes(arr)))
    }

    /// Generate a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The raw 16-byte binary form.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0.hyphenated())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}
