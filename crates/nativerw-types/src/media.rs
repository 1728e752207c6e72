//! `Content-Type` parsing.
//!
//! Only the essence (`type/subtype`) drives codec selection; directives such
//! as `; charset=utf-8` are kept verbatim for display but otherwise ignored.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// A parsed media type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaType {
    essence: String,
    raw: String,
}

impl MediaType {
    pub const JSON: &'static str = "application/json";
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Parse a content type, dropping `;` directives and lowercasing.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        let Some((top, sub)) = essence.split_once('/') else {
            return Err(TypeError::InvalidMediaType(raw.to_string()));
        };
        if top.is_empty() || sub.is_empty() || sub.contains('/') {
            return Err(TypeError::InvalidMediaType(raw.to_string()));
        }
        Ok(Self {
            essence,
            raw: raw.trim().to_string(),
        })
    }

    /// `type/subtype`, lowercased, without directives.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// The original string as supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn top_level(&self) -> &str {
        self.essence.split_once('/').map(|(t, _)| t).unwrap_or_default()
    }

    pub fn subtype(&self) -> &str {
        self.essence.split_once('/').map(|(_, s)| s).unwrap_or_default()
    }

    /// Structured syntax suffix, e.g. `json` for `application/vnd.ft+json`.
    pub fn suffix(&self) -> Option<&str> {
        self.subtype().rsplit_once('+').map(|(_, s)| s)
    }

    /// `application/json` or any `application/*+json` variant.
    pub fn is_json(&self) -> bool {
        self.essence == Self::JSON || (self.top_level() == "application" && self.suffix() == Some("json"))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for MediaType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
