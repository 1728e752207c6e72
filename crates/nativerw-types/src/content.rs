use std::io;

use bytes::Bytes;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use crate::error::TypeError;

/// The payload of a resource.
///
/// Which variant a resource carries is decided by its content type through
/// the codec registry in `nativerw-store`; this type only holds the data.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Decoded JSON (`application/json` and `application/*+json`).
    Json(Value),
    /// Opaque bytes (`application/octet-stream`).
    Binary(Bytes),
}

impl Content {
    /// JSON content.
    pub fn json(value: Value) -> Self {
        Self::Json(value)
    }

    /// Opaque binary content.
    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::Binary(bytes.into())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(b) => Some(b),
            Self::Json(_) => None,
        }
    }

    /// Short variant name, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Binary(_) => "binary",
        }
    }

    /// Canonical serialized form used for content hashing.
    ///
    /// JSON is rendered compactly with object keys in sorted order, and with
    /// `<`, `>`, `&`, U+2028 and U+2029 written as `\u` escapes. That is the
    /// byte form publishers compute their digests over, so a stored article
    /// with markup in its body still matches. Binary content is taken as-is.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TypeError> {
        match self {
            Self::Json(v) => {
                let mut out = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
                v.serialize(&mut ser)
                    .map_err(|e| TypeError::Serialization(e.to_string()))?;
                Ok(out)
            }
            Self::Binary(b) => Ok(b.to_vec()),
        }
    }
}

/// Compact formatter that escapes HTML-significant characters and the two
/// JavaScript line terminators inside strings and keys.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}
