//! Content-type driven encode/decode strategies.
//!
//! A [`ContentCodec`] knows how to turn a request body into [`Content`], how
//! to write [`Content`] back out, and how to lay it into a stored [`Value`].
//! [`CodecRegistry`] picks the codec for a `Content-Type` by its essence,
//! falling back to the structured syntax suffix (`application/*+json`).

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use nativerw_types::{Content, MediaType};

use crate::document::{Binary, Value};
use crate::error::{StoreError, StoreResult};

/// Encode/decode strategy for one family of content types.
pub trait ContentCodec: Send + Sync {
    /// Short name, for logs.
    fn name(&self) -> &'static str;

    /// Parse a raw request body.
    fn decode_body(&self, body: &[u8]) -> StoreResult<Content>;

    /// Write `content` as a response body.
    fn encode_body(&self, content: &Content, out: &mut dyn io::Write) -> StoreResult<()>;

    /// The value persisted under the `content` field.
    fn to_stored(&self, content: &Content) -> StoreResult<Value>;

    /// Rebuild content from the persisted `content` field.
    fn from_stored(&self, value: Value) -> StoreResult<Content>;
}

fn mismatch(codec: &str, content: &Content) -> StoreError {
    StoreError::InvalidContent {
        content_type: codec.to_string(),
        reason: format!("{} content cannot be handled by the {codec} codec", content.kind()),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// `application/json` and `application/*+json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl ContentCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode_body(&self, body: &[u8]) -> StoreResult<Content> {
        serde_json::from_slice(body)
            .map(Content::Json)
            .map_err(|e| StoreError::InvalidContent {
                content_type: MediaType::JSON.to_string(),
                reason: e.to_string(),
            })
    }

    fn encode_body(&self, content: &Content, out: &mut dyn io::Write) -> StoreResult<()> {
        let json = content.as_json().ok_or_else(|| mismatch(self.name(), content))?;
        serde_json::to_writer(&mut *out, json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn to_stored(&self, content: &Content) -> StoreResult<Value> {
        content
            .as_json()
            .map(|json| Value::Json(json.clone()))
            .ok_or_else(|| mismatch(self.name(), content))
    }

    fn from_stored(&self, value: Value) -> StoreResult<Content> {
        let json = match value {
            Value::Json(json) => json,
            Value::String(s) => serde_json::Value::String(s),
            Value::Int64(i) => serde_json::Value::from(i),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Null => serde_json::Value::Null,
            Value::Binary(_) => {
                return Err(StoreError::CorruptDocument(
                    "binary value stored under a JSON content type".into(),
                ))
            }
        };
        Ok(Content::Json(json))
    }
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

/// `application/octet-stream`: bytes in, bytes out.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCodec;

impl ContentCodec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn decode_body(&self, body: &[u8]) -> StoreResult<Content> {
        Ok(Content::binary(body.to_vec()))
    }

    fn encode_body(&self, content: &Content, out: &mut dyn io::Write) -> StoreResult<()> {
        let bytes = content.as_bytes().ok_or_else(|| mismatch(self.name(), content))?;
        out.write_all(bytes)?;
        Ok(())
    }

    fn to_stored(&self, content: &Content) -> StoreResult<Value> {
        content
            .as_bytes()
            .map(|bytes| Value::Binary(Binary::generic(bytes.to_vec())))
            .ok_or_else(|| mismatch(self.name(), content))
    }

    fn from_stored(&self, value: Value) -> StoreResult<Content> {
        match value {
            Value::Binary(binary) => Ok(Content::binary(binary.bytes)),
            other => Err(StoreError::CorruptDocument(format!(
                "expected binary content, found {}",
                other.type_name()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Content type → codec.
///
/// Lookups ignore directives (`; charset=...`) and case. An exact essence
/// match wins; otherwise `application/<anything>+<suffix>` resolves through
/// the suffix table.
#[derive(Clone)]
pub struct CodecRegistry {
    exact: HashMap<String, Arc<dyn ContentCodec>>,
    suffixes: HashMap<String, Arc<dyn ContentCodec>>,
}

impl CodecRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            exact: HashMap::new(),
            suffixes: HashMap::new(),
        }
    }

    /// Register `codec` for an exact essence such as `application/json`.
    pub fn register(&mut self, essence: &str, codec: Arc<dyn ContentCodec>) -> &mut Self {
        self.exact.insert(essence.trim().to_ascii_lowercase(), codec);
        self
    }

    /// Register `codec` for every `application/*+<suffix>` type.
    pub fn register_suffix(&mut self, suffix: &str, codec: Arc<dyn ContentCodec>) -> &mut Self {
        self.suffixes.insert(suffix.trim().to_ascii_lowercase(), codec);
        self
    }

    /// The codec for `content_type`, or `StoreError::UnsupportedContentType`.
    pub fn lookup(&self, content_type: &str) -> StoreResult<Arc<dyn ContentCodec>> {
        let unsupported = || StoreError::UnsupportedContentType(content_type.to_string());
        let media = MediaType::parse(content_type).map_err(|_| unsupported())?;

        if let Some(codec) = self.exact.get(media.essence()) {
            return Ok(Arc::clone(codec));
        }
        if media.top_level() == "application" {
            if let Some(codec) = media.suffix().and_then(|s| self.suffixes.get(s)) {
                return Ok(Arc::clone(codec));
            }
        }
        Err(unsupported())
    }

    /// Returns `true` if [`lookup`](Self::lookup) would succeed.
    pub fn supports(&self, content_type: &str) -> bool {
        self.lookup(content_type).is_ok()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let json: Arc<dyn ContentCodec> = Arc::new(JsonCodec);
        let mut registry = Self::empty();
        registry
            .register(MediaType::JSON, Arc::clone(&json))
            .register_suffix("json", json)
            .register(MediaType::OCTET_STREAM, Arc::new(BinaryCodec));
        registry
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<&str> = self.exact.keys().map(String::as_str).collect();
        let mut suffixes: Vec<&str> = self.suffixes.keys().map(String::as_str).collect();
        exact.sort_unstable();
        suffixes.sort_unstable();
        f.debug_struct("CodecRegistry")
            .field("exact", &exact)
            .field("suffixes", &suffixes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_registry_resolves_json_variants() {
        let registry = CodecRegistry::default();
        for ct in [
            "application/json",
            "Application/JSON",
            "application/json; charset=utf-8",
            "application/vnd.ft-upp-article+json",
            "application/ld+json;version=1.0",
        ] {
            assert_eq!(registry.lookup(ct).unwrap().name(), "json", "{ct}");
        }
    }

    #[test]
    fn default_registry_resolves_octet_stream() {
        let registry = CodecRegistry::default();
        assert_eq!(registry.lookup("application/octet-stream").unwrap().name(), "binary");
    }

    #[test]
    fn unknown_types_are_unsupported() {
        let registry = CodecRegistry::default();
        for ct in ["text/plain", "text/x+json", "application/xml", "", "garbage"] {
            let err = registry.lookup(ct).err().unwrap();
            assert!(matches!(err, StoreError::UnsupportedContentType(ref s) if s == ct), "{ct}");
        }
    }

    #[test]
    fn empty_registry_supports_nothing() {
        assert!(!CodecRegistry::empty().supports("application/json"));
    }

    #[test]
    fn json_codec_round_trips_body() {
        let codec = JsonCodec;
        let content = codec.decode_body(br#"{"foo":["a","b"],"bar":10.4}"#).unwrap();
        assert_eq!(content, Content::json(json!({"foo": ["a", "b"], "bar": 10.4})));

        let mut out = Vec::new();
        codec.encode_body(&content, &mut out).unwrap();
        assert_eq!(out, b"{\"bar\":10.4,\"foo\":[\"a\",\"b\"]}\n");
    }

    #[test]
    fn json_codec_rejects_malformed_body() {
        let err = JsonCodec.decode_body(b"{not json").unwrap_err();
        assert!(matches!(err, StoreError::InvalidContent { .. }));
    }

    #[test]
    fn json_codec_reads_scalar_stored_values() {
        let content = JsonCodec.from_stored(Value::from("plain")).unwrap();
        assert_eq!(content, Content::json(json!("plain")));
        assert!(JsonCodec.from_stored(Value::Binary(Binary::generic(vec![1u8]))).is_err());
    }

    #[test]
    fn binary_codec_keeps_bytes() {
        let codec = BinaryCodec;
        let content = codec.decode_body(b"\x00\xffraw").unwrap();
        let stored = codec.to_stored(&content).unwrap();
        assert_eq!(stored, Value::Binary(Binary::generic(b"\x00\xffraw".to_vec())));
        assert_eq!(codec.from_stored(stored).unwrap(), content);

        let mut out = Vec::new();
        codec.encode_body(&content, &mut out).unwrap();
        assert_eq!(out, b"\x00\xffraw");
    }

    #[test]
    fn codecs_reject_the_other_variant() {
        assert!(JsonCodec.to_stored(&Content::binary(vec![1u8])).is_err());
        assert!(BinaryCodec.to_stored(&Content::json(json!(1))).is_err());
        assert!(BinaryCodec.from_stored(Value::from(3i64)).is_err());
    }
}
