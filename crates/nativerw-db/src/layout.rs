//! Mapping between [`Resource`] and the persisted [`Document`] layout.

use nativerw_store::{Binary, CodecRegistry, Document, Filter, IndexSpec, Value};
use nativerw_types::{Resource, ResourceId, Revision};

use crate::error::{DbError, DbResult};

pub const IDENTIFIER: &str = "identifier";
pub const CONTENT: &str = "content";
pub const CONTENT_TYPE: &str = "content-type";
pub const ORIGIN_SYSTEM_ID: &str = "origin-system-id";
pub const SCHEMA_VERSION: &str = "schema-version";
pub const CONTENT_REVISION: &str = "content-revision";

/// Name of the unique compound index on (`identifier`, `content-revision`).
pub const IDENTIFIER_REVISION_INDEX: &str = "identifier-revision-index";

/// Unique compound index over identifier and revision.
pub fn identifier_revision_index() -> IndexSpec {
    IndexSpec::unique(IDENTIFIER_REVISION_INDEX, &[IDENTIFIER, CONTENT_REVISION])
}

/// Stored form of an identifier: a UUID-subtype binary.
pub fn identifier_value(id: &ResourceId) -> Value {
    Value::Binary(Binary::uuid(id.as_bytes()))
}

/// Matches every revision of `id`.
pub fn id_filter(id: &ResourceId) -> Filter {
    Filter::new().eq(IDENTIFIER, identifier_value(id))
}

/// Matches exactly one `(id, revision)` key.
pub fn key_filter(id: &ResourceId, revision: Revision) -> Filter {
    id_filter(id).eq(CONTENT_REVISION, revision.value())
}

/// Encode `resource` as a stored document, content via its codec.
pub fn to_document(resource: &Resource, codecs: &CodecRegistry) -> DbResult<Document> {
    let codec = codecs.lookup(&resource.content_type)?;
    let content = codec.to_stored(&resource.content)?;
    Ok(Document::new()
        .with(IDENTIFIER, identifier_value(&resource.identifier))
        .with(CONTENT, content)
        .with(CONTENT_TYPE, resource.content_type.as_str())
        .with(ORIGIN_SYSTEM_ID, resource.origin_system_id.as_str())
        .with(SCHEMA_VERSION, resource.schema_version.as_str())
        .with(CONTENT_REVISION, resource.revision.value()))
}

/// Decode a stored document back into a [`Resource`].
pub fn from_document(mut document: Document, codecs: &CodecRegistry) -> DbResult<Resource> {
    let identifier = match document.remove(IDENTIFIER) {
        Some(value) => decode_identifier(value)?,
        None => return Err(missing(IDENTIFIER)),
    };
    let content_type = take_string(&mut document, CONTENT_TYPE)?.ok_or_else(|| missing(CONTENT_TYPE))?;
    let revision = match document.remove(CONTENT_REVISION) {
        Some(Value::Int64(v)) => Revision::new(v),
        Some(other) => return Err(wrong_type(CONTENT_REVISION, &other)),
        None => return Err(missing(CONTENT_REVISION)),
    };
    let stored = document.remove(CONTENT).ok_or_else(|| missing(CONTENT))?;
    let content = codecs
        .lookup(&content_type)
        .and_then(|codec| codec.from_stored(stored))
        .map_err(|e| DbError::Decode(format!("{identifier}@{revision}: {e}")))?;

    Ok(Resource {
        identifier,
        content,
        content_type,
        origin_system_id: take_string(&mut document, ORIGIN_SYSTEM_ID)?.unwrap_or_default(),
        schema_version: take_string(&mut document, SCHEMA_VERSION)?.unwrap_or_default(),
        revision,
    })
}

/// Decode a stored `identifier` value into a [`ResourceId`].
pub fn decode_identifier(value: Value) -> DbResult<ResourceId> {
    match value {
        Value::Binary(binary) => {
            ResourceId::from_bytes(&binary.bytes).map_err(|e| DbError::Decode(format!("{IDENTIFIER}: {e}")))
        }
        Value::String(s) => ResourceId::parse(&s).map_err(|e| DbError::Decode(format!("{IDENTIFIER}: {e}"))),
        other => Err(wrong_type(IDENTIFIER, &other)),
    }
}

pub fn decode_revision(value: &Value) -> DbResult<Revision> {
    value
        .as_i64()
        .map(Revision::new)
        .ok_or_else(|| wrong_type(CONTENT_REVISION, value))
}

fn take_string(document: &mut Document, field: &str) -> DbResult<Option<String>> {
    match document.remove(field) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(wrong_type(field, &other)),
    }
}

fn missing(field: &str) -> DbError {
    DbError::Decode(format!("missing field {field:?}"))
}

fn wrong_type(field: &str, value: &Value) -> DbError {
    DbError::Decode(format!("field {field:?} has unexpected type {}", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nativerw_types::Content;
    use serde_json::json;

    fn sample() -> Resource {
        Resource::new(
            ResourceId::parse("9694733e-163a-4393-801f-000ab7de5041").unwrap(),
            Content::json(json!({"a": 1})),
            "application/json",
            Revision::new(100),
        )
        .with_origin_system_id("methode")
        .with_schema_version("3")
    }

    #[test]
    fn document_layout_uses_persisted_field_names() {
        let doc = to_document(&sample(), &CodecRegistry::default()).unwrap();
        let names: Vec<&str> = doc.fields().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "content",
                "content-revision",
                "content-type",
                "identifier",
                "origin-system-id",
                "schema-version"
            ]
        );
        let id = doc.get(IDENTIFIER).unwrap().as_binary().unwrap();
        assert_eq!(id.subtype.code(), 0x04);
        assert_eq!(id.bytes.len(), 16);
    }

    #[test]
    fn document_maps_back_to_resource() {
        let codecs = CodecRegistry::default();
        let doc = to_document(&sample(), &codecs).unwrap();
        assert_eq!(from_document(doc, &codecs).unwrap(), sample());
    }

    #[test]
    fn missing_provenance_defaults_to_empty() {
        let codecs = CodecRegistry::default();
        let mut doc = to_document(&sample(), &codecs).unwrap();
        doc.remove(ORIGIN_SYSTEM_ID);
        doc.remove(SCHEMA_VERSION);
        let resource = from_document(doc, &codecs).unwrap();
        assert_eq!(resource.origin_system_id, "");
        assert_eq!(resource.schema_version, "");
    }

    #[test]
    fn unsupported_content_type_is_rejected_on_write() {
        let mut resource = sample();
        resource.content_type = "text/plain".into();
        let err = to_document(&resource, &CodecRegistry::default()).unwrap_err();
        assert!(matches!(err, DbError::Store(nativerw_store::StoreError::UnsupportedContentType(_))));
    }

    #[test]
    fn malformed_documents_fail_to_decode() {
        let codecs = CodecRegistry::default();

        let mut short_id = to_document(&sample(), &codecs).unwrap();
        short_id.insert(IDENTIFIER, Binary::generic(vec![1u8, 2, 3]));
        assert!(matches!(from_document(short_id, &codecs), Err(DbError::Decode(_))));

        let mut text_revision = to_document(&sample(), &codecs).unwrap();
        text_revision.insert(CONTENT_REVISION, "100");
        assert!(matches!(from_document(text_revision, &codecs), Err(DbError::Decode(_))));

        let mut no_content = to_document(&sample(), &codecs).unwrap();
        no_content.remove(CONTENT);
        assert!(matches!(from_document(no_content, &codecs), Err(DbError::Decode(_))));

        let mut bad_type = to_document(&sample(), &codecs).unwrap();
        bad_type.insert(CONTENT_TYPE, "text/plain");
        assert!(matches!(from_document(bad_type, &codecs), Err(DbError::Decode(_))));
    }

    #[test]
    fn identifiers_decode_from_binary_or_string() {
        let id = ResourceId::parse("9694733e-163a-4393-801f-000ab7de5041").unwrap();
        assert_eq!(decode_identifier(identifier_value(&id)).unwrap(), id);
        assert_eq!(decode_identifier(Value::from(id.to_string())).unwrap(), id);
        assert!(decode_identifier(Value::Int64(7)).is_err());
    }
}
