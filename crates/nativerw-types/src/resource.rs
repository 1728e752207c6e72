use crate::content::Content;
use crate::identifier::ResourceId;
use crate::revision::Revision;

/// A native resource: one revision of one identifier's content.
///
/// `(identifier, revision)` is the storage key. Provenance fields default to
/// the empty string when the publisher did not supply them.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub identifier: ResourceId,
    pub content: Content,
    pub content_type: String,
    pub origin_system_id: String,
    pub schema_version: String,
    pub revision: Revision,
}

impl Resource {
    /// Wrap content for storage with empty provenance metadata.
    pub fn new(
        identifier: ResourceId,
        content: Content,
        content_type: impl Into<String>,
        revision: Revision,
    ) -> Self {
        Self {
            identifier,
            content,
            content_type: content_type.into(),
            origin_system_id: String::new(),
            schema_version: String::new(),
            revision,
        }
    }

    /// Set the originating system.
    pub fn with_origin_system_id(mut self, origin_system_id: impl Into<String>) -> Self {
        self.origin_system_id = origin_system_id.into();
        self
    }

    pub fn with_schema_version(mut self, schema_version: impl Into<String>) -> Self {
        self.schema_version = schema_version.into();
        self
    }
}
