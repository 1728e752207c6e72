use tracing::{debug, warn};

use nativerw_crypto::{ContentDigest, NativeHasher};
use nativerw_types::Content;

use crate::connection::Connection;
use crate::error::DbResult;

/// SHA-224 of `payload`, lowercase hex.
pub fn compute_hash(payload: &[u8]) -> String {
    NativeHasher::hash_hex(payload)
}

/// SHA-224 of `content` in canonical form, lowercase hex. This is the digest
/// [`Deduper::check_against_stored`] compares against.
pub fn compute_content_hash(content: &Content) -> DbResult<String> {
    Ok(NativeHasher::hash_content(content)?.to_hex())
}

/// Detects writes that would store the same content as the latest revision.
#[derive(Clone, Debug)]
pub struct Deduper {
    connection: Connection,
}

impl Deduper {
    /// Compare against whatever `connection` reads.
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Whether the latest stored revision of `id` hashes to `digest`.
    ///
    /// `false` when nothing is stored or when `digest` is not a valid hex
    /// SHA-224. Surrounding whitespace and hex case are ignored.
    pub async fn check_against_stored(&self, collection: &str, id: &str, digest: &str) -> DbResult<bool> {
        let Some(stored) = self.connection.read(collection, id).await? else {
            warn!(collection, identifier = id, "no original content stored to compare against");
            return Ok(false);
        };
        let Ok(expected) = ContentDigest::from_hex(digest) else {
            debug!(collection, identifier = id, digest, "supplied digest is not valid hex");
            return Ok(false);
        };
        let actual = NativeHasher::hash_content(&stored.content)?;
        let same = actual == expected;
        debug!(
            collection,
            identifier = id,
            revision = %stored.revision,
            same,
            "compared content digest"
        );
        Ok(same)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nativerw_store::InMemoryBackend;
    use nativerw_types::{CollectionSet, Resource, ResourceId, Revision};
    use serde_json::json;

    use crate::config::ConnectionSettings;
    use crate::error::DbError;

    const UC: &str = "universal-content";
    const ID: &str = "9694733e-163a-4393-801f-000ab7de5041";

    fn deduper() -> (Connection, Deduper) {
        let conn = Connection::new(
            Arc::new(InMemoryBackend::new()),
            CollectionSet::new([UC]),
            ConnectionSettings::default(),
        );
        (conn.clone(), Deduper::new(conn))
    }

    async fn store(conn: &Connection, rev: i64, content: Content) {
        let content_type = match content {
            Content::Json(_) => "application/json",
            Content::Binary(_) => "application/octet-stream",
        };
        let resource = Resource::new(ResourceId::parse(ID).unwrap(), content, content_type, Revision::new(rev));
        conn.write(UC, &resource).await.unwrap();
    }

    #[test]
    fn compute_hash_is_sha224_hex() {
        let h = compute_hash(b"abc");
        assert_eq!(h, "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7");
        assert_eq!(compute_hash(b"").len(), 56);
    }

    #[tokio::test]
    async fn unknown_resource_is_not_a_duplicate() {
        let (_, d) = deduper();
        let digest = compute_hash(b"anything");
        assert!(!d.check_against_stored(UC, ID, &digest).await.unwrap());
    }

    #[tokio::test]
    async fn matching_digest_is_a_duplicate() {
        let (conn, d) = deduper();
        let content = Content::json(json!({"foo": ["a", "b"], "bar": 10.4}));
        store(&conn, 1, content.clone()).await;

        let digest = compute_content_hash(&content).unwrap();
        assert!(d.check_against_stored(UC, ID, &digest).await.unwrap());
        assert!(d
            .check_against_stored(UC, ID, &format!("  {}\n", digest.to_uppercase()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn key_order_does_not_matter() {
        let (conn, d) = deduper();
        store(&conn, 1, Content::json(json!({"b": 2, "a": 1}))).await;
        let digest = compute_hash(br#"{"a":1,"b":2}"#);
        assert!(d.check_against_stored(UC, ID, &digest).await.unwrap());
    }

    #[tokio::test]
    async fn markup_is_hashed_in_escaped_form() {
        let (conn, d) = deduper();
        store(&conn, 1, Content::json(json!({"body": "<p>a & b</p>"}))).await;

        let escaped = compute_hash(br#"{"body":"\u003cp\u003ea \u0026 b\u003c/p\u003e"}"#);
        assert!(d.check_against_stored(UC, ID, &escaped).await.unwrap());

        let raw = compute_hash(br#"{"body":"<p>a & b</p>"}"#);
        assert!(!d.check_against_stored(UC, ID, &raw).await.unwrap());
    }

    #[tokio::test]
    async fn only_the_latest_revision_counts() {
        let (conn, d) = deduper();
        let old = Content::json(json!({"v": 1}));
        store(&conn, 1, old.clone()).await;
        store(&conn, 2, Content::json(json!({"v": 2}))).await;
        let digest = compute_content_hash(&old).unwrap();
        assert!(!d.check_against_stored(UC, ID, &digest).await.unwrap());
    }

    #[tokio::test]
    async fn binary_content_hashes_raw_bytes() {
        let (conn, d) = deduper();
        store(&conn, 1, Content::binary(&b"\x00\x01raw"[..])).await;
        assert!(d.check_against_stored(UC, ID, &compute_hash(b"\x00\x01raw")).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_digest_never_matches() {
        let (conn, d) = deduper();
        store(&conn, 1, Content::json(json!({}))).await;
        assert!(!d.check_against_stored(UC, ID, "not-hex").await.unwrap());
        assert!(!d.check_against_stored(UC, ID, "abcd").await.unwrap());
    }

    #[tokio::test]
    async fn validation_errors_propagate() {
        let (_, d) = deduper();
        assert!(matches!(
            d.check_against_stored("video", ID, "00").await,
            Err(DbError::UnsupportedCollection(_))
        ));
        assert!(matches!(
            d.check_against_stored(UC, "nope", "00").await,
            Err(DbError::Type(_))
        ));
    }
}
