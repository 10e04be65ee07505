//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use easel_core::ContentId;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Scheme prefix on references inside metadata documents.
pub const IPFS_SCHEME: &str = "ipfs://";

/// File name of the metadata document under its content id.
pub const METADATA_FILE: &str = "metadata.json";

/// A named file to publish.
#[derive(Clone, Debug)]
pub struct NamedBlob {
    pub name: String,
    pub content_type: &'static str,
    pub data: Bytes,
}

/// Descriptive fields published alongside a blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishMetadata {
    pub name: String,
    pub description: String,
}

/// The metadata document as stored: `{ name, description, image }`.
///
/// `image` is an `ipfs://<cid>/<name>` reference to the published blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl MetadataDocument {
    /// Gateway path of the image: the `image` reference without its scheme.
    pub fn image_path(&self) -> StorageResult<&str> {
        let path = self.image.strip_prefix(IPFS_SCHEME).unwrap_or(&self.image);
        if path.is_empty() {
            return Err(crate::StorageError::InvalidMetadata(
                "image reference is empty".to_string(),
            ));
        }
        Ok(path)
    }
}

/// A content-addressed store with a "publish" side and a gateway "read" side.
///
/// Addresses passed to `fetch` are `<cid>` or `<cid>/<path>`, the same form a
/// public gateway accepts after its base URL.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Publish `blob` together with a metadata document referencing it.
    ///
    /// Returns the content id of the metadata document's root, so that
    /// `<id>/metadata.json` is fetchable.
    async fn store(&self, blob: NamedBlob, metadata: PublishMetadata) -> StorageResult<ContentId>;

    /// Fetch a whole object by address.
    async fn fetch(&self, address: &str) -> StorageResult<Bytes>;

    /// Fetch an object by address as a stream.
    async fn fetch_stream(&self, address: &str) -> StorageResult<ByteStream>;

    /// Get the backend name for logging/metrics.
    fn backend_name(&self) -> &'static str;

    /// Check that the backend is reachable and usable.
    async fn health_check(&self) -> StorageResult<()>;
}
