//! Publishing rendered images and resolving published ids back to bytes.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    ByteStream, ContentStore, METADATA_FILE, MetadataDocument, NamedBlob, PublishMetadata,
};
use easel_core::{ContentId, RasterImage};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use futures::StreamExt;
use tracing::instrument;

const IMAGE_FETCH: &str = "image fetch";

/// Publishes images to a content store and resolves them through its gateway.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ContentStore>,
    description: String,
    timeout: Duration,
}

impl Publisher {
    pub fn new(store: Arc<dyn ContentStore>, description: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            description: description.into(),
            timeout,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Upload `image` as a blob named `display_name` with its metadata document.
    #[instrument(skip(self, image), fields(backend = self.store.backend_name(), size = image.len()))]
    pub async fn publish(&self, image: &RasterImage, display_name: &str) -> StorageResult<ContentId> {
        let blob = NamedBlob {
            name: display_name.to_string(),
            content_type: image.content_type(),
            data: image.bytes().clone(),
        };
        let metadata = PublishMetadata {
            name: display_name.to_string(),
            description: self.description.clone(),
        };
        self.bounded("publish", self.store.store(blob, metadata))
            .await
    }

    /// Resolve a published id to the image bytes.
    ///
    /// Two hops: `<id>/metadata.json`, then the document's `image` reference
    /// with the `ipfs://` scheme removed. The returned stream fails with
    /// `Timeout` if any chunk takes longer than the storage timeout.
    #[instrument(skip(self), fields(backend = self.store.backend_name(), cid = %id))]
    pub async fn resolve(&self, id: &ContentId) -> StorageResult<ByteStream> {
        let raw = self
            .bounded(
                "metadata fetch",
                self.store.fetch(&format!("{id}/{METADATA_FILE}")),
            )
            .await?;
        let document: MetadataDocument = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::InvalidMetadata(format!("{id}: {e}")))?;
        let image_path = document.image_path()?;

        tracing::debug!(image = image_path, "Resolved metadata document");
        let body = self
            .bounded(IMAGE_FETCH, self.store.fetch_stream(image_path))
            .await?;
        Ok(bounded_body(body, self.timeout))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout {
                operation,
                after: self.timeout,
            })?
    }
}

/// Bound the wait for each chunk of `body`. A stall ends the stream with a
/// single `Timeout` error.
fn bounded_body(mut body: ByteStream, after: Duration) -> ByteStream {
    Box::pin(async_stream::stream! {
        loop {
            match tokio::time::timeout(after, body.next()).await {
                Ok(Some(chunk)) => yield chunk,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(timeout = ?after, "Image body stalled");
                    yield Err(StorageError::Timeout {
                        operation: IMAGE_FETCH,
                        after,
                    });
                    break;
                }
            }
        }
    })
}
