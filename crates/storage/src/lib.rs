//! Content-addressed publication for easel.
//!
//! This crate provides:
//! - The `ContentStore` abstraction (publish a named blob with metadata,
//!   fetch by gateway address)
//! - `Publisher`, which turns images into content ids and back
//! - Backends: NFT.Storage with an IPFS gateway, and a local directory

pub mod backends;
pub mod error;
pub mod publisher;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, nft_storage::NftStorageBackend};
pub use error::{StorageError, StorageResult};
pub use publisher::Publisher;
pub use traits::{
    ByteStream, ContentStore, IPFS_SCHEME, METADATA_FILE, MetadataDocument, NamedBlob,
    PublishMetadata,
};

use easel_core::config::StorageConfig;
use std::sync::Arc;

/// Create a content store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ContentStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path, .. } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::NftStorage {
            api_url,
            token,
            gateway,
            ..
        } => {
            let backend = NftStorageBackend::new(api_url.clone(), token.clone(), gateway.clone())?;
            Ok(Arc::new(backend))
        }
    }
}

/// Create a publisher (and its store) from configuration.
pub async fn publisher_from_config(config: &StorageConfig) -> StorageResult<Publisher> {
    let store = from_config(config).await?;
    Ok(Publisher::new(store, config.description(), config.timeout()))
}
