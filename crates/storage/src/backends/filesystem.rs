//! Local content-addressed directory.
//!
//! Mirrors the gateway layout so the read path is identical to the remote
//! store: a blob lives at `<sha256(blob)>/<name>` and its metadata document
//! at `<sha256(document)>/metadata.json`, with `image` set to
//! `ipfs://<sha256(blob)>/<name>`.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    ByteStream, ContentStore, IPFS_SCHEME, METADATA_FILE, MetadataDocument, NamedBlob,
    PublishMetadata,
};
use async_trait::async_trait;
use bytes::Bytes;
use easel_core::{ContentHash, ContentId};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Default chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem content store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an address to a path, refusing anything that escapes the root.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    fn key_path_sync(root: &Path, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!("not a relative address: {key:?}")));
        }
        if !Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "contains unsafe path component: {key}"
            )));
        }

        let path = root.join(key);
        let root_canonical = root.canonicalize()?;

        // The nearest existing ancestor (or the path itself) must resolve
        // inside the root, so symlinks cannot redirect reads or writes.
        let mut probe = Some(path.as_path());
        while let Some(candidate) = probe {
            match std::fs::symlink_metadata(candidate) {
                Ok(_) => {
                    let canonical = candidate.canonicalize().map_err(|_| {
                        StorageError::InvalidKey(format!("dangling symlink in address: {key}"))
                    })?;
                    if !canonical.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "address escapes storage root: {key}"
                        )));
                    }
                    return Ok(path);
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    probe = candidate.parent();
                }
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
        Ok(path)
    }

    /// Write `data` under `key` via a uniquely named temp file and rename.
    async fn write_atomic(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_file_name(format!(
            "{}.tmp.{}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4()
        ));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn open(&self, address: &str) -> StorageResult<fs::File> {
        let path = self.key_path(address).await?;
        fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(address.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name == METADATA_FILE
    {
        return Err(StorageError::InvalidKey(format!("invalid blob name: {name:?}")));
    }
    Ok(())
}

#[async_trait]
impl ContentStore for FilesystemBackend {
    #[instrument(skip(self, blob, metadata), fields(backend = "filesystem", name = %blob.name, size = blob.data.len()))]
    async fn store(&self, blob: NamedBlob, metadata: PublishMetadata) -> StorageResult<ContentId> {
        validate_name(&blob.name)?;

        let blob_root = ContentHash::compute(&blob.data).to_hex();
        let blob_address = format!("{blob_root}/{}", blob.name);
        self.write_atomic(&blob_address, &blob.data).await?;

        let document = MetadataDocument {
            name: metadata.name,
            description: metadata.description,
            image: format!("{IPFS_SCHEME}{blob_address}"),
        };
        let encoded = serde_json::to_vec(&document)
            .map_err(|e| StorageError::InvalidMetadata(e.to_string()))?;
        let document_root = ContentHash::compute(&encoded).to_hex();
        self.write_atomic(&format!("{document_root}/{METADATA_FILE}"), &encoded)
            .await?;

        ContentId::new(document_root).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn fetch(&self, address: &str) -> StorageResult<Bytes> {
        use tokio::io::AsyncReadExt;

        let mut file = self.open(address).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn fetch_stream(&self, address: &str) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let file = self.open(address).await?;
        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }
        Ok(())
    }
}
