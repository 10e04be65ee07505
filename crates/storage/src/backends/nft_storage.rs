//! NFT.Storage uploads with reads through an IPFS HTTP gateway.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ContentStore, NamedBlob, PublishMetadata};
use async_trait::async_trait;
use bytes::Bytes;
use easel_core::ContentId;
use easel_core::config::Secret;
use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Form field carrying the blob. The `meta` document's `image` key is left
/// null and the service fills it with the uploaded file's `ipfs://` URL.
const IMAGE_FIELD: &str = "image";

/// Longest error body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct StoreResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<StoreValue>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct StoreValue {
    ipnft: String,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// NFT.Storage backed content store.
pub struct NftStorageBackend {
    client: reqwest::Client,
    api_url: String,
    token: Secret,
    gateway: String,
}

impl NftStorageBackend {
    pub fn new(
        api_url: impl Into<String>,
        token: Secret,
        gateway: impl Into<String>,
    ) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("easel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            gateway: gateway.into().trim_end_matches('/').to_string(),
        })
    }

    fn gateway_url(&self, address: &str) -> StorageResult<String> {
        if address.is_empty() || address.starts_with('/') || address.split('/').any(|s| s == "..")
        {
            return Err(StorageError::InvalidKey(format!(
                "not a gateway address: {address:?}"
            )));
        }
        Ok(format!("{}/{address}", self.gateway))
    }

    async fn gateway_get(&self, address: &str) -> StorageResult<reqwest::Response> {
        let url = self.gateway_url(address)?;
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(address.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::Status {
                operation: "gateway fetch",
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        Ok(response)
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[async_trait]
impl ContentStore for NftStorageBackend {
    #[instrument(skip(self, blob, metadata), fields(backend = "nftstorage", name = %blob.name, size = blob.data.len()))]
    async fn store(&self, blob: NamedBlob, metadata: PublishMetadata) -> StorageResult<ContentId> {
        let meta = json!({
            "name": metadata.name,
            "description": metadata.description,
            "image": null,
        });
        let file = Part::bytes(blob.data.to_vec())
            .file_name(blob.name)
            .mime_str(blob.content_type)?;
        let form = Form::new()
            .text("meta", meta.to_string())
            .part(IMAGE_FIELD, file);

        let response = self
            .client
            .post(format!("{}/store", self.api_url))
            .bearer_auth(self.token.expose())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                operation: "upload",
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body = response.bytes().await?;
        let parsed: StoreResponse = serde_json::from_slice(&body)
            .map_err(|e| StorageError::UnexpectedResponse(format!("upload response: {e}")))?;

        match parsed {
            StoreResponse {
                ok: true,
                value: Some(value),
                ..
            } => ContentId::new(value.ipnft)
                .map_err(|e| StorageError::UnexpectedResponse(e.to_string())),
            StoreResponse { error, .. } => {
                let detail = error
                    .map(|e| {
                        format!(
                            "{}: {}",
                            e.name.unwrap_or_else(|| "Error".to_string()),
                            e.message.unwrap_or_default()
                        )
                    })
                    .unwrap_or_else(|| "response carries no content id".to_string());
                Err(StorageError::UnexpectedResponse(detail))
            }
        }
    }

    #[instrument(skip(self), fields(backend = "nftstorage"))]
    async fn fetch(&self, address: &str) -> StorageResult<Bytes> {
        let response = self.gateway_get(address).await?;
        Ok(response.bytes().await?)
    }

    #[instrument(skip(self), fields(backend = "nftstorage"))]
    async fn fetch_stream(&self, address: &str) -> StorageResult<ByteStream> {
        let response = self.gateway_get(address).await?;
        Ok(Box::pin(response.bytes_stream().map_err(StorageError::from)))
    }

    fn backend_name(&self) -> &'static str {
        "nftstorage"
    }

    #[instrument(skip(self), fields(backend = "nftstorage"))]
    async fn health_check(&self) -> StorageResult<()> {
        // Only checks that the upload API answers and accepts the token.
        let response = self
            .client
            .get(format!("{}/", self.api_url))
            .bearer_auth(self.token.expose())
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(StorageError::Config(format!(
                "upload API rejected the storage token (HTTP {})",
                status.as_u16()
            )));
        }
        if status.is_server_error() {
            return Err(StorageError::Status {
                operation: "health check",
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        Ok(())
    }
}
