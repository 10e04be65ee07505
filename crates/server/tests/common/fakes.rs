//! In-process stand-ins for the ledger node, the browser and the content store.

use async_trait::async_trait;
use bytes::Bytes;
use easel_core::{
    ContentId, ContractAddress, ProjectId, RasterImage, RenderDocument, Seed, TokenId,
};
use easel_ledger::{CallError, CallResult, LedgerClient, ProjectScriptInfo};
use easel_sandbox::{RenderOptions, Sandbox, SandboxError, SandboxResult};
use easel_storage::{
    ByteStream, ContentStore, NamedBlob, PublishMetadata, StorageError, StorageResult,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Ledger with a fixed program for every project and a call counter.
#[allow(dead_code)]
pub struct FakeLedger {
    pub fragments: Vec<String>,
    /// Fail the fragment read at this index.
    pub fail_at: Option<u64>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeLedger {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(fragments: &[&str], index: u64) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new(fragments)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Seed the fake ledger reports for every token.
#[allow(dead_code)]
pub fn fake_seed() -> Seed {
    Seed::from_bytes([0x5e; 32])
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn token_hash(&self, _: &ContractAddress, _: TokenId) -> CallResult<Seed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(fake_seed())
    }

    async fn project_script_info(
        &self,
        _: &ContractAddress,
        _: ProjectId,
    ) -> CallResult<ProjectScriptInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProjectScriptInfo {
            script_json: "{\"type\":\"p5js\"}".to_string(),
            script_count: self.fragments.len() as u64,
            use_hash_string: true,
            ipfs_hash: String::new(),
            locked: true,
            paused: false,
        })
    }

    async fn project_script_by_index(
        &self,
        _: &ContractAddress,
        _: ProjectId,
        index: u64,
    ) -> CallResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(index) {
            return Err(CallError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            });
        }
        Ok(self.fragments[index as usize].clone())
    }
}

/// Sandbox that "renders" by echoing a PNG signature followed by the page.
#[allow(dead_code)]
pub struct FakeSandbox {
    pub delay: Duration,
    pub fail: bool,
    pub renders: AtomicUsize,
    pub documents: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeSandbox {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: false,
            renders: AtomicUsize::new(0),
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn last_document(&self) -> Option<String> {
        self.documents.lock().unwrap().last().cloned()
    }
}

/// Image bytes `FakeSandbox` produces for a page.
#[allow(dead_code)]
pub fn fake_png(html: &str) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(html.as_bytes());
    data
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn render(
        &self,
        document: &RenderDocument,
        options: &RenderOptions,
    ) -> SandboxResult<RasterImage> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .push(document.html().to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(SandboxError::SelectorTimeout {
                selector: options.selector.clone(),
                waited: options.timeout,
            });
        }
        Ok(RasterImage::new(fake_png(document.html())))
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Store whose uploads always fail.
#[allow(dead_code)]
pub struct RejectingStore;

#[async_trait]
impl ContentStore for RejectingStore {
    async fn store(&self, _: NamedBlob, _: PublishMetadata) -> StorageResult<ContentId> {
        Err(StorageError::Status {
            operation: "store",
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    async fn fetch(&self, address: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(address.to_string()))
    }

    async fn fetch_stream(&self, address: &str) -> StorageResult<ByteStream> {
        Err(StorageError::NotFound(address.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "rejecting"
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
