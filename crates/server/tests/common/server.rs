//! Server test utilities.

use super::fakes::{FakeLedger, FakeSandbox};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use easel_core::config::{AppConfig, StorageConfig};
use easel_ledger::LedgerReader;
use easel_server::{AppState, InMemoryTokenCache, create_router};
use easel_storage::{ContentStore, FilesystemBackend, Publisher};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wired to fakes, with a filesystem content store.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub ledger: Arc<FakeLedger>,
    pub sandbox: Arc<FakeSandbox>,
    pub cache: Arc<InMemoryTokenCache>,
    pub store: Arc<dyn ContentStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// A server whose projects have a three-fragment program.
    pub async fn new() -> Self {
        Self::with_parts(FakeLedger::new(&["a;", "b;", "c;"]), FakeSandbox::new(), None).await
    }

    /// A server around the given fakes. `store` defaults to a fresh
    /// filesystem store in a temporary directory.
    pub async fn with_parts(
        ledger: FakeLedger,
        sandbox: FakeSandbox,
        store: Option<Arc<dyn ContentStore>>,
    ) -> Self {
        Self::with_config(ledger, sandbox, store, |_| {}).await
    }

    /// Like `with_parts`, with a hook to adjust the configuration first.
    pub async fn with_config(
        ledger: FakeLedger,
        sandbox: FakeSandbox,
        store: Option<Arc<dyn ContentStore>>,
        configure: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("content");

        let store = match store {
            Some(store) => store,
            None => Arc::new(
                FilesystemBackend::new(&storage_path)
                    .await
                    .expect("Failed to create storage backend"),
            ),
        };

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig::Filesystem {
            path: storage_path,
            timeout_secs: 5,
        };
        config.ledger.timeout_secs = 5;
        configure(&mut config);

        let ledger = Arc::new(ledger);
        let sandbox = Arc::new(sandbox);
        let cache = Arc::new(InMemoryTokenCache::new());

        let reader = LedgerReader::new(
            ledger.clone(),
            config.ledger.contract_address,
            config.ledger.timeout(),
        );
        let publisher = Publisher::new(
            store.clone(),
            config.storage.description(),
            Duration::from_secs(5),
        );

        let state = AppState::with_cache(config, cache.clone(), reader, sandbox.clone(), publisher);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            ledger,
            sandbox,
            cache,
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Issue a GET and collect the whole response.
    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    /// Issue a GET and parse the body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.get(uri).await;
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}
