//! Token cache: which tokens already have a published image.

use async_trait::async_trait;
use dashmap::DashMap;
use easel_core::{ContentId, TokenId};

/// Maps tokens to the content id of their published image.
///
/// An entry is written only after a successful publish and is valid for the
/// life of the process, since a token's seed and program never change.
#[async_trait]
pub trait TokenCache: Send + Sync + 'static {
    async fn get(&self, token: TokenId) -> Option<ContentId>;

    /// Record a mapping. Writing the same pair twice is a no-op; racing
    /// writers for one token resolve last-write-wins.
    async fn put(&self, token: TokenId, id: ContentId);

    async fn len(&self) -> usize;
}

/// Process-local, unbounded cache backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryTokenCache {
    entries: DashMap<TokenId, ContentId>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, token: TokenId) -> Option<ContentId> {
        self.entries.get(&token).map(|entry| entry.value().clone())
    }

    async fn put(&self, token: TokenId, id: ContentId) {
        if self.entries.insert(token, id).is_none() {
            crate::metrics::CACHE_ENTRIES.inc();
        }
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }
}
