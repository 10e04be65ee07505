//! Request orchestration: cache lookup, then either resolve or the full
//! fetch-assemble-render-publish pipeline.
//!
//! ```text
//! START -> CACHE_LOOKUP -> CACHE_HIT_RESOLVE ----------------------------> RESPOND
//!                       \-> FETCH_PROGRAM -> RENDER -> PUBLISH -> CACHE_WRITE -> RESPOND
//! ```
//!
//! Any stage may end the request in FAILED. A failed miss writes nothing to
//! the cache, so the token stays eligible for a fresh attempt.

use crate::cache::TokenCache;
use crate::error::RenderError;
use crate::metrics;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use easel_core::{ProgramAssembler, RasterImage, TokenId};
use easel_ledger::LedgerReader;
use easel_sandbox::{RenderOptions, Sandbox, SandboxError};
use easel_storage::{ByteStream, Publisher};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Pipeline stages, used for logs and the stage duration histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStage {
    CacheLookup,
    CacheHitResolve,
    FetchProgram,
    Render,
    Publish,
    CacheWrite,
}

impl RenderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheLookup => "cache_lookup",
            Self::CacheHitResolve => "resolve",
            Self::FetchProgram => "fetch_program",
            Self::Render => "render",
            Self::Publish => "publish",
            Self::CacheWrite => "cache_write",
        }
    }
}

/// Image bytes for a response.
pub enum RenderedImage {
    /// Produced by this request's miss path (or a render it joined).
    Fresh(RasterImage),
    /// Streamed from the content store for a cached token.
    Cached(ByteStream),
}

type RenderResult = Result<RasterImage, Arc<RenderError>>;
type InFlight = Shared<BoxFuture<'static, RenderResult>>;

/// The stateless parts of the miss path.
struct Pipeline {
    cache: Arc<dyn TokenCache>,
    ledger: LedgerReader,
    assembler: ProgramAssembler,
    sandbox: Arc<dyn Sandbox>,
    render_options: RenderOptions,
    publisher: Publisher,
}

async fn timed<T>(token: TokenId, stage: RenderStage, fut: impl Future<Output = T>) -> T {
    tracing::debug!(token_id = %token, stage = stage.as_str(), "Stage started");
    let started = Instant::now();
    let output = fut.await;
    metrics::observe_stage(stage.as_str(), started.elapsed().as_secs_f64());
    output
}

impl Pipeline {
    async fn run_miss(&self, token: TokenId) -> Result<RasterImage, RenderError> {
        let program = timed(
            token,
            RenderStage::FetchProgram,
            self.ledger.fetch_program(token),
        )
        .await?;

        let document = self
            .assembler
            .assemble(&program.seed, token, &program.source);

        let deadline = self.render_options.deadline;
        let image = timed(
            token,
            RenderStage::Render,
            tokio::time::timeout(
                deadline,
                self.sandbox.render(&document, &self.render_options),
            ),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SandboxError::Timeout {
                stage: "render",
                after: deadline,
            })
        })
        .map_err(|source| RenderError::Render { token, source })?;

        let cid = timed(
            token,
            RenderStage::Publish,
            self.publisher.publish(&image, &token.to_string()),
        )
        .await
        .map_err(|source| RenderError::Publish { token, source })?;

        timed(
            token,
            RenderStage::CacheWrite,
            self.cache.put(token, cid.clone()),
        )
        .await;

        tracing::info!(
            token_id = %token,
            cid = %cid,
            bytes = image.len(),
            fragments = program.source.len(),
            "Token rendered and published"
        );
        Ok(image)
    }
}

/// Drives render requests through the pipeline.
///
/// Concurrent misses for one token share a single in-flight render; every
/// waiter receives its result. The in-flight entry is removed as soon as the
/// render settles, so failures are never remembered.
#[derive(Clone)]
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    in_flight: Arc<DashMap<TokenId, InFlight>>,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<dyn TokenCache>,
        ledger: LedgerReader,
        assembler: ProgramAssembler,
        sandbox: Arc<dyn Sandbox>,
        render_options: RenderOptions,
        publisher: Publisher,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                cache,
                ledger,
                assembler,
                sandbox,
                render_options,
                publisher,
            }),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// The token cache this orchestrator reads and writes.
    pub fn cache(&self) -> &Arc<dyn TokenCache> {
        &self.pipeline.cache
    }

    /// Number of tokens currently being rendered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Serve one render request.
    pub async fn handle(&self, token: TokenId) -> Result<RenderedImage, Arc<RenderError>> {
        let cached = timed(
            token,
            RenderStage::CacheLookup,
            self.pipeline.cache.get(token),
        )
        .await;

        if let Some(cid) = cached {
            metrics::CACHE_HITS.inc();
            let stream = timed(
                token,
                RenderStage::CacheHitResolve,
                self.pipeline.publisher.resolve(&cid),
            )
            .await
            .map_err(|source| {
                let err = RenderError::Resolve { token, cid, source };
                record_failure(&err);
                Arc::new(err)
            })?;
            tracing::debug!(token_id = %token, "Serving cached image");
            return Ok(RenderedImage::Cached(stream));
        }

        metrics::CACHE_MISSES.inc();
        self.render_shared(token).await.map(RenderedImage::Fresh)
    }

    /// Join the in-flight render for `token`, starting one if none exists.
    async fn render_shared(&self, token: TokenId) -> RenderResult {
        let shared = match self.in_flight.entry(token) {
            Entry::Occupied(entry) => {
                metrics::SINGLE_FLIGHT_JOINS.inc();
                tracing::debug!(token_id = %token, "Joining in-flight render");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let shared = self.spawn_render(token);
                entry.insert(shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Run the miss path on its own task so it completes (and releases the
    /// browser) even if every requester goes away.
    fn spawn_render(&self, token: TokenId) -> InFlight {
        let pipeline = self.pipeline.clone();
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            token,
        };

        metrics::RENDERS_IN_FLIGHT.inc();
        let task = tokio::spawn(async move {
            let _guard = guard;
            pipeline.run_miss(token).await
        });

        async move {
            let result = match task.await {
                Ok(result) => result,
                Err(join_err) => Err(RenderError::Aborted {
                    token,
                    reason: join_err.to_string(),
                }),
            };
            result.map_err(|err| {
                record_failure(&err);
                Arc::new(err)
            })
        }
        .boxed()
        .shared()
    }
}

/// Clears a token's in-flight entry when its render task ends, including by
/// panic.
struct InFlightGuard {
    in_flight: Arc<DashMap<TokenId, InFlight>>,
    token: TokenId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.token);
        metrics::RENDERS_IN_FLIGHT.dec();
    }
}

fn record_failure(err: &RenderError) {
    metrics::record_failure(err.kind());
    tracing::warn!(
        token_id = %err.token(),
        kind = err.kind(),
        timeout = err.is_timeout(),
        error = %err,
        "Render request failed"
    );
}
