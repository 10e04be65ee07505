//! Chromium-backed sandbox driven over the DevTools protocol.

use crate::error::{SandboxError, SandboxResult};
use crate::{RenderOptions, Sandbox};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use easel_core::config::RenderConfig;
use easel_core::{RasterImage, RenderDocument};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches one headless Chromium per render.
///
/// Each browser gets its own throwaway profile directory. Concurrent browsers
/// are capped by a semaphore.
pub struct ChromiumSandbox {
    executable: Option<PathBuf>,
    no_sandbox: bool,
    permits: Arc<Semaphore>,
}

impl ChromiumSandbox {
    pub fn new(executable: Option<PathBuf>, no_sandbox: bool, max_concurrent: usize) -> Self {
        Self {
            executable,
            no_sandbox,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.chrome_executable.clone(),
            config.no_sandbox,
            config.max_concurrent,
        )
    }

    fn browser_config(&self, options: &RenderOptions, profile: &Path) -> SandboxResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.width, options.height)
            .viewport(Viewport {
                width: options.width,
                height: options.height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .user_data_dir(profile);
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(SandboxError::Config)
    }

    async fn capture(
        browser: &Browser,
        document: &RenderDocument,
        options: &RenderOptions,
    ) -> SandboxResult<RasterImage> {
        let page = bounded("page open", options.timeout, browser.new_page("about:blank"))
            .await?
            .map_err(|e| SandboxError::Load(e.to_string()))?;

        bounded("document load", options.timeout, page.set_content(document.html()))
            .await?
            .map_err(|e| SandboxError::Load(e.to_string()))?;

        let element = wait_for_selector(&page, &options.selector, options.timeout).await?;

        let png = bounded(
            "capture",
            options.timeout,
            element.screenshot(CaptureScreenshotFormat::Png),
        )
        .await?
        .map_err(|e| SandboxError::Capture(e.to_string()))?;

        if png.is_empty() {
            return Err(SandboxError::Capture("empty screenshot".to_string()));
        }
        Ok(RasterImage::new(png))
    }

    async fn teardown(mut browser: Browser) {
        match tokio::time::timeout(CLOSE_TIMEOUT, browser.close()).await {
            Ok(Ok(_)) => {
                if let Err(e) = browser.wait().await {
                    warn!(error = %e, "Failed to reap browser process");
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Browser close failed, killing process");
                kill(&mut browser).await;
            }
            Err(_) => {
                warn!(timeout = ?CLOSE_TIMEOUT, "Browser close timed out, killing process");
                kill(&mut browser).await;
            }
        }
    }
}

async fn kill(browser: &mut Browser) {
    if let Some(Err(e)) = browser.kill().await {
        warn!(error = %e, "Failed to kill browser process");
    }
}

async fn bounded<T>(
    stage: &'static str,
    after: Duration,
    fut: impl Future<Output = T>,
) -> SandboxResult<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| SandboxError::Timeout { stage, after })
}

async fn wait_for_selector(
    page: &Page,
    selector: &str,
    waited: Duration,
) -> SandboxResult<chromiumoxide::element::Element> {
    let poll = async {
        loop {
            match page.find_element(selector).await {
                Ok(element) => return element,
                Err(_) => tokio::time::sleep(SELECTOR_POLL_INTERVAL).await,
            }
        }
    };
    tokio::time::timeout(waited, poll)
        .await
        .map_err(|_| SandboxError::SelectorTimeout {
            selector: selector.to_string(),
            waited,
        })
}

#[async_trait]
impl Sandbox for ChromiumSandbox {
    #[instrument(skip(self, document, options), fields(token_id = %document.token_id()))]
    async fn render(
        &self,
        document: &RenderDocument,
        options: &RenderOptions,
    ) -> SandboxResult<RasterImage> {
        let _permit = bounded("browser slot wait", options.deadline, self.permits.acquire())
            .await?
            .map_err(|_| SandboxError::Launch("sandbox is shut down".to_string()))?;

        let profile = tempfile::Builder::new()
            .prefix("easel-browser-")
            .tempdir()
            .map_err(|e| SandboxError::Launch(format!("profile directory: {e}")))?;
        let config = self.browser_config(options, profile.path())?;

        let (browser, mut handler) = bounded("launch", LAUNCH_TIMEOUT, Browser::launch(config))
            .await?
            .map_err(|e| SandboxError::Launch(e.to_string()))?;
        debug!(width = options.width, height = options.height, "Browser launched");

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = Self::capture(&browser, document, options).await;

        Self::teardown(browser).await;
        events.abort();
        drop(profile);

        match &result {
            Ok(image) => debug!(bytes = image.len(), "Captured mount element"),
            Err(e) => debug!(error = %e, "Render failed"),
        }
        result
    }

    fn backend_name(&self) -> &'static str {
        "chromium"
    }
}
