//! Isolated program execution.
//!
//! A `Sandbox` takes a fully assembled `RenderDocument`, runs it in a fresh
//! headless browser with a fixed viewport and returns a PNG of the mount
//! element. The browser never outlives the call.

pub mod chromium;
pub mod error;

pub use chromium::ChromiumSandbox;
pub use error::{SandboxError, SandboxResult};

use async_trait::async_trait;
use easel_core::config::RenderConfig;
use easel_core::{RasterImage, RenderDocument};
use std::time::Duration;

/// Viewport and capture parameters for one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// CSS selector of the element to capture.
    pub selector: String,
    /// Maximum wait for the selector to match.
    pub timeout: Duration,
    /// Bound on the whole render, including the wait for a browser slot.
    pub deadline: Duration,
}

impl RenderOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            selector: format!("#{}", config.selector),
            timeout: config.timeout(),
            deadline: config.deadline(),
        }
    }
}

/// Executes render documents.
#[async_trait]
pub trait Sandbox: Send + Sync + 'static {
    /// Render `document` and capture the element matching `options.selector`.
    async fn render(
        &self,
        document: &RenderDocument,
        options: &RenderOptions,
    ) -> SandboxResult<RasterImage>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_config_prefix_selector() {
        let config = RenderConfig::default();
        let options = RenderOptions::from_config(&config);
        assert_eq!(options.selector, "#test");
        assert_eq!((options.width, options.height), (2700, 2700));
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.deadline, Duration::from_secs(180));
    }
}
