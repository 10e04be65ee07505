//! Configuration types shared across crates.

use crate::address::ContractAddress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A credential that never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reveal the credential for use in a request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5555").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Deployment environment name, reported at startup.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Enable the /metrics endpoint for Prometheus scraping.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:5555".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            environment: default_environment(),
            metrics_enabled: true,
            cors_enabled: true,
        }
    }
}

/// Ledger (JSON-RPC node) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint base URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Node provider key, appended to `rpc_url` as a path segment when set.
    #[serde(default)]
    pub api_key: Option<Secret>,
    /// Contract holding token hashes and project scripts.
    #[serde(default = "default_contract_address")]
    pub contract_address: ContractAddress,
    /// Per-call timeout in seconds.
    #[serde(default = "default_ledger_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "https://mainnet.infura.io/v3".to_string()
}

fn default_contract_address() -> ContractAddress {
    // Art Blocks core contract on mainnet.
    ContractAddress::from_bytes([
        0xa7, 0xd8, 0xd9, 0xef, 0x8d, 0x8c, 0xe8, 0x99, 0x2d, 0xf3, 0x3d, 0x8b, 0x8c, 0xf4, 0xae,
        0xba, 0xbd, 0x5b, 0xd2, 0x70,
    ])
}

fn default_ledger_timeout_secs() -> u64 {
    30
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            api_key: None,
            contract_address: default_contract_address(),
            timeout_secs: default_ledger_timeout_secs(),
        }
    }
}

impl LedgerConfig {
    /// Full endpoint URL including the provider key.
    pub fn endpoint(&self) -> String {
        let base = self.rpc_url.trim_end_matches('/');
        match &self.api_key {
            Some(key) if !key.expose().is_empty() => format!("{base}/{}", key.expose()),
            _ => base.to_string(),
        }
    }

    /// Get the per-call timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate ledger configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc_url.trim().is_empty() {
            return Err("ledger.rpc_url cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("ledger.timeout_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Sandbox rendering configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Id of the mount element that programs draw into and that gets captured.
    #[serde(default = "default_selector")]
    pub selector: String,
    /// Viewport width in pixels.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Viewport height in pixels.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Maximum wait for the mount element, in seconds.
    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,
    /// Overall bound on one render in seconds, including the wait for a
    /// browser slot.
    #[serde(default = "default_render_deadline_secs")]
    pub deadline_secs: u64,
    /// Scripts loaded before the token binding and program.
    #[serde(default = "default_library_urls")]
    pub library_urls: Vec<String>,
    /// Browser executable; autodetected when unset.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
    /// Disable the browser's own OS-level sandbox (needed in some containers).
    #[serde(default)]
    pub no_sandbox: bool,
    /// Maximum number of browser processes alive at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_selector() -> String {
    "test".to_string()
}

fn default_dimension() -> u32 {
    2700
}

fn default_render_timeout_secs() -> u64 {
    60
}

fn default_library_urls() -> Vec<String> {
    vec!["https://cdn.jsdelivr.net/npm/p5@1.2.0/lib/p5.js".to_string()]
}

fn default_render_deadline_secs() -> u64 {
    180
}

fn default_max_concurrent() -> usize {
    4
}

/// Largest viewport edge accepted, in pixels.
pub const MAX_VIEWPORT_EDGE: u32 = 16_384;

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            selector: default_selector(),
            width: default_dimension(),
            height: default_dimension(),
            timeout_secs: default_render_timeout_secs(),
            deadline_secs: default_render_deadline_secs(),
            library_urls: default_library_urls(),
            chrome_executable: None,
            no_sandbox: false,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl RenderConfig {
    /// Get the selector wait timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the overall render bound as a Duration.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Validate render configuration.
    pub fn validate(&self) -> Result<(), String> {
        // The selector is spliced into markup and a CSS selector.
        if self.selector.is_empty()
            || !self
                .selector
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "render.selector {:?} must be a non-empty element id of [A-Za-z0-9_-]",
                self.selector
            ));
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 || value > MAX_VIEWPORT_EDGE {
                return Err(format!(
                    "render.{name} {value} must be between 1 and {MAX_VIEWPORT_EDGE}"
                ));
            }
        }
        if self.timeout_secs == 0 {
            return Err("render.timeout_secs cannot be 0".to_string());
        }
        if self.deadline_secs < self.timeout_secs {
            return Err(format!(
                "render.deadline_secs {} cannot be less than render.timeout_secs {}",
                self.deadline_secs, self.timeout_secs
            ));
        }
        if self.max_concurrent == 0 {
            return Err("render.max_concurrent cannot be 0".to_string());
        }
        if let Some(url) = self.library_urls.iter().find(|u| u.contains('"')) {
            return Err(format!("render.library_urls entry contains a quote: {url}"));
        }
        Ok(())
    }
}

/// Content-addressed store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// NFT.Storage upload API with reads through an IPFS gateway.
    NftStorage {
        /// Upload API base URL.
        #[serde(default = "default_nft_storage_api")]
        api_url: String,
        /// Upload API token.
        token: Secret,
        /// Gateway base URL used for reads (`{gateway}/{address}`).
        #[serde(default = "default_gateway")]
        gateway: String,
        /// Per-request timeout in seconds.
        #[serde(default = "default_storage_timeout_secs")]
        timeout_secs: u64,
        /// Description recorded in each published metadata document.
        #[serde(default = "default_description")]
        description: String,
    },
    /// Local content-addressed directory (development and tests).
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
        /// Per-operation timeout in seconds.
        #[serde(default = "default_storage_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_nft_storage_api() -> String {
    "https://api.nft.storage".to_string()
}

fn default_gateway() -> String {
    "https://ipfs.io/ipfs".to_string()
}

fn default_storage_timeout_secs() -> u64 {
    120
}

/// Description recorded in published metadata when none is configured.
pub const DEFAULT_DESCRIPTION: &str = "Rendered token image";

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/content"),
            timeout_secs: default_storage_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Per-operation timeout for publish and resolve.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::NftStorage { timeout_secs, .. } | Self::Filesystem { timeout_secs, .. } => {
                Duration::from_secs(*timeout_secs)
            }
        }
    }

    /// Description recorded in published metadata documents.
    pub fn description(&self) -> &str {
        match self {
            Self::NftStorage { description, .. } => description,
            Self::Filesystem { .. } => DEFAULT_DESCRIPTION,
        }
    }

    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout().is_zero() {
            return Err("storage.timeout_secs cannot be 0".to_string());
        }
        match self {
            Self::NftStorage {
                api_url,
                token,
                gateway,
                ..
            } => {
                if token.expose().trim().is_empty() {
                    return Err("storage.token cannot be empty".to_string());
                }
                if api_url.trim().is_empty() || gateway.trim().is_empty() {
                    return Err("storage.api_url and storage.gateway are required".to_string());
                }
                Ok(())
            }
            Self::Filesystem { .. } => Ok(()),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Sandbox rendering configuration.
    #[serde(default)]
    pub render: RenderConfig,
    /// Content store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage under `./data` and a small viewport.
    pub fn for_testing() -> Self {
        Self {
            render: RenderConfig {
                width: 64,
                height: 64,
                timeout_secs: 5,
                library_urls: Vec::new(),
                ..RenderConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> crate::Result<()> {
        self.ledger
            .validate()
            .and_then(|()| self.render.validate())
            .and_then(|()| self.storage.validate())
            .map_err(crate::Error::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:5555");
        assert_eq!(config.server.environment, "dev");
        assert_eq!(config.render.selector, "test");
        assert_eq!((config.render.width, config.render.height), (2700, 2700));
        assert_eq!(
            config.ledger.contract_address.to_hex(),
            "0xa7d8d9ef8d8ce8992df33d8b8cf4aebabd5bd270"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ledger_endpoint_appends_api_key() {
        let mut config = LedgerConfig::default();
        assert_eq!(config.endpoint(), "https://mainnet.infura.io/v3");

        config.api_key = Some(Secret::new("abc123"));
        assert_eq!(config.endpoint(), "https://mainnet.infura.io/v3/abc123");

        config.rpc_url = "http://localhost:8545/".to_string();
        config.api_key = Some(Secret::new(""));
        assert_eq!(config.endpoint(), "http://localhost:8545");
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let config = LedgerConfig {
            api_key: Some(Secret::new("super-secret")),
            ..LedgerConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn render_validate_rejects_bad_selector() {
        for selector in ["", "a b", "x\"y", "#test", "<body>"] {
            let config = RenderConfig {
                selector: selector.to_string(),
                ..RenderConfig::default()
            };
            assert!(config.validate().is_err(), "{selector:?} should be rejected");
        }
    }

    #[test]
    fn render_deadline_cannot_undercut_stage_timeout() {
        let config = RenderConfig {
            timeout_secs: 60,
            deadline_secs: 30,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RenderConfig::default();
        assert_eq!(config.deadline(), Duration::from_secs(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn render_validate_rejects_zero_dimensions() {
        let config = RenderConfig {
            width: 0,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RenderConfig {
            height: MAX_VIEWPORT_EDGE + 1,
            ..RenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn storage_config_nftstorage_deserializes_with_defaults() {
        let json = r#"{"type":"nftstorage","token":"tok"}"#;
        let config: StorageConfig = serde_json::from_str(json).unwrap();
        match &config {
            StorageConfig::NftStorage {
                api_url,
                gateway,
                timeout_secs,
                ..
            } => {
                assert_eq!(api_url, "https://api.nft.storage");
                assert_eq!(gateway, "https://ipfs.io/ipfs");
                assert_eq!(*timeout_secs, 120);
            }
            _ => panic!("expected nftstorage config"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn storage_config_rejects_empty_token() {
        let json = r#"{"type":"nftstorage","token":"  "}"#;
        let config: StorageConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn app_config_deserializes_partial_document() {
        let json = r#"{"render":{"width":800},"ledger":{"contract_address":"0x0000000000000000000000000000000000000001"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.height, 2700);
        assert_eq!(config.ledger.timeout_secs, 30);
        assert!(matches!(config.storage, StorageConfig::Filesystem { .. }));
    }
}
