//! Contract call client trait and the JSON-RPC implementation.

use crate::abi::{self, Decoder, Token};
use crate::error::{CallError, CallResult};
use async_trait::async_trait;
use easel_core::{ContractAddress, ProjectId, Seed, TokenId};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const TOKEN_ID_TO_HASH: &str = "tokenIdToHash(uint256)";
const PROJECT_SCRIPT_INFO: &str = "projectScriptInfo(uint256)";
const PROJECT_SCRIPT_BY_INDEX: &str = "projectScriptByIndex(uint256,uint256)";

/// Decoded `projectScriptInfo` return tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectScriptInfo {
    pub script_json: String,
    pub script_count: u64,
    pub use_hash_string: bool,
    pub ipfs_hash: String,
    pub locked: bool,
    pub paused: bool,
}

/// Read-only access to the script contract.
///
/// Each method is one contract read. Implementations do not retry and do not
/// apply timeouts; `LedgerReader` bounds every call.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// `tokenIdToHash(tokenId)`.
    async fn token_hash(&self, contract: &ContractAddress, token: TokenId) -> CallResult<Seed>;

    /// `projectScriptInfo(projectId)`.
    async fn project_script_info(
        &self,
        contract: &ContractAddress,
        project: ProjectId,
    ) -> CallResult<ProjectScriptInfo>;

    /// `projectScriptByIndex(projectId, index)`.
    async fn project_script_by_index(
        &self,
        contract: &ContractAddress,
        project: ProjectId,
        index: u64,
    ) -> CallResult<String>;
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `LedgerClient` speaking Ethereum JSON-RPC (`eth_call` at `latest`).
pub struct JsonRpcLedger {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Create a client for the given node endpoint.
    pub fn new(endpoint: impl Into<String>) -> CallResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("easel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Execute `eth_call` and return the raw return data.
    async fn eth_call(&self, to: &ContractAddress, data: Vec<u8>) -> CallResult<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [
                { "to": to.to_hex(), "data": format!("0x{}", hex::encode(&data)) },
                "latest"
            ],
            "id": id,
        });

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: RpcResponse = serde_json::from_slice(&body)
            .map_err(|e| CallError::Malformed(format!("invalid JSON-RPC body: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(CallError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let result = parsed
            .result
            .ok_or_else(|| CallError::Malformed("response has neither result nor error".into()))?;

        debug!(request_id = id, bytes = result.len(), "eth_call returned");
        let digits = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(digits).map_err(|e| CallError::Malformed(format!("result is not hex: {e}")))
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn token_hash(&self, contract: &ContractAddress, token: TokenId) -> CallResult<Seed> {
        let data = abi::encode_call(TOKEN_ID_TO_HASH, &[Token::Uint(token.value())]);
        let ret = self.eth_call(contract, data).await?;
        let bytes = Decoder::new(&ret).bytes32(0).map_err(CallError::Malformed)?;
        Ok(Seed::from_bytes(bytes))
    }

    async fn project_script_info(
        &self,
        contract: &ContractAddress,
        project: ProjectId,
    ) -> CallResult<ProjectScriptInfo> {
        let data = abi::encode_call(PROJECT_SCRIPT_INFO, &[Token::Uint(project.value())]);
        let ret = self.eth_call(contract, data).await?;
        let decoder = Decoder::new(&ret);
        let decode = || -> Result<ProjectScriptInfo, String> {
            Ok(ProjectScriptInfo {
                script_json: decoder.string(0)?,
                script_count: decoder.uint(1)?,
                use_hash_string: decoder.boolean(2)?,
                ipfs_hash: decoder.string(3)?,
                locked: decoder.boolean(4)?,
                paused: decoder.boolean(5)?,
            })
        };
        decode().map_err(CallError::Malformed)
    }

    async fn project_script_by_index(
        &self,
        contract: &ContractAddress,
        project: ProjectId,
        index: u64,
    ) -> CallResult<String> {
        let data = abi::encode_call(
            PROJECT_SCRIPT_BY_INDEX,
            &[Token::Uint(project.value()), Token::Uint(index)],
        );
        let ret = self.eth_call(contract, data).await?;
        Decoder::new(&ret).string(0).map_err(CallError::Malformed)
    }
}
