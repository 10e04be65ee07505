//! Fetching a token's seed and program from the ledger.

use crate::client::{JsonRpcLedger, LedgerClient};
use crate::error::{CallError, LedgerCall, LedgerError};
use easel_core::config::LedgerConfig;
use easel_core::{ContractAddress, ProgramSource, Seed, TokenId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound on fragments per project. Larger counts are treated as a
/// malformed response rather than a reason to issue thousands of reads.
pub const MAX_FRAGMENTS: u64 = 4096;

/// Seed and program for one token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenProgram {
    pub seed: Seed,
    pub source: ProgramSource,
}

/// Reads token programs from a fixed contract.
#[derive(Clone)]
pub struct LedgerReader {
    client: Arc<dyn LedgerClient>,
    contract: ContractAddress,
    timeout: Duration,
}

impl LedgerReader {
    pub fn new(client: Arc<dyn LedgerClient>, contract: ContractAddress, timeout: Duration) -> Self {
        Self {
            client,
            contract,
            timeout,
        }
    }

    /// Build a JSON-RPC backed reader from configuration.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, CallError> {
        let client = JsonRpcLedger::new(config.endpoint())?;
        Ok(Self::new(
            Arc::new(client),
            config.contract_address,
            config.timeout(),
        ))
    }

    /// Contract this reader queries.
    pub fn contract(&self) -> &ContractAddress {
        &self.contract
    }

    /// Fetch the seed and the full program for `token`.
    ///
    /// Reads run sequentially: seed, fragment count, then each fragment in
    /// index order. The first failure aborts the whole fetch.
    #[instrument(skip(self), fields(token_id = %token))]
    pub async fn fetch_program(&self, token: TokenId) -> Result<TokenProgram, LedgerError> {
        let project = token.project_id();

        let seed = self
            .bounded(
                token,
                LedgerCall::TokenHash,
                self.client.token_hash(&self.contract, token),
            )
            .await?;

        let info = self
            .bounded(
                token,
                LedgerCall::ProjectScriptInfo,
                self.client.project_script_info(&self.contract, project),
            )
            .await?;

        if info.script_count > MAX_FRAGMENTS {
            return Err(LedgerError::new(
                token,
                LedgerCall::ProjectScriptInfo,
                CallError::Malformed(format!(
                    "script count {} exceeds {MAX_FRAGMENTS}",
                    info.script_count
                )),
            ));
        }

        let mut source = ProgramSource::default();
        for index in 0..info.script_count {
            let fragment = self
                .bounded(
                    token,
                    LedgerCall::ProjectScriptByIndex { index },
                    self.client
                        .project_script_by_index(&self.contract, project, index),
                )
                .await?;
            source.push(fragment);
        }

        debug!(
            project_id = project.value(),
            fragments = source.len(),
            "Fetched program"
        );
        Ok(TokenProgram { seed, source })
    }

    async fn bounded<T>(
        &self,
        token: TokenId,
        call: LedgerCall,
        fut: impl Future<Output = Result<T, CallError>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|source| LedgerError::new(token, call, source)),
            Err(_) => Err(LedgerError::new(
                token,
                call,
                CallError::Timeout(self.timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ProjectScriptInfo;
    use crate::error::CallResult;
    use async_trait::async_trait;
    use easel_core::ProjectId;
    use std::sync::Mutex;

    struct FakeClient {
        fragments: Vec<&'static str>,
        fail_at: Option<u64>,
        stall_hash: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail_at: None,
                stall_hash: false,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerClient for FakeClient {
        async fn token_hash(&self, _: &ContractAddress, token: TokenId) -> CallResult<Seed> {
            self.calls.lock().unwrap().push(format!("hash {token}"));
            if self.stall_hash {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(Seed::from_bytes([7; 32]))
        }

        async fn project_script_info(
            &self,
            _: &ContractAddress,
            project: ProjectId,
        ) -> CallResult<ProjectScriptInfo> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("info {}", project.value()));
            Ok(ProjectScriptInfo {
                script_json: "{}".to_string(),
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
            project: ProjectId,
            index: u64,
        ) -> CallResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("script {} {index}", project.value()));
            if self.fail_at == Some(index) {
                return Err(CallError::Rpc {
                    code: -32000,
                    message: "execution reverted".to_string(),
                });
            }
            Ok(self.fragments[index as usize].to_string())
        }
    }

    fn reader(client: Arc<FakeClient>) -> LedgerReader {
        LedgerReader::new(
            client,
            ContractAddress::from_bytes([0xaa; 20]),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn fragments_are_read_in_index_order() {
        let client = Arc::new(FakeClient::new(vec!["a;", "b;", "c;"]));
        let program = reader(client.clone())
            .fetch_program(TokenId::new(12_000_001))
            .await
            .unwrap();

        assert_eq!(program.source.concat(), "a;b;c;");
        assert_eq!(program.seed, Seed::from_bytes([7; 32]));
        assert_eq!(
            *client.calls.lock().unwrap(),
            vec![
                "hash 12000001",
                "info 12",
                "script 12 0",
                "script 12 1",
                "script 12 2"
            ]
        );
    }

    #[tokio::test]
    async fn failure_at_middle_fragment_aborts() {
        let client = Arc::new(FakeClient {
            fail_at: Some(1),
            ..FakeClient::new(vec!["a;", "b;", "c;"])
        });
        let err = reader(client.clone())
            .fetch_program(TokenId::new(12_000_001))
            .await
            .unwrap_err();

        assert_eq!(err.token, TokenId::new(12_000_001));
        assert_eq!(err.call, LedgerCall::ProjectScriptByIndex { index: 1 });
        assert!(matches!(err.source, CallError::Rpc { .. }));
        // No read past the failing index.
        assert_eq!(client.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn empty_program_is_fetched() {
        let client = Arc::new(FakeClient::new(vec![]));
        let program = reader(client)
            .fetch_program(TokenId::new(999_999))
            .await
            .unwrap();
        assert!(program.source.is_empty());
    }

    #[tokio::test]
    async fn stalled_call_times_out() {
        let client = Arc::new(FakeClient {
            stall_hash: true,
            ..FakeClient::new(vec!["a;"])
        });
        let err = reader(client)
            .fetch_program(TokenId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err.call, LedgerCall::TokenHash);
        assert!(err.is_timeout());
    }

    #[test]
    fn from_config_uses_contract_address() {
        let config = LedgerConfig::default();
        let reader = LedgerReader::from_config(&config).unwrap();
        assert_eq!(reader.contract(), &config.contract_address);
    }
}
