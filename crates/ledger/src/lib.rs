//! Read-only access to the on-chain script contract.
//!
//! `LedgerReader::fetch_program` resolves a token id to its seed and the
//! ordered program fragments of its project. The wire side is a small ABI
//! codec over JSON-RPC `eth_call`.

pub mod abi;
pub mod client;
pub mod error;
pub mod reader;

pub use client::{JsonRpcLedger, LedgerClient, ProjectScriptInfo};
pub use error::{CallError, CallResult, LedgerCall, LedgerError};
pub use reader::{LedgerReader, MAX_FRAGMENTS, TokenProgram};
