//! Content store backends.

pub mod filesystem;
pub mod nft_storage;
