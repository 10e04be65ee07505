//! Core domain types and shared logic for easel.
//!
//! This crate defines the data model used across all other crates:
//! - Token and project identifiers
//! - Seeds, contract addresses and content hashes
//! - Program sources and render document assembly
//! - Published content identifiers and raster images
//! - Configuration

pub mod address;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod hash;
pub mod token;

pub use address::ContractAddress;
pub use content::{ContentId, IMAGE_CONTENT_TYPE, RasterImage};
pub use document::{ProgramAssembler, ProgramSource, RenderDocument};
pub use error::{Error, Result};
pub use hash::{ContentHash, Seed};
pub use token::{ProjectId, TOKENS_PER_PROJECT, TokenId};
