//! Core types, configuration, and error handling for ragbench.
//!
//! This crate provides the shared foundation used by the other ragbench crates:
//! - [`RagError`] — unified error type using `thiserror`
//! - [`RagConfig`] — configuration loaded from `.ragbench.toml`
//! - Shared types: [`Chunk`], [`RetrievalResult`], [`RetrievalMethod`],
//!   [`RetrievalMode`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    ChunkingConfig, CiteMode, EmbeddingConfig, EmbeddingProviderKind, LlmConfig, LlmMode,
    PromptConfig, RagConfig, RetrievalConfig, SafeMode,
};
pub use error::RagError;
pub use types::{Chunk, ChunkMeta, OutputFormat, RetrievalMethod, RetrievalMode, RetrievalResult};

/// A convenience `Result` type for ragbench operations.
pub type Result<T> = std::result::Result<T, RagError>;
