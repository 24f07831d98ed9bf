//! Chunking, keyword and vector retrieval, and rank fusion.
//!
//! Text is split into overlapping word windows, indexed lexically (TF-IDF) and/or
//! semantically (injected embedding provider), retrieved by cosine similarity,
//! optionally fused with Reciprocal Rank Fusion, and rendered into a bounded
//! context string for prompting.

pub mod chunker;
pub mod context;
pub mod embedding;
pub mod fusion;
pub mod keyword;
pub mod retriever;
pub mod similarity;
pub mod sparse;
pub mod vector;
