//! Grounded answering on top of ragbench retrieval.
//!
//! Provides prompt construction, an OpenAI-compatible completion client with an
//! offline explain-only mode, a citation check for answers, and recipe
//! export/import.

pub mod citations;
pub mod llm;
pub mod prompt;
pub mod recipe;
