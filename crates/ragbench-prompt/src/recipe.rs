//! Portable JSON snapshot of a workbench session.
//!
//! A recipe stores chunking and prompting settings plus the chunks themselves.
//! Embeddings are never stored; an importer rebuilds the keyword index from the
//! chunks and builds a vector index on demand.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ragbench_core::{
    Chunk, ChunkingConfig, CiteMode, PromptConfig, RagConfig, RagError, RetrievalMode, SafeMode,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Format version written by [`Recipe::new`].
pub const RECIPE_VERSION: &str = "0.1";

/// Session settings carried by a recipe.
///
/// Missing fields fall back to the workbench defaults on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeSettings {
    /// Words per chunk window (`chunkSizeWords`).
    pub chunk_size_words: usize,
    /// Words shared by consecutive windows (`overlapWords`).
    pub overlap_words: usize,
    /// Retrieval mode in use when the recipe was exported (`retrievalType`).
    pub retrieval_type: RetrievalMode,
    /// Reciprocal Rank Fusion constant for hybrid retrieval (`rrfK`).
    pub rrf_k: usize,
    /// Citation strictness for the system prompt.
    pub cite_mode: CiteMode,
    /// Whether the prompt treats context as untrusted data.
    pub safe_mode: SafeMode,
}

impl Default for RecipeSettings {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for RecipeSettings {
    fn from(config: &RagConfig) -> Self {
        Self {
            chunk_size_words: config.chunking.chunk_size_words,
            overlap_words: config.chunking.overlap_words,
            retrieval_type: config.retrieval.mode,
            rrf_k: config.retrieval.rrf_k,
            cite_mode: config.prompt.cite_mode,
            safe_mode: config.prompt.safe_mode,
        }
    }
}

impl RecipeSettings {
    /// Chunking settings, validated.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] for a zero chunk size or an
    /// overlap that is not smaller than the chunk size.
    pub fn chunking(&self) -> Result<ChunkingConfig, RagError> {
        ChunkingConfig::new(self.chunk_size_words, self.overlap_words)
    }

    /// Overwrite the matching fields of `config` with these settings.
    pub fn apply_to(&self, config: &mut RagConfig) {
        config.chunking = ChunkingConfig {
            chunk_size_words: self.chunk_size_words,
            overlap_words: self.overlap_words,
        };
        config.retrieval.mode = self.retrieval_type;
        config.retrieval.rrf_k = self.rrf_k;
        config.prompt = PromptConfig {
            cite_mode: self.cite_mode,
            safe_mode: self.safe_mode,
        };
    }
}

/// Name and size of a source document, for reference only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocSummary {
    /// File name or label of the document.
    pub name: String,
    /// Length of the document text in characters (`textLength`).
    pub text_length: usize,
}

/// A workbench snapshot: settings, document list, and chunks.
///
/// # Examples
///
/// ```
/// use ragbench_core::{ChunkingConfig, RagConfig};
/// use ragbench_prompt::recipe::{Recipe, RecipeSettings};
/// use ragbench_retrieval::chunker::chunk_text;
///
/// let chunks = chunk_text("apple banana apple cherry", &ChunkingConfig::new(2, 0).unwrap()).unwrap();
/// let recipe = Recipe::new(RecipeSettings::from(&RagConfig::default()), Vec::new(), chunks);
///
/// let json = recipe.to_json().unwrap();
/// assert!(json.contains("\"chunkSizeWords\": 220"));
/// let restored = Recipe::from_json(&json).unwrap();
/// assert_eq!(restored.chunks.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: RecipeSettings,
    #[serde(default)]
    pub docs: Vec<DocSummary>,
    #[serde(default)]
    pub chunks: Vec<Arc<Chunk>>,
}

fn default_version() -> String {
    RECIPE_VERSION.to_string()
}

impl Recipe {
    /// Snapshot `chunks` with `settings`, stamped with the current time.
    pub fn new(settings: RecipeSettings, docs: Vec<DocSummary>, chunks: Vec<Arc<Chunk>>) -> Self {
        Self {
            version: default_version(),
            exported_at: Utc::now(),
            settings,
            docs,
            chunks,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, RagError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a recipe.
    ///
    /// Chunk ids are kept as stored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Serialization`] for malformed JSON and
    /// [`RagError::InvalidArgument`] for invalid chunking settings, a zero
    /// `rrfK`, or duplicate chunk ids.
    pub fn from_json(json: &str) -> Result<Self, RagError> {
        let recipe: Self = serde_json::from_str(json)?;
        recipe.validate()?;
        if recipe.version != RECIPE_VERSION {
            warn!(version = %recipe.version, "recipe version differs from {RECIPE_VERSION}");
        }
        Ok(recipe)
    }

    /// Write the recipe as JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), RagError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read and validate a recipe from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FileNotFound`] if the file does not exist, otherwise
    /// the errors of [`from_json`](Self::from_json).
    pub fn read_from(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(RagError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check settings and chunk id uniqueness.
    ///
    /// # Errors
    ///
    /// See [`from_json`](Self::from_json).
    pub fn validate(&self) -> Result<(), RagError> {
        self.settings.chunking()?;
        if self.settings.rrf_k == 0 {
            return Err(RagError::InvalidArgument("rrfK must be positive".into()));
        }
        let mut ids = HashSet::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            if !ids.insert(chunk.id) {
                return Err(RagError::InvalidArgument(format!(
                    "duplicate chunk id {} in recipe",
                    chunk.id
                )));
            }
        }
        Ok(())
    }
}
