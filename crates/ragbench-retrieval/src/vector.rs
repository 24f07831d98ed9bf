//! Dense embedding index with linear-scan cosine scoring.
//!
//! Building invokes the injected [`EmbeddingProvider`] once per chunk, strictly in
//! chunk order, and reports progress after each chunk. The index becomes
//! searchable only after a build completes; a failed or abandoned build leaves it
//! unusable until rebuilt from scratch.

use std::sync::Arc;

use ragbench_core::{Chunk, RagError, RetrievalMethod, RetrievalResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::similarity::{dense_dot, dense_norm, floor_norm, rank_and_truncate, require_top_k};

/// Characters of chunk text sent to the provider by default.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2000;

/// Progress of a vector index build, reported after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildProgress {
    /// Chunks embedded so far.
    pub done: usize,
    /// Chunks to embed in total.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Empty,
    Building,
    Ready,
    Failed,
}

/// Embedding index over a chunk set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ragbench_core::ChunkingConfig;
/// use ragbench_retrieval::chunker::chunk_text;
/// use ragbench_retrieval::embedding::HashingEmbedder;
/// use ragbench_retrieval::vector::VectorIndex;
///
/// # async fn example() {
/// let chunks = chunk_text("apple banana apple cherry", &ChunkingConfig::new(2, 0).unwrap()).unwrap();
/// let mut index = VectorIndex::new(&chunks, Arc::new(HashingEmbedder::new(64).unwrap()));
/// index.build(|p| println!("{}/{}", p.done, p.total)).await.unwrap();
/// let hits = index.search("cherry", 1).await.unwrap();
/// assert_eq!(hits[0].chunk.id, 1);
/// # }
/// ```
pub struct VectorIndex {
    chunks: Vec<Arc<Chunk>>,
    provider: Arc<dyn EmbeddingProvider>,
    max_input_chars: usize,
    embeddings: Vec<Vec<f32>>,
    norms: Vec<f64>,
    state: BuildState,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.chunks.len())
            .field("provider", &self.provider.name())
            .field("max_input_chars", &self.max_input_chars)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Create an unbuilt index over `chunks` using `provider`.
    pub fn new(chunks: &[Arc<Chunk>], provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            chunks: chunks.to_vec(),
            provider,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            embeddings: Vec::new(),
            norms: Vec::new(),
            state: BuildState::Empty,
        }
    }

    /// Override how many characters of each chunk are embedded.
    #[must_use]
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars.max(1);
        self
    }

    /// Embed every chunk in order, calling `on_progress` after each one.
    ///
    /// Chunk text is truncated to the configured character limit before embedding.
    ///
    /// # Errors
    ///
    /// Propagates the provider's [`RagError`] unchanged. The index is left unusable
    /// and must be rebuilt.
    pub async fn build<F>(&mut self, mut on_progress: F) -> Result<(), RagError>
    where
        F: FnMut(BuildProgress) + Send,
    {
        self.state = BuildState::Building;
        self.embeddings.clear();
        self.norms.clear();

        let total = self.chunks.len();
        let mut dimensions: Option<usize> = None;

        for (i, chunk) in self.chunks.iter().enumerate() {
            let text = truncate_chars(&chunk.text, self.max_input_chars);
            let embedding = match self.provider.embed(text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    self.state = BuildState::Failed;
                    self.embeddings.clear();
                    self.norms.clear();
                    return Err(e);
                }
            };

            match dimensions {
                None => dimensions = Some(embedding.len()),
                Some(d) if d != embedding.len() => warn!(
                    chunk = chunk.id,
                    expected = d,
                    actual = embedding.len(),
                    "embedding dimensionality changed during build"
                ),
                Some(_) => {}
            }

            self.norms.push(floor_norm(dense_norm(&embedding)));
            self.embeddings.push(embedding);
            on_progress(BuildProgress { done: i + 1, total });
        }

        self.state = BuildState::Ready;
        info!(
            chunks = total,
            dimensions = dimensions.unwrap_or(0),
            provider = self.provider.name(),
            "built vector index"
        );
        Ok(())
    }

    /// Whether a build has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.state == BuildState::Ready
    }

    /// Embed `query` through the index's provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotBuilt`] before a successful build, or the provider's
    /// error.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        self.require_ready()?;
        self.provider.embed(query).await
    }

    /// Score every chunk against `query` by embedding cosine similarity and return
    /// the best `top_k`, ties kept in chunk order.
    ///
    /// The query norm is computed explicitly rather than assuming the provider
    /// normalizes.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `top_k` is zero,
    /// [`RagError::NotBuilt`] before a successful build, or the provider's error.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, RagError> {
        require_top_k(top_k)?;
        let query_embedding = self.embed_query(query).await?;
        let query_norm = floor_norm(dense_norm(&query_embedding));

        let mut results: Vec<RetrievalResult> = self
            .chunks
            .iter()
            .zip(self.embeddings.iter().zip(&self.norms))
            .map(|(chunk, (embedding, norm))| {
                let score = dense_dot(&query_embedding, embedding) / (query_norm * norm);
                RetrievalResult::new(Arc::clone(chunk), score, RetrievalMethod::Vector)
            })
            .collect();

        debug!(query_len = query.len(), scored = results.len(), "vector search");
        rank_and_truncate(&mut results, top_k);
        Ok(results)
    }

    /// Chunks in index order.
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Number of chunks covered by the index.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index covers no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding of the chunk at position `i`, once built.
    pub fn embedding(&self, i: usize) -> Option<&[f32]> {
        self.embeddings.get(i).map(Vec::as_slice)
    }

    /// Floored L2 norm of the chunk embedding at position `i`, once built.
    pub fn norm(&self, i: usize) -> Option<f64> {
        self.norms.get(i).copied()
    }

    fn require_ready(&self) -> Result<(), RagError> {
        match self.state {
            BuildState::Ready => Ok(()),
            BuildState::Empty => Err(RagError::NotBuilt(
                "vector index has not been built".into(),
            )),
            BuildState::Building => Err(RagError::NotBuilt(
                "vector index build did not complete".into(),
            )),
            BuildState::Failed => Err(RagError::NotBuilt(
                "vector index build failed; rebuild before searching".into(),
            )),
        }
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
