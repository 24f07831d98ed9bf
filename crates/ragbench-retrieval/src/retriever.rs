//! Retrieval orchestration over one chunk set.
//!
//! Keeps the keyword index and an optional vector index side by side and routes
//! a question through keyword, vector, or hybrid retrieval.

use std::sync::Arc;

use ragbench_core::{Chunk, RagError, RetrievalConfig, RetrievalMode, RetrievalResult};
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::fusion::rrf_fuse;
use crate::keyword::KeywordIndex;
use crate::similarity::require_top_k;
use crate::vector::{BuildProgress, VectorIndex, DEFAULT_MAX_INPUT_CHARS};

/// Parameters for a single retrieval call.
///
/// # Examples
///
/// ```
/// use ragbench_core::{RetrievalConfig, RetrievalMode};
/// use ragbench_retrieval::retriever::RetrievalRequest;
///
/// let request = RetrievalRequest::from(&RetrievalConfig::default());
/// assert_eq!(request.mode, RetrievalMode::Keyword);
/// assert_eq!(request.top_k, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalRequest {
    /// Which retriever(s) to use.
    pub mode: RetrievalMode,
    /// Results to return.
    pub top_k: usize,
    /// RRF smoothing constant for hybrid mode.
    pub rrf_k: usize,
    /// Minimum list length requested from each retriever before fusion.
    pub candidate_pool: usize,
}

impl From<&RetrievalConfig> for RetrievalRequest {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            mode: config.mode,
            top_k: config.top_k,
            rrf_k: config.rrf_k,
            candidate_pool: config.candidate_pool,
        }
    }
}

/// Owns a chunk set and the indexes built over it.
///
/// # Examples
///
/// ```
/// use ragbench_core::{ChunkingConfig, RetrievalMode};
/// use ragbench_retrieval::chunker::chunk_text;
/// use ragbench_retrieval::retriever::{RetrievalRequest, Retriever};
///
/// # async fn example() {
/// let chunks = chunk_text("apple banana apple cherry", &ChunkingConfig::new(2, 0).unwrap()).unwrap();
/// let mut retriever = Retriever::new(chunks);
/// retriever.build_keyword();
/// let request = RetrievalRequest { mode: RetrievalMode::Keyword, top_k: 2, rrf_k: 60, candidate_pool: 10 };
/// let results = retriever.retrieve("cherry", &request).await.unwrap();
/// assert_eq!(results[0].chunk.id, 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Retriever {
    chunks: Vec<Arc<Chunk>>,
    keyword: Option<KeywordIndex>,
    vector: Option<VectorIndex>,
}

impl Retriever {
    /// Create a retriever with no indexes built.
    pub fn new(chunks: Vec<Arc<Chunk>>) -> Self {
        Self {
            chunks,
            keyword: None,
            vector: None,
        }
    }

    /// The chunk set.
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// (Re)build the keyword index.
    pub fn build_keyword(&mut self) -> &KeywordIndex {
        self.keyword.insert(KeywordIndex::build(&self.chunks))
    }

    /// (Re)build the vector index with `provider`.
    ///
    /// Any previous vector index is discarded first, so a failed build leaves no
    /// vector index behind.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error.
    pub async fn build_vector<F>(
        &mut self,
        provider: Arc<dyn EmbeddingProvider>,
        max_input_chars: Option<usize>,
        on_progress: F,
    ) -> Result<(), RagError>
    where
        F: FnMut(BuildProgress) + Send,
    {
        self.vector = None;
        let mut index = VectorIndex::new(&self.chunks, provider)
            .with_max_input_chars(max_input_chars.unwrap_or(DEFAULT_MAX_INPUT_CHARS));
        index.build(on_progress).await?;
        self.vector = Some(index);
        Ok(())
    }

    /// The keyword index, if built.
    pub fn keyword(&self) -> Option<&KeywordIndex> {
        self.keyword.as_ref()
    }

    /// The vector index, if built.
    pub fn vector(&self) -> Option<&VectorIndex> {
        self.vector.as_ref()
    }

    /// Drop both indexes.
    pub fn reset(&mut self) {
        self.keyword = None;
        self.vector = None;
    }

    /// Retrieve the best chunks for `question`.
    ///
    /// Hybrid mode asks each retriever for `max(top_k, candidate_pool)` results and
    /// fuses them with RRF down to `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] for an empty question or zero `top_k`,
    /// [`RagError::NotBuilt`] if a required index is missing, or a provider error.
    pub async fn retrieve(
        &self,
        question: &str,
        request: &RetrievalRequest,
    ) -> Result<Vec<RetrievalResult>, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidArgument("question is empty".into()));
        }
        require_top_k(request.top_k)?;

        let results = match request.mode {
            RetrievalMode::Keyword => self.keyword_index()?.search(question, request.top_k)?,
            RetrievalMode::Vector => {
                self.vector_index()?
                    .search(question, request.top_k)
                    .await?
            }
            RetrievalMode::Hybrid => {
                let pool = request.top_k.max(request.candidate_pool);
                let keyword = self.keyword_index()?.search(question, pool)?;
                let vector = self.vector_index()?.search(question, pool).await?;
                rrf_fuse(&keyword, &vector, request.top_k, request.rrf_k)?
            }
        };

        debug!(mode = %request.mode, returned = results.len(), "retrieved");
        Ok(results)
    }

    fn keyword_index(&self) -> Result<&KeywordIndex, RagError> {
        self.keyword
            .as_ref()
            .ok_or_else(|| RagError::NotBuilt("keyword index has not been built".into()))
    }

    fn vector_index(&self) -> Result<&VectorIndex, RagError> {
        self.vector
            .as_ref()
            .ok_or_else(|| RagError::NotBuilt("vector index not available".into()))
    }
}
