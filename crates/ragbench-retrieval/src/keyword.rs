//! TF-IDF keyword index with cosine scoring.
//!
//! Term frequency is normalized by chunk length and weighted by a smoothed
//! inverse document frequency, `ln((N + 1) / (df + 1)) + 1`, which stays
//! positive and finite for every observed term. The index is built once from a
//! fixed chunk set; any change to the chunks requires a rebuild.

use std::collections::BTreeMap;
use std::sync::Arc;

use ragbench_core::{Chunk, RagError, RetrievalMethod, RetrievalResult};
use tracing::debug;

use crate::similarity::{floor_norm, rank_and_truncate, require_top_k};
use crate::sparse::{term_counts, tokenize, SparseVector};

/// Sparse TF-IDF index over a chunk set.
///
/// `vectors` and `norms` are index-aligned with `chunks`.
///
/// # Examples
///
/// ```
/// use ragbench_core::ChunkingConfig;
/// use ragbench_retrieval::chunker::chunk_text;
/// use ragbench_retrieval::keyword::KeywordIndex;
///
/// let chunks = chunk_text("apple banana apple cherry", &ChunkingConfig::new(2, 0).unwrap()).unwrap();
/// let index = KeywordIndex::build(&chunks);
/// let hits = index.search("apple", 5).unwrap();
/// assert_eq!(hits.len(), 2);
/// assert_eq!(hits[0].score, hits[1].score);
/// assert_eq!(hits[0].chunk.id, 0);
/// ```
#[derive(Debug, Clone)]
pub struct KeywordIndex {
    chunks: Vec<Arc<Chunk>>,
    df: BTreeMap<String, usize>,
    idf: BTreeMap<String, f64>,
    vectors: Vec<SparseVector>,
    norms: Vec<f64>,
}

impl KeywordIndex {
    /// Compute document frequencies, IDF weights, and one TF-IDF vector per chunk.
    pub fn build(chunks: &[Arc<Chunk>]) -> Self {
        let docs_tokens: Vec<Vec<String>> = chunks.iter().map(|c| tokenize(&c.text)).collect();

        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for tokens in &docs_tokens {
            for term in term_counts(tokens).into_keys() {
                *df.entry(term.to_string()).or_insert(0) += 1;
            }
        }

        let n = chunks.len() as f64;
        let idf: BTreeMap<String, f64> = df
            .iter()
            .map(|(term, count)| (term.clone(), smoothed_idf(n, *count)))
            .collect();

        let mut index = Self {
            chunks: chunks.to_vec(),
            df,
            idf,
            vectors: Vec::with_capacity(chunks.len()),
            norms: Vec::with_capacity(chunks.len()),
        };

        for tokens in &docs_tokens {
            let vector = index.weigh(tokens);
            index.norms.push(floor_norm(vector.norm()));
            index.vectors.push(vector);
        }

        debug!(
            chunks = index.chunks.len(),
            vocabulary = index.idf.len(),
            "built keyword index"
        );
        index
    }

    /// Score every chunk against `query` by TF-IDF cosine similarity and return the
    /// best `top_k`, ties kept in chunk order.
    ///
    /// A query with no known terms scores every chunk 0; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `top_k` is zero.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>, RagError> {
        require_top_k(top_k)?;

        let query_vector = self.query_vector(query);
        let query_norm = floor_norm(query_vector.norm());

        let mut results: Vec<RetrievalResult> = self
            .chunks
            .iter()
            .zip(self.vectors.iter().zip(&self.norms))
            .map(|(chunk, (vector, norm))| {
                let score = query_vector.dot(vector) / (query_norm * norm);
                RetrievalResult::new(Arc::clone(chunk), score, RetrievalMethod::Keyword)
            })
            .collect();

        rank_and_truncate(&mut results, top_k);
        Ok(results)
    }

    /// TF-IDF vector for `query` using this index's IDF; unknown terms are dropped.
    pub fn query_vector(&self, query: &str) -> SparseVector {
        self.weigh(&tokenize(query))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let total = tokens.len() as f64;
        term_counts(tokens)
            .into_iter()
            .filter_map(|(term, count)| {
                self.idf
                    .get(term)
                    .map(|idf| (term, (count as f64 / total) * idf))
            })
            .collect()
    }

    /// Chunks in index order.
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index has no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct terms seen across all chunks.
    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Number of chunks containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.df.get(term).copied().unwrap_or(0)
    }

    /// IDF weight of `term`, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// TF-IDF vector of the chunk at position `i`.
    pub fn vector(&self, i: usize) -> Option<&SparseVector> {
        self.vectors.get(i)
    }

    /// Floored L2 norm of the chunk vector at position `i`.
    pub fn norm(&self, i: usize) -> Option<f64> {
        self.norms.get(i).copied()
    }
}

fn smoothed_idf(n: f64, df: usize) -> f64 {
    ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0
}

#[cfg(test)]
mod tests {
    use ragbench_core::ChunkMeta;

    use super::*;
    use crate::similarity::NORM_EPSILON;

    fn chunks(texts: &[&str]) -> Vec<Arc<Chunk>> {
        texts
            .iter()
            .enumerate()
            .map(|(id, text)| {
                Arc::new(Chunk {
                    id,
                    text: text.to_string(),
                    meta: ChunkMeta::default(),
                })
            })
            .collect()
    }

    #[test]
    fn document_frequency_counts_each_chunk_once() {
        let index = KeywordIndex::build(&chunks(&["cat cat cat", "cat dog", "bird"]));
        assert_eq!(index.document_frequency("cat"), 2);
        assert_eq!(index.document_frequency("dog"), 1);
        assert_eq!(index.document_frequency("fish"), 0);
        assert_eq!(index.vocabulary_size(), 3);
    }

    #[test]
    fn idf_uses_smoothed_formula() {
        let index = KeywordIndex::build(&chunks(&["a b", "a", "c"]));
        let expected_a = (4.0f64 / 3.0).ln() + 1.0;
        let expected_b = (4.0f64 / 2.0).ln() + 1.0;
        assert!((index.idf("a").unwrap() - expected_a).abs() < 1e-12);
        assert!((index.idf("b").unwrap() - expected_b).abs() < 1e-12);
        assert!(index.idf("zzz").is_none());
    }

    #[test]
    fn idf_stays_positive_when_term_is_everywhere() {
        let index = KeywordIndex::build(&chunks(&["x", "x", "x"]));
        assert!((index.idf("x").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tf_is_normalized_by_chunk_length() {
        let index = KeywordIndex::build(&chunks(&["a a b c"]));
        let vector = index.vector(0).unwrap();
        let idf_a = index.idf("a").unwrap();
        assert!((vector.get("a") - 0.5 * idf_a).abs() < 1e-12);
    }

    #[test]
    fn degenerate_chunk_gets_floored_norm() {
        let index = KeywordIndex::build(&chunks(&["!!! ???", "real words"]));
        assert_eq!(index.norm(0), Some(NORM_EPSILON));
        let hits = index.search("real", 2).unwrap();
        assert!(hits.iter().all(|h| h.score.is_finite()));
        assert_eq!(hits[0].chunk.id, 1);
    }

    #[test]
    fn empty_query_scores_zero_everywhere() {
        let index = KeywordIndex::build(&chunks(&["alpha beta", "gamma"]));
        let hits = index.search("...", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score == 0.0));
        assert_eq!(hits[0].chunk.id, 0);
    }

    #[test]
    fn unknown_query_terms_are_ignored() {
        let index = KeywordIndex::build(&chunks(&["alpha beta", "gamma delta"]));
        assert!(index.query_vector("alpha unknown").get("unknown") == 0.0);
        let hits = index.search("alpha unknown", 1).unwrap();
        assert_eq!(hits[0].chunk.id, 0);
        assert!((hits[0].score - index.search("alpha", 1).unwrap()[0].score).abs() < 1e-12);
    }

    #[test]
    fn verbatim_chunk_query_scores_highest() {
        let texts = [
            "the quick brown fox",
            "jumps over the lazy dog",
            "a quick brown dog barks",
        ];
        let index = KeywordIndex::build(&chunks(&texts));
        let hits = index.search(texts[1], 3).unwrap();
        assert_eq!(hits[0].chunk.id, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn results_are_sorted_and_truncated() {
        let index = KeywordIndex::build(&chunks(&["rust", "rust rust go", "go", "rust go"]));
        let hits = index.search("rust", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits.iter().all(|h| h.method == RetrievalMethod::Keyword));
    }

    #[test]
    fn results_share_chunk_allocation() {
        let set = chunks(&["shared text"]);
        let index = KeywordIndex::build(&set);
        let hits = index.search("shared", 1).unwrap();
        assert!(Arc::ptr_eq(&hits[0].chunk, &set[0]));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let index = KeywordIndex::build(&chunks(&["a"]));
        assert!(matches!(
            index.search("a", 0),
            Err(RagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn building_twice_is_deterministic() {
        let set = chunks(&["one two three", "two three four", "four five"]);
        let a = KeywordIndex::build(&set);
        let b = KeywordIndex::build(&set);
        for i in 0..set.len() {
            assert_eq!(a.vector(i), b.vector(i));
            assert_eq!(a.norm(i), b.norm(i));
        }
        let ha: Vec<(usize, f64)> = a
            .search("two four", 3)
            .unwrap()
            .iter()
            .map(|h| (h.chunk.id, h.score))
            .collect();
        let hb: Vec<(usize, f64)> = b
            .search("two four", 3)
            .unwrap()
            .iter()
            .map(|h| (h.chunk.id, h.score))
            .collect();
        assert_eq!(ha, hb);
    }

    #[test]
    fn empty_index_returns_no_results() {
        let index = KeywordIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.search("anything", 3).unwrap().is_empty());
    }
}
