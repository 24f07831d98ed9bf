//! Hybrid retrieval with Reciprocal Rank Fusion (RRF).
//!
//! Only ranks matter, not raw scores, so lexical and dense similarities with very
//! different distributions can be merged directly.

use std::collections::HashMap;
use std::sync::Arc;

use ragbench_core::{Chunk, RagError, RetrievalMethod, RetrievalResult};

use crate::similarity::{rank_and_truncate, require_top_k};

/// Conventional RRF smoothing constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Merge two ranked lists with Reciprocal Rank Fusion.
///
/// Each item at 1-based position `rank` contributes `1 / (rrf_k + rank)` to the
/// fused score of its chunk id; a chunk present in both lists accumulates both
/// contributions. Output is ordered by descending fused score, ties by first
/// appearance across `list_a` then `list_b`, truncated to `top_k`, and tagged
/// [`RetrievalMethod::Hybrid`].
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`] if `top_k` or `rrf_k` is zero.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::fusion::rrf_fuse;
///
/// // Empty inputs produce empty output
/// let results = rrf_fuse(&[], &[], 5, 60).unwrap();
/// assert!(results.is_empty());
/// ```
pub fn rrf_fuse(
    list_a: &[RetrievalResult],
    list_b: &[RetrievalResult],
    top_k: usize,
    rrf_k: usize,
) -> Result<Vec<RetrievalResult>, RagError> {
    require_top_k(top_k)?;
    if rrf_k == 0 {
        return Err(RagError::InvalidArgument("rrf_k must be positive".into()));
    }

    let mut positions: HashMap<usize, usize> = HashMap::new();
    let mut fused: Vec<(Arc<Chunk>, f64)> = Vec::new();

    for list in [list_a, list_b] {
        for (idx, item) in list.iter().enumerate() {
            let contribution = 1.0 / (rrf_k as f64 + (idx + 1) as f64);
            match positions.get(&item.chunk.id) {
                Some(&pos) => fused[pos].1 += contribution,
                None => {
                    positions.insert(item.chunk.id, fused.len());
                    fused.push((Arc::clone(&item.chunk), contribution));
                }
            }
        }
    }

    let mut results: Vec<RetrievalResult> = fused
        .into_iter()
        .map(|(chunk, score)| RetrievalResult::new(chunk, score, RetrievalMethod::Hybrid))
        .collect();
    rank_and_truncate(&mut results, top_k);
    Ok(results)
}
