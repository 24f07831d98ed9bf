//! Shared scoring helpers: epsilon-floored norms, dense dot products, and
//! stable descending ranking.

use ragbench_core::{RagError, RetrievalResult};

/// Lower bound for vector norms, so zero vectors score 0 instead of dividing by zero.
pub const NORM_EPSILON: f64 = 1e-9;

/// Floor `norm` at [`NORM_EPSILON`]. Non-finite norms also collapse to the floor.
pub fn floor_norm(norm: f64) -> f64 {
    if norm.is_finite() && norm > NORM_EPSILON {
        norm
    } else {
        NORM_EPSILON
    }
}

/// Dot product of two dense vectors, accumulated in `f64`.
///
/// Vectors of different length are compared over their common prefix.
pub fn dense_dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Euclidean (L2) norm of a dense vector.
pub fn dense_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| {
            let x = f64::from(*x);
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity of two dense vectors with floored norms.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::similarity::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
/// assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    dense_dot(a, b) / (floor_norm(dense_norm(a)) * floor_norm(dense_norm(b)))
}

/// Reject `top_k == 0`.
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`].
pub fn require_top_k(top_k: usize) -> Result<(), RagError> {
    if top_k == 0 {
        return Err(RagError::InvalidArgument("top_k must be positive".into()));
    }
    Ok(())
}

/// Sort by descending score, keeping input order on ties, then keep the first `top_k`.
///
/// Uses the IEEE total order, so a NaN score cannot break the sort.
pub fn rank_and_truncate(results: &mut Vec<RetrievalResult>, top_k: usize) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);
}
