//! Tokenization and sparse term-weight vectors.

use std::collections::BTreeMap;

/// Lowercase `text`, blank out everything except ASCII letters, digits, and
/// whitespace, and split on whitespace runs.
///
/// Duplicates are kept so callers can count term frequency.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::sparse::tokenize;
///
/// assert_eq!(tokenize("Hello, World! hello"), vec!["hello", "world", "hello"]);
/// assert!(tokenize("--- !!!").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Count occurrences of each distinct token.
pub fn term_counts(tokens: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}

/// A sparse vector mapping terms to weights.
///
/// Backed by an ordered map, so iteration order and equality are deterministic.
/// Zero weights are never stored.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::sparse::SparseVector;
///
/// let a: SparseVector = [("apple", 1.0), ("pear", 2.0)].into_iter().collect();
/// let b: SparseVector = [("pear", 3.0), ("plum", 5.0)].into_iter().collect();
/// assert_eq!(a.dot(&b), 6.0);
/// assert_eq!(b.dot(&a), 6.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    weights: BTreeMap<String, f64>,
}

impl SparseVector {
    /// An empty (zero) vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight for `term`. Zero weights remove the term.
    pub fn insert(&mut self, term: impl Into<String>, weight: f64) {
        let term = term.into();
        if weight == 0.0 {
            self.weights.remove(&term);
        } else {
            self.weights.insert(term, weight);
        }
    }

    /// Weight for `term`, or `0.0` when absent.
    pub fn get(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    /// Number of nonzero terms.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether this is the zero vector.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate `(term, weight)` pairs in term order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }

    /// Dot product over the intersection of nonzero terms.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|v| w * v))
            .sum()
    }

    /// Euclidean (L2) norm.
    pub fn norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }
}

impl<T: Into<String>> FromIterator<(T, f64)> for SparseVector {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        let mut vector = SparseVector::new();
        for (term, weight) in iter {
            vector.insert(term, weight);
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("Rust's TF-IDF, v2.0"),
            vec!["rust", "s", "tf", "idf", "v2", "0"]
        );
    }

    #[test]
    fn tokenize_drops_non_ascii_letters() {
        assert_eq!(tokenize("café naïve"), vec!["caf", "na", "ve"]);
    }

    #[test]
    fn term_counts_counts_duplicates() {
        let tokens = tokenize("a b a c a");
        let counts = term_counts(&tokens);
        assert_eq!(counts["a"], 3);
        assert_eq!(counts["b"], 1);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn zero_weights_are_not_stored() {
        let mut v = SparseVector::new();
        v.insert("x", 0.0);
        assert!(v.is_empty());
        v.insert("x", 1.5);
        v.insert("x", 0.0);
        assert!(v.is_empty());
    }

    #[test]
    fn norm_is_euclidean() {
        let v: SparseVector = [("a", 3.0), ("b", 4.0)].into_iter().collect();
        assert!((v.norm() - 5.0).abs() < 1e-12);
        assert_eq!(SparseVector::new().norm(), 0.0);
    }

    #[test]
    fn disjoint_vectors_have_zero_dot() {
        let a: SparseVector = [("a", 1.0)].into_iter().collect();
        let b: SparseVector = [("b", 1.0)].into_iter().collect();
        assert_eq!(a.dot(&b), 0.0);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a: SparseVector = [("x", 1.0), ("y", 2.0)].into_iter().collect();
        let b: SparseVector = [("y", 2.0), ("x", 1.0)].into_iter().collect();
        assert_eq!(a, b);
        let terms: Vec<&str> = a.iter().map(|(t, _)| t).collect();
        assert_eq!(terms, vec!["x", "y"]);
    }
}
