//! Heuristic citation check for generated answers.
//!
//! Answers cite chunks as `[chunk:<id>]`. The check only verifies that cited ids
//! were part of the retrieved set; it does not judge whether the cited text
//! supports the claim.

use std::collections::HashSet;
use std::fmt;

use ragbench_core::RetrievalResult;
use serde::Serialize;

const MARKER: &str = "[chunk:";

/// Cited chunk ids split by whether they were retrieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationReport {
    /// Every distinct cited id, first-seen order.
    pub cited: Vec<usize>,
    /// Cited ids present in the retrieved set.
    pub valid: Vec<usize>,
    /// Cited ids absent from the retrieved set.
    pub invalid: Vec<usize>,
}

impl CitationReport {
    /// True if at least one citation was found and none are invalid.
    pub fn is_grounded(&self) -> bool {
        !self.cited.is_empty() && self.invalid.is_empty()
    }
}

impl fmt::Display for CitationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |ids: &[usize]| {
            if ids.is_empty() {
                "(none)".to_string()
            } else {
                ids.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };
        writeln!(f, "Citations found: {}", self.cited.len())?;
        writeln!(
            f,
            "Valid citations (in retrieved set): {} -> {}",
            self.valid.len(),
            list(&self.valid)
        )?;
        write!(
            f,
            "Invalid citations: {} -> {}",
            self.invalid.len(),
            list(&self.invalid)
        )
    }
}

/// Extract `[chunk:N]` markers from `answer` and check them against `retrieved`.
///
/// # Examples
///
/// ```
/// use ragbench_prompt::citations::check_citations;
///
/// let report = check_citations("See [chunk:3] and [chunk:3].", &[]);
/// assert_eq!(report.cited, vec![3]);
/// assert_eq!(report.invalid, vec![3]);
/// ```
pub fn check_citations(answer: &str, retrieved: &[RetrievalResult]) -> CitationReport {
    let cited = cited_ids(answer);
    let known: HashSet<usize> = retrieved.iter().map(|r| r.chunk.id).collect();
    let (valid, invalid) = cited.iter().copied().partition(|id| known.contains(id));
    CitationReport {
        cited,
        valid,
        invalid,
    }
}

/// Distinct chunk ids cited in `text`, first-seen order.
pub fn cited_ids(text: &str) -> Vec<usize> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(MARKER) {
        rest = &rest[start + MARKER.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || rest.as_bytes().get(digits) != Some(&b']') {
            continue;
        }
        if let Ok(id) = rest[..digits].parse::<usize>() {
            if seen.insert(id) {
                ids.push(id);
            }
        }
        rest = &rest[digits + 1..];
    }

    ids
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ragbench_core::{Chunk, ChunkMeta, RetrievalMethod};

    use super::*;

    fn retrieved(ids: &[usize]) -> Vec<RetrievalResult> {
        ids.iter()
            .map(|&id| {
                let chunk = Arc::new(Chunk {
                    id,
                    text: String::new(),
                    meta: ChunkMeta::default(),
                });
                RetrievalResult::new(chunk, 1.0, RetrievalMethod::Keyword)
            })
            .collect()
    }

    #[test]
    fn splits_valid_and_invalid() {
        let report = check_citations(
            "Tokio is async [chunk:2]. Serde is fast [chunk:9][chunk:0].",
            &retrieved(&[0, 1, 2]),
        );
        assert_eq!(report.cited, vec![2, 9, 0]);
        assert_eq!(report.valid, vec![2, 0]);
        assert_eq!(report.invalid, vec![9]);
        assert!(!report.is_grounded());
    }

    #[test]
    fn malformed_markers_are_ignored() {
        assert!(cited_ids("[chunk:] [chunk:x1] [chunk:12 [chunk:-3]").is_empty());
        assert_eq!(cited_ids("[chunk:[chunk:4]"), vec![4]);
    }

    #[test]
    fn no_citations_is_not_grounded() {
        let report = check_citations("plain answer", &retrieved(&[0]));
        assert_eq!(report, CitationReport::default());
        assert!(!report.is_grounded());
    }

    #[test]
    fn display_lists_ids() {
        let report = check_citations("[chunk:1]", &retrieved(&[1]));
        let text = report.to_string();
        assert!(text.contains("Citations found: 1"));
        assert!(text.contains("-> 1"));
        assert!(text.ends_with("Invalid citations: 0 -> (none)"));
    }
}
