//! Word-window chunking.
//!
//! Splits plain text into overlapping, fixed-size windows of whitespace-separated
//! words. Consecutive windows share `overlap_words` words, and every word of the
//! source lands in at least one chunk.

use std::sync::Arc;

use ragbench_core::{Chunk, ChunkMeta, ChunkingConfig, RagError};

/// Split `text` into overlapping word windows.
///
/// Ids run `0..n` in emission order. Empty or whitespace-only text yields no chunks.
///
/// # Errors
///
/// Returns [`RagError::InvalidArgument`] if `config` has a zero window or an overlap
/// that is not smaller than the window.
///
/// # Examples
///
/// ```
/// use ragbench_core::ChunkingConfig;
/// use ragbench_retrieval::chunker::chunk_text;
///
/// let config = ChunkingConfig::new(2, 0).unwrap();
/// let chunks = chunk_text("apple banana apple cherry", &config).unwrap();
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].text, "apple banana");
/// assert_eq!(chunks[1].text, "apple cherry");
/// ```
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Arc<Chunk>>, RagError> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size_words).min(words.len());
        chunks.push(Arc::new(Chunk {
            id: chunks.len(),
            text: words[start..end].join(" "),
            meta: ChunkMeta {
                start_word: start,
                end_word: end,
            },
        }));
        if end == words.len() {
            break;
        }
        // overlap < chunk_size, so the window always advances
        start = end.saturating_sub(config.overlap_words);
    }

    Ok(chunks)
}

/// Concatenate several documents (blank-line separated) and chunk the result.
///
/// # Errors
///
/// Same as [`chunk_text`].
///
/// # Examples
///
/// ```
/// use ragbench_core::ChunkingConfig;
/// use ragbench_retrieval::chunker::chunk_documents;
///
/// let config = ChunkingConfig::new(3, 1).unwrap();
/// let chunks = chunk_documents(&["one two", "three four"], &config).unwrap();
/// assert_eq!(chunks[0].text, "one two three");
/// ```
pub fn chunk_documents<S: AsRef<str>>(
    documents: &[S],
    config: &ChunkingConfig,
) -> Result<Vec<Arc<Chunk>>, RagError> {
    let combined = documents
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    chunk_text(combined.trim(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig::new(size, overlap).unwrap()
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(chunk_text("", &config(5, 1)).unwrap().is_empty());
        assert!(chunk_text("   \n\t ", &config(5, 1)).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("just three words", &config(10, 2)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].meta, ChunkMeta { start_word: 0, end_word: 3 });
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        let chunks = chunk_text("a\n\nb\t c", &config(10, 0)).unwrap();
        assert_eq!(chunks[0].text, "a b c");
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let chunks = chunk_text(&numbered_words(57), &config(7, 3)).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
        }
    }

    #[test]
    fn consecutive_chunks_overlap_by_configured_words() {
        let chunks = chunk_text(&numbered_words(50), &config(10, 4)).unwrap();
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0].meta, &pair[1].meta);
            assert_eq!(a.end_word - b.start_word, 4, "{a:?} -> {b:?}");
        }
    }

    #[test]
    fn every_word_is_covered() {
        let total = 83;
        let chunks = chunk_text(&numbered_words(total), &config(9, 2)).unwrap();
        let mut covered = vec![false; total];
        for chunk in &chunks {
            for slot in &mut covered[chunk.meta.start_word..chunk.meta.end_word] {
                *slot = true;
            }
        }
        assert!(covered.iter().all(|c| *c));
        assert_eq!(chunks.first().unwrap().meta.start_word, 0);
        assert_eq!(chunks.last().unwrap().meta.end_word, total);
    }

    #[test]
    fn chunk_text_matches_word_range() {
        let text = numbered_words(20);
        let words: Vec<&str> = text.split_whitespace().collect();
        let chunks = chunk_text(&text, &config(6, 2)).unwrap();
        for chunk in &chunks {
            let expected = words[chunk.meta.start_word..chunk.meta.end_word].join(" ");
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn exact_multiple_stops_without_empty_tail() {
        let chunks = chunk_text(&numbered_words(10), &config(5, 0)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].meta, ChunkMeta { start_word: 5, end_word: 10 });
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let bad = ChunkingConfig {
            chunk_size_words: 4,
            overlap_words: 4,
        };
        let err = chunk_text("a b c d e f", &bad).unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[test]
    fn documents_are_joined_before_chunking() {
        let chunks = chunk_documents(&["a b", "", "c"], &config(10, 0)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a b c");
    }
}
