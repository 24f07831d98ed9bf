use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Half-open word-offset range `[start_word, end_word)` a chunk covers in its source text.
///
/// # Examples
///
/// ```
/// use ragbench_core::ChunkMeta;
///
/// let meta = ChunkMeta { start_word: 0, end_word: 220 };
/// assert_eq!(meta.word_count(), 220);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkMeta {
    /// First word offset (inclusive).
    pub start_word: usize,
    /// Last word offset (exclusive).
    pub end_word: usize,
}

impl ChunkMeta {
    /// Number of words in the range.
    pub fn word_count(&self) -> usize {
        self.end_word.saturating_sub(self.start_word)
    }
}

/// A bounded contiguous slice of a document's words; the unit of indexing and retrieval.
///
/// Chunks are immutable once created and shared by reference (`Arc<Chunk>`) between
/// indexes and retrieval results.
///
/// # Examples
///
/// ```
/// use ragbench_core::{Chunk, ChunkMeta};
///
/// let chunk = Chunk {
///     id: 0,
///     text: "apple banana".into(),
///     meta: ChunkMeta { start_word: 0, end_word: 2 },
/// };
/// assert_eq!(chunk.meta.word_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// 0-based id assigned in creation order.
    pub id: usize,
    /// Words of the window joined by single spaces.
    pub text: String,
    /// Source word range. Absent, `null`, or partial metadata falls back to zeros.
    #[serde(default, deserialize_with = "meta_or_default")]
    pub meta: ChunkMeta,
}

fn meta_or_default<'de, D>(deserializer: D) -> Result<ChunkMeta, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<ChunkMeta>::deserialize(deserializer)?.unwrap_or_default())
}

/// Which retriever produced a [`RetrievalResult`].
///
/// # Examples
///
/// ```
/// use ragbench_core::RetrievalMethod;
///
/// assert_eq!(serde_json::to_string(&RetrievalMethod::Hybrid).unwrap(), "\"hybrid\"");
/// assert_eq!(RetrievalMethod::Keyword.to_string(), "keyword");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    /// TF-IDF cosine similarity.
    Keyword,
    /// Dense embedding cosine similarity.
    Vector,
    /// Reciprocal Rank Fusion of keyword and vector lists.
    Hybrid,
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMethod::Keyword => write!(f, "keyword"),
            RetrievalMethod::Vector => write!(f, "vector"),
            RetrievalMethod::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// A scored reference to a chunk.
///
/// Ranked lists of results are ordered by descending `score`, ties kept in input order.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use ragbench_core::{Chunk, ChunkMeta, RetrievalMethod, RetrievalResult};
///
/// let chunk = Arc::new(Chunk { id: 3, text: "x".into(), meta: ChunkMeta::default() });
/// let result = RetrievalResult::new(Arc::clone(&chunk), 0.5, RetrievalMethod::Vector);
/// assert!(Arc::ptr_eq(&result.chunk, &chunk));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    /// The shared chunk.
    pub chunk: Arc<Chunk>,
    /// Similarity or fused score.
    pub score: f64,
    /// Producing retriever.
    pub method: RetrievalMethod,
}

impl RetrievalResult {
    /// Create a result for `chunk`.
    pub fn new(chunk: Arc<Chunk>, score: f64, method: RetrievalMethod) -> Self {
        Self {
            chunk,
            score,
            method,
        }
    }
}

/// Retrieval strategy selected by the caller.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use ragbench_core::RetrievalMode;
///
/// let mode: RetrievalMode = "hybrid".parse().unwrap();
/// assert_eq!(mode, RetrievalMode::Hybrid);
/// assert!("semantic".parse::<RetrievalMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Keyword index only.
    #[default]
    Keyword,
    /// Vector index only.
    Vector,
    /// Both indexes fused with RRF.
    Hybrid,
}

impl RetrievalMode {
    /// Whether this mode needs a vector index (and thus an embedding provider).
    pub fn needs_vectors(self) -> bool {
        matches!(self, RetrievalMode::Vector | RetrievalMode::Hybrid)
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Keyword => write!(f, "keyword"),
            RetrievalMode::Vector => write!(f, "vector"),
            RetrievalMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyword" => Ok(RetrievalMode::Keyword),
            "vector" => Ok(RetrievalMode::Vector),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(format!("unknown retrieval mode: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// # Examples
///
/// ```
/// use ragbench_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn retrieval_mode_round_trips_through_display() {
        for mode in [
            RetrievalMode::Keyword,
            RetrievalMode::Vector,
            RetrievalMode::Hybrid,
        ] {
            assert_eq!(mode.to_string().parse::<RetrievalMode>().unwrap(), mode);
        }
    }

    #[test]
    fn only_vector_modes_need_vectors() {
        assert!(!RetrievalMode::Keyword.needs_vectors());
        assert!(RetrievalMode::Vector.needs_vectors());
        assert!(RetrievalMode::Hybrid.needs_vectors());
    }

    #[test]
    fn chunk_serializes_camel_case_meta() {
        let chunk = Chunk {
            id: 1,
            text: "apple cherry".into(),
            meta: ChunkMeta {
                start_word: 2,
                end_word: 4,
            },
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["meta"]["startWord"], 2);
        assert_eq!(json["meta"]["endWord"], 4);
    }

    #[test]
    fn chunk_without_meta_deserializes_with_default() {
        let chunk: Chunk = serde_json::from_str(r#"{"id": 7, "text": "hi"}"#).unwrap();
        assert_eq!(chunk.meta, ChunkMeta::default());
    }

    #[test]
    fn null_or_partial_meta_deserializes_with_default() {
        let chunk: Chunk = serde_json::from_str(r#"{"id": 1, "text": "hi", "meta": null}"#).unwrap();
        assert_eq!(chunk.meta, ChunkMeta::default());

        let chunk: Chunk = serde_json::from_str(r#"{"id": 2, "text": "hi", "meta": {}}"#).unwrap();
        assert_eq!(chunk.meta, ChunkMeta::default());

        let chunk: Chunk =
            serde_json::from_str(r#"{"id": 3, "text": "hi", "meta": {"endWord": 9}}"#).unwrap();
        assert_eq!(chunk.meta.start_word, 0);
        assert_eq!(chunk.meta.end_word, 9);
    }

    #[test]
    fn result_serializes_method_lowercase() {
        let chunk = Arc::new(Chunk {
            id: 0,
            text: "a".into(),
            meta: ChunkMeta::default(),
        });
        let result = RetrievalResult::new(chunk, 0.25, RetrievalMethod::Keyword);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "keyword");
        assert_eq!(json["chunk"]["id"], 0);
    }
}
