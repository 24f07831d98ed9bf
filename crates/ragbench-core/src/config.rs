use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RagError;
use crate::types::RetrievalMode;

/// Top-level configuration loaded from `.ragbench.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults. Unknown keys are
/// rejected when parsing, and [`RagConfig::validate`] rejects invalid combinations.
///
/// # Examples
///
/// ```
/// use ragbench_core::RagConfig;
///
/// let config = RagConfig::default();
/// assert_eq!(config.chunking.chunk_size_words, 220);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RagConfig {
    /// Chunk window settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval mode and ranking settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Embedding provider settings for vector retrieval.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Completion endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Prompt framing settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FileNotFound`] if the file does not exist,
    /// [`RagError::Io`] if it cannot be read, or [`RagError::Toml`] if the
    /// content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ragbench_core::RagConfig;
    /// use std::path::Path;
    ///
    /// let config = RagConfig::from_file(Path::new(".ragbench.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(RagError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbench_core::{RagConfig, RetrievalMode};
    ///
    /// let toml = r#"
    /// [retrieval]
    /// mode = "hybrid"
    /// top_k = 8
    /// "#;
    /// let config = RagConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.retrieval.mode, RetrievalMode::Hybrid);
    /// assert_eq!(config.retrieval.top_k, 8);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RagError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Check every section for invalid values.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), RagError> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        self.embedding.validate()?;
        self.llm.validate_sampling()?;
        Ok(())
    }
}

/// Word-window chunking settings.
///
/// # Examples
///
/// ```
/// use ragbench_core::ChunkingConfig;
///
/// let config = ChunkingConfig { chunk_size_words: 10, overlap_words: 10 };
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Maximum words per chunk (default: 220).
    #[serde(default = "default_chunk_size_words")]
    pub chunk_size_words: usize,
    /// Words shared between consecutive chunks (default: 40).
    #[serde(default = "default_overlap_words")]
    pub overlap_words: usize,
}

fn default_chunk_size_words() -> usize {
    220
}

fn default_overlap_words() -> usize {
    40
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size_words(),
            overlap_words: default_overlap_words(),
        }
    }
}

impl ChunkingConfig {
    /// Create a validated chunking configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the window is empty or the overlap
    /// would stop the window from advancing.
    pub fn new(chunk_size_words: usize, overlap_words: usize) -> Result<Self, RagError> {
        let config = Self {
            chunk_size_words,
            overlap_words,
        };
        config.validate()?;
        Ok(config)
    }

    /// Require `chunk_size_words > 0` and `overlap_words < chunk_size_words`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] on violation.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size_words == 0 {
            return Err(RagError::InvalidArgument(
                "chunk_size_words must be positive".into(),
            ));
        }
        if self.overlap_words >= self.chunk_size_words {
            return Err(RagError::InvalidArgument(format!(
                "overlap_words ({}) must be smaller than chunk_size_words ({})",
                self.overlap_words, self.chunk_size_words
            )));
        }
        Ok(())
    }
}

/// Retrieval settings.
///
/// # Examples
///
/// ```
/// use ragbench_core::{RetrievalConfig, RetrievalMode};
///
/// let config = RetrievalConfig::default();
/// assert_eq!(config.mode, RetrievalMode::Keyword);
/// assert_eq!(config.top_k, 5);
/// assert_eq!(config.rrf_k, 60);
/// assert_eq!(config.candidate_pool, 10);
/// assert_eq!(config.max_context_chars, 9000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Retrieval strategy (default: keyword).
    #[serde(default)]
    pub mode: RetrievalMode,
    /// Results returned per query (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// RRF smoothing constant (default: 60).
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Minimum per-retriever list length fed into hybrid fusion (default: 10).
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    /// Character budget for the assembled context (default: 9000).
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_rrf_k() -> usize {
    60
}

fn default_candidate_pool() -> usize {
    10
}

fn default_max_context_chars() -> usize {
    9000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: RetrievalMode::default(),
            top_k: default_top_k(),
            rrf_k: default_rrf_k(),
            candidate_pool: default_candidate_pool(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl RetrievalConfig {
    /// Reject zero-valued counts.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] on violation.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.top_k == 0 {
            return Err(RagError::Config("retrieval.top_k must be positive".into()));
        }
        if self.rrf_k == 0 {
            return Err(RagError::Config("retrieval.rrf_k must be positive".into()));
        }
        if self.max_context_chars == 0 {
            return Err(RagError::Config(
                "retrieval.max_context_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Embedding backend selected by `[embedding] provider`.
///
/// # Examples
///
/// ```
/// use ragbench_core::EmbeddingProviderKind;
///
/// assert_eq!(EmbeddingProviderKind::OpenAi.to_string(), "openai");
/// assert_eq!(serde_json::to_string(&EmbeddingProviderKind::Hashing).unwrap(), "\"hashing\"");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local, deterministic feature hashing.
    #[default]
    Hashing,
    /// Any OpenAI-compatible `/embeddings` HTTP API.
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing => write!(f, "hashing"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Configuration for the embedding provider used by vector retrieval.
///
/// # Examples
///
/// ```
/// use ragbench_core::{EmbeddingConfig, EmbeddingProviderKind};
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.provider, EmbeddingProviderKind::Hashing);
/// assert_eq!(config.dimensions, 384);
/// assert_eq!(config.max_input_chars, 2000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Which embedder to construct (default: hashing).
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    /// Model name sent to the HTTP provider.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Custom base URL for the HTTP provider.
    pub base_url: Option<String>,
    /// API key for the HTTP provider.
    pub api_key: Option<String>,
    /// Vector length produced by the hashing provider (default: 384).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    /// Characters of chunk text sent to the provider (default: 2000).
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimensions() -> usize {
    384
}

fn default_max_input_chars() -> usize {
    2000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            base_url: None,
            api_key: None,
            dimensions: default_embedding_dimensions(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl EmbeddingConfig {
    /// Reject zero sizes.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] on violation.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.dimensions == 0 {
            return Err(RagError::Config(
                "embedding.dimensions must be positive".into(),
            ));
        }
        if self.max_input_chars == 0 {
            return Err(RagError::Config(
                "embedding.max_input_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// How the completion step runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// No network calls; answers explain how to use the context.
    #[default]
    Explain,
    /// Call an OpenAI-compatible chat completions endpoint.
    Api,
}

/// Completion endpoint configuration.
///
/// # Examples
///
/// ```
/// use ragbench_core::{LlmConfig, LlmMode};
///
/// let config = LlmConfig::default();
/// assert_eq!(config.mode, LlmMode::Explain);
/// assert_eq!(config.max_tokens, 512);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Explain-only or API mode (default: explain).
    #[serde(default)]
    pub mode: LlmMode,
    /// Full chat-completions URL.
    pub endpoint: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// Bearer token for the endpoint.
    pub api_key: Option<String>,
    /// Sampling temperature (default: 0.7).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Nucleus sampling mass (default: 0.9).
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Completion length cap (default: 512).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: LlmMode::default(),
            endpoint: None,
            model: None,
            api_key: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// Check sampling parameters: `temperature >= 0`, `0 <= top_p <= 1`,
    /// `max_tokens > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] on violation.
    pub fn validate_sampling(&self) -> Result<(), RagError> {
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(RagError::Config(format!(
                "llm.temperature must be >= 0 (got {})",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(RagError::Config(format!(
                "llm.top_p must be within [0, 1] (got {})",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(RagError::Config("llm.max_tokens must be positive".into()));
        }
        Ok(())
    }

    /// Full check before talking to a model: sampling parameters, plus a
    /// non-blank `endpoint`, `model`, and `api_key` in API mode.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] naming the first missing or invalid setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbench_core::{LlmConfig, LlmMode};
    ///
    /// assert!(LlmConfig::default().validate().is_ok());
    /// let api = LlmConfig { mode: LlmMode::Api, ..LlmConfig::default() };
    /// assert!(api.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), RagError> {
        self.validate_sampling()?;
        if self.mode == LlmMode::Explain {
            return Ok(());
        }
        for (name, value) in [
            ("endpoint", &self.endpoint),
            ("model", &self.model),
            ("api_key", &self.api_key),
        ] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(RagError::Config(format!(
                    "llm.{name} is required when llm.mode = \"api\""
                )));
            }
        }
        Ok(())
    }
}

/// Citation strictness requested in the system prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiteMode {
    /// Citations are encouraged.
    #[default]
    Soft,
    /// Every factual claim must carry a citation.
    Strict,
}

/// Whether retrieved context is framed as untrusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    /// Instructions inside context are to be ignored.
    #[default]
    On,
    /// Context instructions may be considered.
    Off,
}

/// Prompt framing configuration.
///
/// # Examples
///
/// ```
/// use ragbench_core::{CiteMode, PromptConfig, SafeMode};
///
/// let config = PromptConfig::default();
/// assert_eq!(config.cite_mode, CiteMode::Soft);
/// assert_eq!(config.safe_mode, SafeMode::On);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Citation strictness (default: soft).
    #[serde(default)]
    pub cite_mode: CiteMode,
    /// Context trust framing (default: on).
    #[serde(default)]
    pub safe_mode: SafeMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size_words, 220);
        assert_eq!(config.chunking.overlap_words, 40);
        assert_eq!(config.retrieval.mode, RetrievalMode::Keyword);
        assert_eq!(config.retrieval.rrf_k, 60);
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hashing);
        assert_eq!(config.llm.mode, LlmMode::Explain);
        assert_eq!(config.prompt.cite_mode, CiteMode::Soft);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RagConfig::from_toml("").unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.max_input_chars, 2000);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[chunking]
chunk_size_words = 100
overlap_words = 20

[retrieval]
mode = "vector"
top_k = 3
rrf_k = 30

[embedding]
provider = "openai"
model = "nomic-embed-text"
base_url = "http://localhost:11434/v1"

[llm]
mode = "api"
endpoint = "http://localhost:8080/v1/chat/completions"
model = "llama3"
temperature = 0.2

[prompt]
cite_mode = "strict"
safe_mode = "off"
"#;
        let config = RagConfig::from_toml(toml).unwrap();
        assert_eq!(config.chunking.chunk_size_words, 100);
        assert_eq!(config.retrieval.mode, RetrievalMode::Vector);
        assert_eq!(config.retrieval.rrf_k, 30);
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::OpenAi);
        assert_eq!(
            config.embedding.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.llm.mode, LlmMode::Api);
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.prompt.cite_mode, CiteMode::Strict);
        assert_eq!(config.prompt.safe_mode, SafeMode::Off);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_mode_is_rejected_at_parse_time() {
        let result = RagConfig::from_toml("[retrieval]\nmode = \"semantic\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = RagConfig::from_toml("[chunking]\nchunk_size = 10\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(RagConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn unknown_embedding_provider_is_rejected_at_parse_time() {
        let result = RagConfig::from_toml("[embedding]\nprovider = \"voyage\"\n");
        assert!(matches!(result, Err(RagError::Toml(_))));
    }

    #[test]
    fn out_of_range_sampling_is_rejected() {
        for toml in [
            "[llm]\ntemperature = -3.0\n",
            "[llm]\ntop_p = 7.0\n",
            "[llm]\nmax_tokens = 0\n",
        ] {
            let config = RagConfig::from_toml(toml).unwrap();
            let err = config.validate().unwrap_err();
            assert!(matches!(err, RagError::Config(_)), "{toml}");
        }
    }

    #[test]
    fn api_mode_requires_endpoint_model_and_key() {
        let complete = LlmConfig {
            mode: LlmMode::Api,
            endpoint: Some("http://localhost:8080/v1/chat/completions".into()),
            model: Some("llama3".into()),
            api_key: Some("sk-local".into()),
            ..LlmConfig::default()
        };
        assert!(complete.validate().is_ok());

        let blank_model = LlmConfig {
            model: Some("  ".into()),
            ..complete.clone()
        };
        let err = blank_model.validate().unwrap_err();
        assert!(err.to_string().contains("llm.model"));

        // only the sampling checks apply at load time
        let missing = LlmConfig {
            api_key: None,
            ..complete
        };
        assert!(missing.validate().is_err());
        assert!(missing.validate_sampling().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        assert!(ChunkingConfig::new(10, 9).is_ok());
        let err = ChunkingConfig::new(10, 10).unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    #[test]
    fn validate_rejects_zero_top_k() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(matches!(config.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn validate_rejects_unknown_embedding_provider() {
        let mut config = RagConfig::default();
        config.embedding.provider = "voyage".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("voyage"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = RagConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, RagError::FileNotFound(_)));
    }
}
