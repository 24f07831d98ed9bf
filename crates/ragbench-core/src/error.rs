use std::path::PathBuf;

/// Errors that can occur across the ragbench workspace.
///
/// Precondition failures ([`RagError::InvalidArgument`], [`RagError::NotBuilt`],
/// [`RagError::Config`]) are raised before any work is done. Provider failures
/// ([`RagError::Embedding`], [`RagError::Llm`]) are passed through unchanged.
/// Library crates use this type directly; the binary reports it through `miette`.
///
/// # Examples
///
/// ```
/// use ragbench_core::RagError;
///
/// let err = RagError::InvalidArgument("top_k must be positive".into());
/// assert!(err.to_string().contains("top_k"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RagError {
    /// A caller-supplied argument violates an operation's precondition.
    #[error("invalid argument: {0}")]
    #[diagnostic(code(ragbench::invalid_argument))]
    InvalidArgument(String),

    /// An index was queried before its build completed.
    #[error("index not built: {0}")]
    #[diagnostic(
        code(ragbench::not_built),
        help("build the index before searching; a failed build must be retried from scratch")
    )]
    NotBuilt(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(ragbench::config))]
    Config(String),

    /// Embedding provider failure (transport, status, or payload).
    #[error("embedding error: {0}")]
    #[diagnostic(code(ragbench::embedding))]
    Embedding(String),

    /// Completion API or response error.
    #[error("LLM error: {0}")]
    #[diagnostic(code(ragbench::llm))]
    Llm(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl RagError {
    /// Whether this error is a violated precondition rather than a provider failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbench_core::RagError;
    ///
    /// assert!(RagError::NotBuilt("vector index".into()).is_precondition());
    /// assert!(!RagError::Embedding("timeout".into()).is_precondition());
    /// ```
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RagError::InvalidArgument(_) | RagError::NotBuilt(_) | RagError::Config(_)
        )
    }
}
