//! Embedding providers.
//!
//! The vector index depends only on [`EmbeddingProvider`]. Two implementations
//! ship here: [`HttpEmbedder`] for any OpenAI-compatible `/embeddings` endpoint,
//! and [`HashingEmbedder`], a deterministic offline feature-hashing embedder.
//! Providers are constructed and owned by the caller and injected into the index.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragbench_core::{EmbeddingConfig, EmbeddingProviderKind, RagError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::sparse::tokenize;

/// Turns text into a fixed-length numeric vector.
///
/// Dimensionality must stay constant across calls for one vector index.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] on transport, model, or payload failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Short provider label for logs.
    fn name(&self) -> &str;
}

/// Build the provider selected by `config.provider`.
///
/// # Errors
///
/// Returns [`RagError::Config`] for zero dimensions or a missing API key.
///
/// # Examples
///
/// ```
/// use ragbench_core::EmbeddingConfig;
/// use ragbench_retrieval::embedding::provider_from_config;
///
/// let provider = provider_from_config(&EmbeddingConfig::default()).unwrap();
/// assert_eq!(provider.name(), "hashing");
/// ```
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    config.validate()?;
    match config.provider {
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimensions)?)),
        EmbeddingProviderKind::OpenAi => Ok(Arc::new(HttpEmbedder::with_config(config)?)),
    }
}

/// Client for OpenAI-compatible embedding APIs (OpenAI, Ollama, vLLM, LiteLLM, ...).
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::embedding::HttpEmbedder;
///
/// let client = HttpEmbedder::new("test-key");
/// assert_eq!(client.model(), "text-embedding-3-small");
/// ```
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a client for the default endpoint with the given API key.
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the `OPENAI_API_KEY` env var if no key is configured. A key is
    /// optional when a custom `base_url` is set, since local servers often need none.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no API key is available for the default
    /// endpoint, or if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbench_core::{EmbeddingConfig, EmbeddingProviderKind};
    /// use ragbench_retrieval::embedding::HttpEmbedder;
    ///
    /// let config = EmbeddingConfig {
    ///     provider: EmbeddingProviderKind::OpenAi,
    ///     base_url: Some("http://localhost:11434/v1".into()),
    ///     ..EmbeddingConfig::default()
    /// };
    /// let client = HttpEmbedder::with_config(&config).unwrap();
    /// assert_eq!(client.base_url(), "http://localhost:11434/v1");
    /// ```
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, RagError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if api_key.is_none() && config.base_url.is_none() {
            return Err(RagError::Config(
                "embedding API key not found: set embedding.api_key in .ragbench.toml or OPENAI_API_KEY env var".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RagError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
        })
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input: vec![text.to_string()],
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&self.build_request(text));
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(RagError::Embedding(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("failed to parse response: {e}")))?;

        first_embedding(embed_response)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn first_embedding(response: EmbedResponse) -> Result<Vec<f32>, RagError> {
    let first = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Embedding("empty response from embedding API".into()))?;
    if first.embedding.is_empty() {
        return Err(RagError::Embedding("embedding API returned an empty vector".into()));
    }
    Ok(first.embedding)
}

/// Deterministic feature-hashing embedder.
///
/// Each token is hashed (SHA-256) into one of `dimensions` buckets with a hashed
/// sign, and the result is L2-normalized. Captures lexical overlap only; useful
/// offline and in tests where a network model is unavailable.
///
/// # Examples
///
/// ```
/// use ragbench_retrieval::embedding::{EmbeddingProvider, HashingEmbedder};
///
/// # async fn example() {
/// let embedder = HashingEmbedder::new(64).unwrap();
/// let v = embedder.embed("hello world").await.unwrap();
/// assert_eq!(v.len(), 64);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of length `dimensions`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, RagError> {
        if dimensions == 0 {
            return Err(RagError::InvalidArgument(
                "embedding dimensions must be positive".into(),
            ));
        }
        Ok(Self { dimensions })
    }

    /// Output vector length.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
