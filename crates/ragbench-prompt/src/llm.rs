use std::time::Duration;

use ragbench_core::{LlmConfig, LlmMode, RagError};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ERROR_BODY_CHARS: usize = 700;
const TEST_ERROR_BODY_CHARS: usize = 500;
const NO_CONTENT: &str = "(no content)";

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use ragbench_prompt::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("What is RRF?");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use ragbench_prompt::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// OpenAI-compatible chat completions client.
///
/// In [`LlmMode::Explain`] no request is ever sent; [`complete`](Self::complete)
/// returns a canned explanation that echoes the user message. In
/// [`LlmMode::Api`] the configured `endpoint` is the full chat-completions URL.
///
/// # Examples
///
/// ```
/// use ragbench_core::LlmConfig;
/// use ragbench_prompt::llm::{ChatMessage, LlmClient};
///
/// # async fn example() {
/// let client = LlmClient::new(&LlmConfig::default()).unwrap();
/// let answer = client.complete(&[ChatMessage::user("hi")]).await.unwrap();
/// assert!(answer.starts_with("Explain-only mode"));
/// # }
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if [`LlmConfig::validate`] fails (sampling
    /// out of range, or API mode without endpoint, model, and key), and
    /// [`RagError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, RagError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RagError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// The configured mode.
    pub fn mode(&self) -> LlmMode {
        self.config.mode
    }

    /// The configured model name, if any.
    pub fn model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    /// Run a chat completion and return the assistant text.
    ///
    /// Uses the configured `temperature`, `top_p`, and `max_tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if API mode lacks endpoint, model, or key,
    /// and [`RagError::Llm`] on transport errors, non-success status, or an
    /// unparseable response body.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RagError> {
        if self.config.mode == LlmMode::Explain {
            let question = messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            return Ok(explain_fallback(question));
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens,
        });
        self.post(&body, "LLM call failed", ERROR_BODY_CHARS).await
    }

    /// Send a tiny request to check the endpoint is reachable.
    ///
    /// # Errors
    ///
    /// Same as [`complete`](Self::complete).
    pub async fn test_connection(&self) -> Result<String, RagError> {
        if self.config.mode == LlmMode::Explain {
            return Ok("Explain-only mode is active. No API calls are made.".to_string());
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [ChatMessage::user("Reply with: OK")],
            "temperature": 0,
            "max_tokens": 16,
        });
        self.post(&body, "LLM test failed", TEST_ERROR_BODY_CHARS)
            .await
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        failure: &str,
        error_chars: usize,
    ) -> Result<String, RagError> {
        let (endpoint, api_key) = self.api_target()?;
        debug!(endpoint, model = ?self.config.model, "sending chat completion");

        let response = self
            .client
            .post(endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let head: String = body_text.chars().take(error_chars).collect();
            return Err(RagError::Llm(format!("{failure}: {} {head}", status.as_u16())));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Llm(format!("failed to parse response: {e}")))?;

        Ok(extract_content(&response_body))
    }

    fn api_target(&self) -> Result<(&str, &str), RagError> {
        match (
            non_blank(&self.config.endpoint),
            non_blank(&self.config.model),
            non_blank(&self.config.api_key),
        ) {
            (Some(endpoint), Some(_), Some(key)) => Ok((endpoint, key)),
            _ => Err(RagError::Config(
                "API mode needs llm.endpoint, llm.model and llm.api_key".into(),
            )),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn explain_fallback(question: &str) -> String {
    format!(
        "Explain-only mode:\n\n\
         I can't call an LLM here, but the retrieved context is shown above.\n\
         Use it to answer the question manually, or enable an OpenAI-compatible endpoint.\n\n\
         Question:\n{question}"
    )
}

fn extract_content(body: &serde_json::Value) -> String {
    body.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| NO_CONTENT.to_string())
}
