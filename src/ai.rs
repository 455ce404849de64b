//! Language model client abstraction and implementations.
//!
//! Defines the [`ChatModel`] trait and two implementations:
//! - **[`DisabledChat`]**: always errors. Used when `ai.provider = "disabled"`
//!   or when no API key is available, so every request takes the fallback path.
//! - **[`OpenAiChat`]**: calls an OpenAI-compatible `chat/completions`
//!   endpoint with a request timeout and optional retry with backoff.
//!
//! # Provider Selection
//!
//! Use [`create_chat_model`] to build the model described by the config:
//!
//! ```rust
//! # use handbook_assistant::config::AiConfig;
//! # use handbook_assistant::ai::create_chat_model;
//! let mut config = AiConfig::default();
//! config.provider = "disabled".to_string();
//! let model = create_chat_model(&config).unwrap();
//! assert!(!model.is_configured());
//! ```
//!
//! # Retry Strategy
//!
//! - HTTP 429 and 5xx → retry
//! - other HTTP 4xx → fail immediately
//! - network errors and timeouts → retry
//! - backoff: 1s, 2s, 4s, ... (capped at 2^5)
//!
//! With the default `max_retries = 0` a failed call surfaces immediately and
//! the chat service answers from the fallback generator.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::AiConfig;
use crate::models::ChatMessage;

/// A remote language model that turns a message list into a reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider label reported in chat replies (e.g. `"openai"`).
    fn provider(&self) -> &str;
    /// Model identifier (e.g. `"gpt-4o"`).
    fn model(&self) -> &str;
    /// Whether the model can be called at all. Reported by the health check.
    fn is_configured(&self) -> bool {
        true
    }
    /// Generate the assistant reply for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ============ Disabled Model ============

/// A model that refuses every request.
pub struct DisabledChat {
    provider: String,
    model: String,
    reason: String,
}

impl DisabledChat {
    pub fn new(provider: &str, model: &str, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ChatModel for DisabledChat {
    fn provider(&self) -> &str {
        &self.provider
    }
    fn model(&self) -> &str {
        &self.model
    }
    fn is_configured(&self) -> bool {
        false
    }
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("AI service unavailable: {}", self.reason)
    }
}

// ============ OpenAI Model ============

/// Chat model backed by an OpenAI-compatible API.
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    max_retries: u32,
}

impl OpenAiChat {
    /// Build a client reading the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is unset or empty.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            bail!("{} environment variable not set", config.api_key_env);
        }
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: &AiConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn provider(&self) -> &str {
        "openai"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, "retrying chat completion");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!(
                            "Chat API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("Chat API error {}: {}", status, body_text);
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(anyhow::anyhow!("Chat API request timed out: {}", e));
                }
                Err(e) => {
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

/// Extract `choices[0].message.content`.
///
/// A response without choices is an error. A choice without content (for
/// example a refusal) yields an empty reply.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing choices"))?;

    Ok(choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

/// Create the [`ChatModel`] described by `config`.
///
/// | `provider` | Model |
/// |------------|-------|
/// | `"disabled"` | [`DisabledChat`] |
/// | `"openai"` | [`OpenAiChat`], or [`DisabledChat`] when the key is missing |
///
/// A missing key is not fatal: the server still answers from the fallback
/// generator and reports `not_configured` in its health check.
pub fn create_chat_model(config: &AiConfig) -> Result<Box<dyn ChatModel>> {
    if !config.is_enabled() {
        return Ok(Box::new(DisabledChat::new(
            "disabled",
            &config.model,
            "provider is disabled",
        )));
    }
    match config.provider.as_str() {
        "openai" => match OpenAiChat::new(config) {
            Ok(model) => Ok(Box::new(model)),
            Err(e) => {
                tracing::warn!(error = %e, "OpenAI client not configured, answering from fallback only");
                Ok(Box::new(DisabledChat::new("openai", &config.model, e.to_string())))
            }
        },
        other => bail!("Unknown ai provider: {}", other),
    }
}
