//! LLM provider abstractions for digitalcheck-runtime.
//!
//! A provider is one transport family (OpenAI-compatible chat completions,
//! Anthropic messages, ...). Providers are created from JSON settings by a
//! [`ProviderFactory`] and bound to model identifiers by the
//! [`ModelRegistry`](crate::registry::ModelRegistry).
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod scripted;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;
#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use scripted::ScriptedProvider;
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};
#[cfg(feature = "openai")]
pub use openai::{DeepInfraProviderFactory, OpenAiCompatibleProvider, OpenAiProviderFactory};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether this error stems from local configuration rather than
    /// the remote service.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::NotConfigured(_))
    }
}

/// Whether the provider is asked to constrain its reply to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    StructuredJson,
    Freeform,
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseMode::StructuredJson => write!(f, "structured-json"),
            ResponseMode::Freeform => write!(f, "freeform"),
        }
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Transport deadline for the request
    pub timeout: Duration,

    pub response_mode: ResponseMode,
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            response_mode: ResponseMode::Freeform,
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model that answered, as reported by the provider
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Usage with the total derived from input and output.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// This is the only place where outbound model calls are made. One call to
/// [`complete`](LlmProvider::complete) is one attempt; there is no retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Provider family name for logs.
    fn name(&self) -> &str;

    /// Whether the transport can request JSON-constrained replies.
    fn supports_structured_output(&self) -> bool {
        false
    }

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // ~4 chars per token
        (text.len() / 4) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("Du bist Gesetzesredakteur.");
        assert_eq!(system.role, "system");

        let user = ChatMessage::user("Hallo!");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);

        let huge = TokenUsage::new(u32::MAX, 1);
        assert_eq!(huge.total_tokens, u32::MAX);
    }

    #[test]
    fn test_response_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResponseMode::StructuredJson).unwrap(),
            "\"structured-json\""
        );
        assert_eq!(ResponseMode::Freeform.to_string(), "freeform");
    }

    #[test]
    fn test_completion_config_defaults() {
        let config = CompletionConfig::new("gpt-4o");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.response_mode, ResponseMode::Freeform);
    }
}
