//! Model gateway: the single dispatch point for outbound model calls.
//!
//! The gateway resolves a model selector against the [`ModelRegistry`],
//! sends one request and hands back the raw reply with its usage. Transport
//! failures are returned as [`GatewayError::Dispatch`] values; nothing is
//! retried.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{CompletionSettings, RuntimeConfig};
use crate::providers::{ChatMessage, ProviderError, ProviderRegistry, ResponseMode, TokenUsage};
use crate::registry::{ModelHandle, ModelRegistry};

/// Errors from the model gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unknown model '{model}'. Available: {available:?}")]
    UnknownModel {
        model: String,
        available: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Call to '{model}' failed: {source}")]
    Dispatch {
        model: String,
        #[source]
        source: ProviderError,
    },
}

impl GatewayError {
    /// Configuration errors are raised before any network attempt.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, GatewayError::Dispatch { .. })
    }
}

/// Raw reply from one model call.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: String,
    pub usage: TokenUsage,

    /// Model that answered, as reported by the provider
    pub model: String,

    /// Mode the request was sent in; decides how strictly to parse
    pub mode: ResponseMode,
}

/// Dispatches prompts to registered models.
#[derive(Debug, Clone)]
pub struct ModelGateway {
    registry: Arc<ModelRegistry>,
    completion: CompletionSettings,
}

impl ModelGateway {
    pub fn new(registry: Arc<ModelRegistry>, completion: CompletionSettings) -> Self {
        Self {
            registry,
            completion,
        }
    }

    /// Build a gateway with every configured model registered.
    pub fn from_config(
        config: &RuntimeConfig,
        providers: &ProviderRegistry,
    ) -> Result<Self, GatewayError> {
        let registry = ModelRegistry::from_specs(&config.models, providers)?;
        Ok(Self::new(Arc::new(registry), config.completion.clone()))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Resolve a model selector without sending anything.
    pub fn check(&self, model: &str) -> Result<&ModelHandle, GatewayError> {
        self.registry.resolve(model)
    }

    /// Send `prompt` as a single user message to `model`.
    ///
    /// `structured` asks for a JSON-constrained reply; it only takes effect
    /// when the model is configured for it and its provider supports it.
    pub async fn dispatch(
        &self,
        model: &str,
        prompt: &str,
        structured: bool,
    ) -> Result<ModelReply, GatewayError> {
        let handle = self.check(model)?;
        let mode = if structured {
            handle.response_mode()
        } else {
            ResponseMode::Freeform
        };
        let config = self.completion.to_completion_config(&handle.id, mode);

        tracing::debug!(
            model = %handle.id,
            provider = %handle.provider.name(),
            mode = %mode,
            prompt_chars = prompt.len(),
            "Dispatching prompt"
        );

        let response = handle
            .provider
            .complete(vec![ChatMessage::user(prompt)], &config)
            .await
            .map_err(|source| {
                tracing::warn!(model = %handle.id, error = %source, "Model call failed");
                GatewayError::Dispatch {
                    model: handle.id.clone(),
                    source,
                }
            })?;

        tracing::info!(
            model = %handle.id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total_tokens,
            "Model call completed"
        );

        Ok(ModelReply {
            content: response.content,
            usage: response.usage,
            model: response.model,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;

    fn gateway_with(provider: Arc<ScriptedProvider>, structured: bool) -> ModelGateway {
        let mut registry = ModelRegistry::new();
        registry.register(ModelHandle::new("test-model", provider, structured));
        ModelGateway::new(Arc::new(registry), CompletionSettings::default())
    }

    #[tokio::test]
    async fn test_dispatch_returns_reply_and_usage() {
        let provider = Arc::new(ScriptedProvider::new().structured().reply("{}"));
        let gateway = gateway_with(provider.clone(), true);

        let reply = gateway.dispatch("test-model", "Prüfe den Text", true).await.unwrap();

        assert_eq!(reply.content, "{}");
        assert_eq!(reply.mode, ResponseMode::StructuredJson);
        assert_eq!(reply.model, "test-model");
        assert!(reply.usage.total_tokens >= reply.usage.input_tokens);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, vec![ChatMessage::user("Prüfe den Text")]);
        assert_eq!(requests[0].response_mode, ResponseMode::StructuredJson);
    }

    #[tokio::test]
    async fn test_unknown_model_never_dispatches() {
        let provider = Arc::new(ScriptedProvider::new().reply("{}"));
        let gateway = gateway_with(provider.clone(), false);

        let err = gateway.dispatch("other-model", "x", true).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_tagged() {
        let provider = Arc::new(ScriptedProvider::new().fail("connection refused"));
        let gateway = gateway_with(provider.clone(), false);

        match gateway.dispatch("test-model", "x", true).await {
            Err(GatewayError::Dispatch { model, source }) => {
                assert_eq!(model, "test-model");
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("Expected Dispatch error, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_freeform_request_overrides_structured_model() {
        let provider = Arc::new(ScriptedProvider::new().structured().reply("(1) Text"));
        let gateway = gateway_with(provider.clone(), true);

        let reply = gateway.dispatch("test-model", "Überarbeite", false).await.unwrap();

        assert_eq!(reply.mode, ResponseMode::Freeform);
        assert_eq!(provider.requests()[0].response_mode, ResponseMode::Freeform);
    }
}
