//! OpenAI-compatible chat completions transport.
//!
//! Serves both OpenAI itself and DeepInfra's OpenAI-compatible endpoint.
//! In structured mode the request carries
//! `response_format: {"type": "json_object"}`.

use super::{
    factory::{validate_base_url, ProviderFactory},
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, ResponseMode,
    TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEEPINFRA_API_KEY_ENV: &str = "DEEPINFRA_API_KEY";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEEPINFRA_BASE_URL: &str = "https://api.deepinfra.com/v1/openai";

/// Provider speaking the `/chat/completions` protocol.
pub struct OpenAiCompatibleProvider {
    family: &'static str,
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("family", &self.family)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `family` with an explicit API key.
    pub fn new(family: &'static str, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_credential(
            family,
            ApiCredential::new(api_key, CredentialSource::Programmatic, "API key"),
            base_url,
        )
    }

    fn with_credential(
        family: &'static str,
        credential: ApiCredential,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            family,
            credential,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn from_settings(
        family: &'static str,
        settings: &JsonValue,
        default_env: &[&str],
        credential_name: &'static str,
        default_base_url: &str,
    ) -> Result<Self, ProviderError> {
        validate_base_url(settings)?;
        let credential = ApiCredential::resolve(settings, default_env, credential_name)?;
        let base_url = settings["base_url"].as_str().unwrap_or(default_base_url);
        Ok(Self::with_credential(family, credential, base_url))
    }

    fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> ChatRequest {
        ChatRequest {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            response_format: match config.response_mode {
                ResponseMode::StructuredJson => Some(ResponseFormat {
                    type_: "json_object".to_string(),
                }),
                ResponseMode::Freeform => None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = Self::build_request(messages, config);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: body.model.unwrap_or_else(|| config.model.clone()),
            stop_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        self.family
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}

/// Factory for OpenAI.
///
/// ## Settings
/// ```json
/// {
///   "api_key": "sk-...",          // Optional, falls back to OPENAI_API_KEY
///   "api_key_env": "MY_KEY",      // Optional, read the key from this variable instead
///   "base_url": "https://..."     // Optional
/// }
/// ```
pub struct OpenAiProviderFactory;

impl ProviderFactory for OpenAiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openai"
    }

    fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = OpenAiCompatibleProvider::from_settings(
            "openai",
            settings,
            &[OPENAI_API_KEY_ENV],
            "OpenAI API key",
            OPENAI_BASE_URL,
        )?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError> {
        validate_base_url(settings)?;
        if !ApiCredential::is_available(settings, &[OPENAI_API_KEY_ENV]) {
            return Err(ProviderError::NotConfigured(format!(
                "OpenAI API key required: set 'api_key' in settings or {} env",
                OPENAI_API_KEY_ENV
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "OpenAI chat completions with JSON mode"
    }
}

/// Factory for DeepInfra's OpenAI-compatible endpoint.
///
/// The key is read from `DEEPINFRA_API_KEY`, then `OPENAI_API_KEY`.
pub struct DeepInfraProviderFactory;

impl ProviderFactory for DeepInfraProviderFactory {
    fn provider_type(&self) -> &'static str {
        "deepinfra"
    }

    fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = OpenAiCompatibleProvider::from_settings(
            "deepinfra",
            settings,
            &[DEEPINFRA_API_KEY_ENV, OPENAI_API_KEY_ENV],
            "DeepInfra API key",
            DEEPINFRA_BASE_URL,
        )?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError> {
        validate_base_url(settings)?;
        if !ApiCredential::is_available(settings, &[DEEPINFRA_API_KEY_ENV, OPENAI_API_KEY_ENV]) {
            return Err(ProviderError::NotConfigured(format!(
                "DeepInfra API key required: set 'api_key' in settings or {} env",
                DEEPINFRA_API_KEY_ENV
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "DeepInfra open-weight models via the OpenAI protocol"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_request_sets_json_object() {
        let mut config = CompletionConfig::new("gpt-4o");
        config.response_mode = ResponseMode::StructuredJson;

        let request =
            OpenAiCompatibleProvider::build_request(vec![ChatMessage::user("Text")], &config);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn test_freeform_request_omits_response_format() {
        let config = CompletionConfig::new("meta-llama/Llama-3.3-70B-Instruct");
        let request =
            OpenAiCompatibleProvider::build_request(vec![ChatMessage::user("Text")], &config);
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_factory_uses_settings_key_and_base_url() {
        let settings = serde_json::json!({
            "api_key": "sk-test",
            "base_url": "http://localhost:8080/v1/"
        });
        let provider = DeepInfraProviderFactory.create(&settings).unwrap();
        assert_eq!(provider.name(), "deepinfra");
        assert!(provider.supports_structured_output());
    }

    #[test]
    fn test_factory_rejects_bad_base_url() {
        let settings = serde_json::json!({ "api_key": "sk-test", "base_url": "localhost" });
        assert!(OpenAiProviderFactory.create(&settings).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = OpenAiCompatibleProvider::new("openai", "sk-very-secret", OPENAI_BASE_URL);
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-very-secret"));
    }
}
