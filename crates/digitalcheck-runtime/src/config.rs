//! Runtime configuration.
//!
//! Loaded from YAML or JSON and passed explicitly into the pipeline.
//!
//! ```yaml
//! models:
//!   - id: gpt-4o
//!     provider: openai
//!     structured_output: true
//!   - id: meta-llama/Llama-3.3-70B-Instruct
//!     provider: deepinfra
//!     settings:
//!       api_key_env: MY_DEEPINFRA_KEY
//! completion:
//!   max_tokens: 4096
//!   temperature: 0.0
//!   timeout: 2m
//! verify_quotes: false
//! catalog: ./catalog.yaml
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use digitalcheck_core::{Catalog, CatalogError};

use crate::providers::{CompletionConfig, ResponseMode};

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// One selectable model and the provider family serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier sent to the provider, e.g. "gpt-4o"
    pub id: String,

    /// Provider family: "openai", "deepinfra", "anthropic"
    pub provider: String,

    /// Request JSON-constrained replies when the provider supports it
    #[serde(default)]
    pub structured_output: bool,

    /// Provider-specific settings (api_key, api_key_env, base_url)
    #[serde(default = "empty_settings")]
    pub settings: JsonValue,
}

fn empty_settings() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, provider: impl Into<String>, structured_output: bool) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            structured_output,
            settings: empty_settings(),
        }
    }
}

/// Per-request completion parameters shared by every model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,

    /// Transport deadline, e.g. "90s" or "2m"
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }
}

impl CompletionSettings {
    /// Build the provider request configuration for one call.
    pub fn to_completion_config(&self, model: &str, mode: ResponseMode) -> CompletionConfig {
        CompletionConfig {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            response_mode: mode,
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Configuration for a pipeline runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Selectable models
    pub models: Vec<ModelSpec>,

    pub completion: CompletionSettings,

    /// Check quoted passages against the law text
    pub verify_quotes: bool,

    /// Alternative principle catalog (YAML); the built-in catalog otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            models: vec![
                ModelSpec::new("meta-llama/Llama-3.3-70B-Instruct", "deepinfra", false),
                ModelSpec::new("gpt-4o", "openai", true),
                ModelSpec::new("gpt-4o-mini", "openai", true),
                ModelSpec::new("claude-sonnet-4-5", "anthropic", false),
            ],
            completion: CompletionSettings::default(),
            verify_quotes: false,
            catalog: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading runtime config");

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// The configured catalog, or the built-in Digitalcheck catalog.
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.catalog {
            Some(path) => Ok(Catalog::from_yaml_file(path)?),
            None => Ok(Catalog::digitalcheck()),
        }
    }

    pub fn model(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        let config = RuntimeConfig::default();
        assert_eq!(config.models.len(), 4);
        assert_eq!(
            config.model("meta-llama/Llama-3.3-70B-Instruct").unwrap().provider,
            "deepinfra"
        );
        assert!(config.model("gpt-4o").unwrap().structured_output);
        assert!(!config.model("claude-sonnet-4-5").unwrap().structured_output);
        assert!(!config.verify_quotes);
    }

    #[test]
    fn test_from_yaml_with_humantime_timeout() {
        let yaml = r#"
models:
  - id: gpt-4o
    provider: openai
    structured_output: true
    settings:
      api_key_env: MY_KEY
completion:
  timeout: 90s
verify_quotes: true
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].settings["api_key_env"], "MY_KEY");
        assert_eq!(config.completion.timeout, Duration::from_secs(90));
        assert_eq!(config.completion.max_tokens, 4096);
        assert!(config.verify_quotes);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_from_json_defaults_missing_sections() {
        let config = RuntimeConfig::from_json(
            r#"{ "models": [ { "id": "x", "provider": "deepinfra" } ] }"#,
        )
        .unwrap();

        assert!(!config.models[0].structured_output);
        assert!(config.models[0].settings.is_object());
        assert_eq!(config.completion, CompletionSettings::default());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = RuntimeConfig::from_yaml("completion:\n  timeout: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_completion_config_carries_mode() {
        let completion = CompletionSettings::default();
        let config = completion.to_completion_config("gpt-4o", ResponseMode::StructuredJson);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.response_mode, ResponseMode::StructuredJson);
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_load_builtin_catalog() {
        let catalog = RuntimeConfig::default().load_catalog().unwrap();
        assert_eq!(catalog.categories().len(), 5);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_timeout_readable() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default()).unwrap();
        assert!(yaml.contains("timeout: 2m"));
        assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap(), RuntimeConfig::default());
    }
}
