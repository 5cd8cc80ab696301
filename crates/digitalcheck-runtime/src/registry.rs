//! Model registry: model identifier to provider handle.
//!
//! Built once at startup from [`ModelSpec`]s and shared read-only by every
//! pipeline run. Missing credentials and unknown provider families surface
//! here, before any request is sent.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ModelSpec;
use crate::gateway::GatewayError;
use crate::providers::{LlmProvider, ProviderRegistry, ResponseMode};

/// A model bound to the provider that serves it.
#[derive(Clone)]
pub struct ModelHandle {
    pub id: String,
    pub provider: Arc<dyn LlmProvider>,

    /// Configured wish for JSON-constrained replies
    pub structured_output: bool,
}

impl ModelHandle {
    pub fn new(id: impl Into<String>, provider: Arc<dyn LlmProvider>, structured_output: bool) -> Self {
        Self {
            id: id.into(),
            provider,
            structured_output,
        }
    }

    /// Structured mode only when configured and the provider can honour it.
    pub fn response_mode(&self) -> ResponseMode {
        if self.structured_output && self.provider.supports_structured_output() {
            ResponseMode::StructuredJson
        } else {
            ResponseMode::Freeform
        }
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("mode", &self.response_mode())
            .finish()
    }
}

/// Immutable lookup table of selectable models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelHandle>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any handle with the same id.
    pub fn register(&mut self, handle: ModelHandle) {
        self.models.insert(handle.id.clone(), handle);
    }

    /// Build a registry, creating one provider per model spec.
    ///
    /// Fails on the first spec whose provider cannot be created (unknown
    /// family, missing credential, malformed settings) or whose id repeats.
    pub fn from_specs(
        specs: &[ModelSpec],
        providers: &ProviderRegistry,
    ) -> Result<Self, GatewayError> {
        let mut registry = Self::new();
        for spec in specs {
            if registry.models.contains_key(&spec.id) {
                return Err(GatewayError::Configuration(format!(
                    "model '{}' is configured twice",
                    spec.id
                )));
            }

            let provider = providers
                .create(&spec.provider, &spec.settings)
                .map_err(|e| {
                    GatewayError::Configuration(format!("model '{}': {}", spec.id, e))
                })?;

            tracing::debug!(
                model = %spec.id,
                provider = %spec.provider,
                structured = spec.structured_output,
                "Registered model"
            );
            registry.register(ModelHandle::new(&spec.id, provider, spec.structured_output));
        }
        Ok(registry)
    }

    /// Look up a model by identifier.
    pub fn resolve(&self, id: &str) -> Result<&ModelHandle, GatewayError> {
        self.models.get(id).ok_or_else(|| GatewayError::UnknownModel {
            model: id.to_string(),
            available: self.ids().map(str::to_string).collect(),
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn handles(&self) -> impl Iterator<Item = &ModelHandle> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderFactory, ScriptedProvider};
    use serde_json::Value as JsonValue;

    struct ScriptedFactory {
        structured: bool,
    }

    impl ProviderFactory for ScriptedFactory {
        fn provider_type(&self) -> &'static str {
            "scripted"
        }

        fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            self.validate_config(settings)?;
            let provider = ScriptedProvider::new();
            Ok(Arc::new(if self.structured {
                provider.structured()
            } else {
                provider
            }))
        }

        fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError> {
            if settings["api_key"].as_str().is_none() {
                return Err(ProviderError::NotConfigured("api_key missing".to_string()));
            }
            Ok(())
        }
    }

    fn providers(structured: bool) -> ProviderRegistry {
        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(ScriptedFactory { structured }));
        providers
    }

    fn spec(id: &str, structured: bool) -> ModelSpec {
        let mut spec = ModelSpec::new(id, "scripted", structured);
        spec.settings = serde_json::json!({ "api_key": "k" });
        spec
    }

    #[test]
    fn test_from_specs_and_resolve() {
        let registry =
            ModelRegistry::from_specs(&[spec("a", false), spec("b", true)], &providers(true))
                .unwrap();

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.resolve("a").unwrap().response_mode(), ResponseMode::Freeform);
        assert_eq!(
            registry.resolve("b").unwrap().response_mode(),
            ResponseMode::StructuredJson
        );
    }

    #[test]
    fn test_structured_requires_provider_support() {
        let registry = ModelRegistry::from_specs(&[spec("b", true)], &providers(false)).unwrap();
        assert_eq!(registry.resolve("b").unwrap().response_mode(), ResponseMode::Freeform);
    }

    #[test]
    fn test_unknown_model_lists_available() {
        let registry = ModelRegistry::from_specs(&[spec("a", false)], &providers(false)).unwrap();

        match registry.resolve("gpt-5") {
            Err(GatewayError::UnknownModel { model, available }) => {
                assert_eq!(model, "gpt-5");
                assert_eq!(available, vec!["a".to_string()]);
            }
            other => panic!("Expected UnknownModel, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_credential_fails_at_build() {
        let mut bad = spec("a", false);
        bad.settings = serde_json::json!({});

        let err = ModelRegistry::from_specs(&[bad], &providers(false)).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(err.to_string().contains("api_key missing"));
    }

    #[test]
    fn test_unknown_family_and_duplicates_rejected() {
        let mut unknown = spec("a", false);
        unknown.provider = "nope".to_string();
        assert!(ModelRegistry::from_specs(&[unknown], &providers(false)).is_err());

        assert!(
            ModelRegistry::from_specs(&[spec("a", false), spec("a", true)], &providers(false))
                .is_err()
        );
    }
}
