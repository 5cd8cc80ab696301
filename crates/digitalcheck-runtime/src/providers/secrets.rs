//! Credential handling for LLM providers.
//!
//! Every provider stores its API key as an [`ApiCredential`]:
//!
//! - `Debug` and `Display` print `[REDACTED]`
//! - the value lives in a `secrecy::SecretString` and is zeroed on drop
//! - the key is only reachable through an explicit [`ApiCredential::expose`]
//!
//! ## Resolution Order
//!
//! 1. `api_key` in the provider settings
//! 2. the environment variable named by `api_key_env` in the settings
//! 3. the provider's default environment variables, first one set wins

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Settings key holding an inline API key.
pub const API_KEY_SETTING: &str = "api_key";

/// Settings key naming an environment variable to read the key from.
pub const API_KEY_ENV_SETTING: &str = "api_key_env";

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from provider settings
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Resolve a credential from provider settings and the environment.
    ///
    /// # Arguments
    /// * `settings` - Provider settings JSON
    /// * `default_env` - Environment variables tried in order
    /// * `name` - Human-readable name for error messages (e.g., "OpenAI API key")
    pub fn resolve(
        settings: &JsonValue,
        default_env: &[&str],
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        let credential = if let Some(value) = settings[API_KEY_SETTING].as_str() {
            Self::new(value, CredentialSource::Config, name)
        } else if let Some(var) = settings[API_KEY_ENV_SETTING].as_str() {
            std::env::var(var)
                .map(|v| Self::new(v, CredentialSource::Environment, name))
                .map_err(|_| {
                    ProviderError::NotConfigured(format!(
                        "{} not set: configure '{}' environment variable",
                        name, var
                    ))
                })?
        } else {
            default_env
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .map(|v| Self::new(v, CredentialSource::Environment, name))
                .ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "{} required: set '{}' in settings or one of {:?}",
                        name, API_KEY_SETTING, default_env
                    ))
                })?
        };

        if credential.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} is empty ({})",
                name, credential.source
            )));
        }
        Ok(credential)
    }

    /// Check whether [`resolve`](Self::resolve) would find a credential.
    pub fn is_available(settings: &JsonValue, default_env: &[&str]) -> bool {
        if settings[API_KEY_SETTING].as_str().is_some() {
            return true;
        }
        if let Some(var) = settings[API_KEY_ENV_SETTING].as_str() {
            return std::env::var(var).is_ok();
        }
        default_env.iter().any(|var| std::env::var(var).is_ok())
    }

    /// Expose the credential value at the point of use (e.g. a header).
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug_and_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Test API key from config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("sk-1", CredentialSource::Programmatic, "Test");
        assert_eq!(cred.expose(), "sk-1");
        assert!(!cred.is_empty());
    }

    #[test]
    fn test_resolve_rejects_blank_key() {
        let settings = serde_json::json!({ "api_key": "" });
        let err = ApiCredential::resolve(&settings, &[], "Test API key").unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_resolve_prefers_settings() {
        std::env::set_var("DC_TEST_KEY_PRIORITY", "env-key");
        let settings = serde_json::json!({ "api_key": "config-key" });

        let cred = ApiCredential::resolve(&settings, &["DC_TEST_KEY_PRIORITY"], "Test key").unwrap();
        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);

        std::env::remove_var("DC_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_resolve_env_override() {
        std::env::set_var("DC_TEST_KEY_OVERRIDE", "override-key");
        let settings = serde_json::json!({ "api_key_env": "DC_TEST_KEY_OVERRIDE" });

        let cred = ApiCredential::resolve(&settings, &["DC_TEST_NOT_SET_1"], "Test key").unwrap();
        assert_eq!(cred.expose(), "override-key");
        assert_eq!(cred.source(), CredentialSource::Environment);

        std::env::remove_var("DC_TEST_KEY_OVERRIDE");

        let missing = serde_json::json!({ "api_key_env": "DC_TEST_NOT_SET_2" });
        assert!(ApiCredential::resolve(&missing, &[], "Test key").is_err());
    }

    #[test]
    fn test_resolve_falls_back_through_defaults() {
        std::env::set_var("DC_TEST_KEY_SECOND", "second");
        let cred = ApiCredential::resolve(
            &serde_json::json!({}),
            &["DC_TEST_NOT_SET_3", "DC_TEST_KEY_SECOND"],
            "Test key",
        )
        .unwrap();
        assert_eq!(cred.expose(), "second");
        std::env::remove_var("DC_TEST_KEY_SECOND");
    }

    #[test]
    fn test_resolve_error_names_sources() {
        let err = ApiCredential::resolve(&serde_json::json!({}), &["DC_TEST_NOT_SET_4"], "Test key")
            .unwrap_err();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("Test key"));
        assert!(msg.contains("api_key"));
        assert!(msg.contains("DC_TEST_NOT_SET_4"));
    }

    #[test]
    fn test_is_available() {
        assert!(ApiCredential::is_available(
            &serde_json::json!({ "api_key": "v" }),
            &[]
        ));
        assert!(!ApiCredential::is_available(
            &serde_json::json!({}),
            &["DC_TEST_NOT_SET_5"]
        ));
    }
}
