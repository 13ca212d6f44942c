//! Configuration for the analyzer and its collaborators.
//!
//! Everything here is read once, validated, and then handed to the clients at
//! construction time. Values come from defaults, a TOML document, or the
//! process environment.

use crate::types::*;
use crate::utils::validate_range;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default OAuth endpoint for GigaChat access tokens
pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";

/// Default GigaChat REST base URL
pub const DEFAULT_BASE_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";

/// Scope for personal API access
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

/// Default local inference endpoint for the sentiment model
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "http://localhost:8080/predict";

/// Pretrained three-class Russian sentiment model
pub const DEFAULT_CLASSIFIER_MODEL: &str = "blanchefort/rubert-base-cased-sentiment";

/// Settings for the GigaChat generative service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GigaChatConfig {
    /// Base64 authorization key issued by the developer console
    pub credentials: SecureCredentials,
    pub scope: String,
    pub model: GigaChatModel,
    pub auth_url: String,
    pub base_url: String,
    /// Verify the service's TLS certificate chain
    pub verify_ssl_certs: bool,
    /// Sampling temperature applied to every completion
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for GigaChatConfig {
    fn default() -> Self {
        Self {
            credentials: SecureCredentials::new(""),
            scope: DEFAULT_SCOPE.to_string(),
            model: GigaChatModel::GigaChat2,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_ssl_certs: false,
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 120,
        }
    }
}

impl GigaChatConfig {
    /// Defaults plus the given credentials
    pub fn with_credentials(credentials: impl Into<String>) -> Self {
        Self {
            credentials: SecureCredentials::new(credentials),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> InsightResult<()> {
        if self.credentials.is_empty() {
            return Err(InsightError::MissingCredentials {
                location: Some(concat!(file!(), ":", line!()).to_string()),
            });
        }
        if self.scope.trim().is_empty() {
            return Err(InsightError::ConfigError("gigachat scope cannot be empty".into()));
        }
        validate_url(&self.auth_url, "gigachat auth_url")?;
        validate_url(&self.base_url, "gigachat base_url")?;
        validate_range(self.temperature, 0.0, 2.0, "temperature")?;
        if self.max_tokens == Some(0) {
            return Err(InsightError::ConfigError("max_tokens must be greater than 0".into()));
        }
        if self.timeout_secs == 0 {
            return Err(InsightError::ConfigError("gigachat timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Settings for the locally hosted sentiment classifier
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> InsightResult<()> {
        validate_url(&self.endpoint, "classifier endpoint")?;
        if self.timeout_secs == 0 {
            return Err(InsightError::ConfigError("classifier timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Top-level configuration, one section per collaborator
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub gigachat: GigaChatConfig,
    pub classifier: ClassifierConfig,
}

impl AnalyzerConfig {
    /// Parse a TOML document with `[gigachat]` and `[classifier]` tables
    pub fn from_toml_str(source: &str) -> InsightResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| InsightError::ConfigError(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> InsightResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            InsightError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Build from `GIGACHAT_*` and `SENTIMENT_*` environment variables
    pub fn from_env() -> InsightResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> InsightResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(credentials) = get("GIGACHAT_CREDENTIALS") {
            config.gigachat.credentials = SecureCredentials::new(credentials);
        }
        if let Some(scope) = get("GIGACHAT_SCOPE") {
            config.gigachat.scope = scope;
        }
        if let Some(model) = get("GIGACHAT_MODEL") {
            config.gigachat.model = parse_model(&model);
        }
        if let Some(url) = get("GIGACHAT_BASE_URL") {
            config.gigachat.base_url = url;
        }
        if let Some(url) = get("GIGACHAT_AUTH_URL") {
            config.gigachat.auth_url = url;
        }
        if let Some(flag) = get("GIGACHAT_VERIFY_SSL_CERTS") {
            config.gigachat.verify_ssl_certs = parse_bool(&flag, "GIGACHAT_VERIFY_SSL_CERTS")?;
        }
        if let Some(temperature) = get("GIGACHAT_TEMPERATURE") {
            config.gigachat.temperature = temperature.trim().parse().map_err(|_| {
                InsightError::ConfigError(format!("GIGACHAT_TEMPERATURE is not a number: {}", temperature))
            })?;
        }
        if let Some(endpoint) = get("SENTIMENT_ENDPOINT") {
            config.classifier.endpoint = endpoint;
        }
        if let Some(model) = get("SENTIMENT_MODEL") {
            config.classifier.model = model;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InsightResult<()> {
        self.gigachat.validate()?;
        self.classifier.validate()
    }
}

fn validate_url(value: &str, name: &str) -> InsightResult<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| InsightError::ConfigError(format!("{} is not a valid URL ({}): {}", name, e, value)))
}

fn parse_bool(value: &str, name: &str) -> InsightResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(InsightError::ConfigError(format!("{} is not a boolean: {}", name, other))),
    }
}

fn parse_model(value: &str) -> GigaChatModel {
    match value.trim() {
        "GigaChat" => GigaChatModel::GigaChat,
        "GigaChat-2" => GigaChatModel::GigaChat2,
        "GigaChat-2-Pro" => GigaChatModel::GigaChat2Pro,
        "GigaChat-2-Max" => GigaChatModel::GigaChat2Max,
        other => GigaChatModel::Custom(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn env_defaults_mirror_the_reference_deployment() {
        let config = AnalyzerConfig::from_lookup(lookup(&[("GIGACHAT_CREDENTIALS", "c2VjcmV0")])).unwrap();
        assert_eq!(config.gigachat.model, GigaChatModel::GigaChat2);
        assert_eq!(config.gigachat.temperature, 0.0);
        assert!(!config.gigachat.verify_ssl_certs);
        assert_eq!(config.gigachat.scope, DEFAULT_SCOPE);
        assert_eq!(config.classifier.model, DEFAULT_CLASSIFIER_MODEL);
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = AnalyzerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, InsightError::MissingCredentials { .. }));
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = AnalyzerConfig::from_lookup(lookup(&[
            ("GIGACHAT_CREDENTIALS", "c2VjcmV0"),
            ("GIGACHAT_MODEL", "GigaChat-2-Max"),
            ("GIGACHAT_VERIFY_SSL_CERTS", "true"),
            ("GIGACHAT_TEMPERATURE", "0.3"),
            ("SENTIMENT_ENDPOINT", "http://127.0.0.1:9000/predict"),
        ]))
        .unwrap();
        assert_eq!(config.gigachat.model, GigaChatModel::GigaChat2Max);
        assert!(config.gigachat.verify_ssl_certs);
        assert!((config.gigachat.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.classifier.endpoint, "http://127.0.0.1:9000/predict");
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = AnalyzerConfig::from_lookup(lookup(&[
            ("GIGACHAT_CREDENTIALS", "c2VjcmV0"),
            ("GIGACHAT_VERIFY_SSL_CERTS", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, InsightError::ConfigError(_)));

        let err = AnalyzerConfig::from_lookup(lookup(&[
            ("GIGACHAT_CREDENTIALS", "c2VjcmV0"),
            ("GIGACHAT_TEMPERATURE", "3.5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, InsightError::ValidationError(_)));
    }

    #[test]
    fn toml_sections_are_parsed() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            [gigachat]
            credentials = "c2VjcmV0"
            model = "GigaChat-2-Pro"
            verify_ssl_certs = true

            [classifier]
            endpoint = "http://localhost:7000/predict"
            "#,
        )
        .unwrap();
        assert_eq!(config.gigachat.model, GigaChatModel::GigaChat2Pro);
        assert!(config.gigachat.verify_ssl_certs);
        assert_eq!(config.gigachat.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.classifier.endpoint, "http://localhost:7000/predict");
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let mut config = GigaChatConfig::with_credentials("c2VjcmV0");
        config.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(InsightError::ConfigError(_))));
    }

    #[test]
    fn credentials_are_redacted_in_debug_output() {
        let config = GigaChatConfig::with_credentials("super-secret-key");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret-key"));
        assert!(printed.contains("REDACTED"));
    }
}
