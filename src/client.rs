// GigaChat Client Implementation

use crate::types::*;
use crate::request_error;
use crate::builder::CompletionBuilder;
use crate::config::GigaChatConfig;
use crate::service::TextGenerator;
use crate::utils::validate_range;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, header};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Tokens are refreshed this long before their advertised expiry
const TOKEN_REFRESH_MARGIN_MS: u64 = 60_000;

/// Configuration for TLS
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub min_tls_version: Option<reqwest::tls::Version>,
    pub cert_verification: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_tls_version: Some(reqwest::tls::Version::TLS_1_2),
            cert_verification: true,
        }
    }
}

impl TlsConfig {
    /// Default TLS settings with certificate verification switched on or off
    pub fn with_cert_verification(cert_verification: bool) -> Self {
        Self {
            cert_verification,
            ..Self::default()
        }
    }
}

/// Build an HTTP client with JSON defaults and the given TLS policy
pub(crate) fn build_http_client(tls_config: &TlsConfig, timeout: Duration) -> InsightResult<HttpClient> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    let mut builder = HttpClient::builder()
        .default_headers(headers)
        .timeout(timeout)
        .danger_accept_invalid_certs(!tls_config.cert_verification);

    if let Some(version) = tls_config.min_tls_version {
        builder = builder.min_tls_version(version);
    }

    builder.build().map_err(|e| request_error!("Failed to create HTTP client", e.to_string(), e))
}

/// Map non-success statuses onto the error taxonomy
pub(crate) async fn handle_error_response(response: reqwest::Response) -> InsightResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    let sanitized_error = sanitize_error_message(&error_text);

    match status {
        401 => Err(InsightError::unauthorized(sanitized_error, Some(concat!(file!(), ":", line!())))),
        429 => {
            let retry_after = headers
                .get(header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            Err(InsightError::rate_limited(retry_after))
        }
        _ => Err(InsightError::api_error(
            sanitized_error.clone(),
            Some(status),
            Some(sanitized_error),
            Some(concat!(file!(), ":", line!()))
        )),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Client for the GigaChat chat-completions API.
///
/// Cloning is cheap and clones share the cached access token.
#[derive(Clone)]
pub struct GigaChat {
    pub(crate) http_client: HttpClient,
    pub(crate) credentials: SecureCredentials,
    pub scope: String,
    pub auth_url: String,
    pub base_url: String,
    pub default_model: GigaChatModel,
    pub default_temperature: Option<f32>,
    pub default_max_tokens: Option<u32>,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl GigaChat {
    /// Create a client with default settings and the given authorization key
    pub fn new(credentials: impl Into<String>) -> InsightResult<Self> {
        Self::from_config(&GigaChatConfig::with_credentials(credentials))
    }

    /// Create a client from validated configuration
    pub fn from_config(config: &GigaChatConfig) -> InsightResult<Self> {
        config.validate()?;

        let tls_config = TlsConfig::with_cert_verification(config.verify_ssl_certs);
        let http_client = build_http_client(&tls_config, config.timeout())?;

        Ok(Self {
            http_client,
            credentials: config.credentials.clone(),
            scope: config.scope.clone(),
            auth_url: config.auth_url.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.model.clone(),
            default_temperature: Some(config.temperature),
            default_max_tokens: config.max_tokens,
            token: Arc::new(Mutex::new(None)),
        })
    }

    /// Set a default model to use for requests
    pub fn with_model(mut self, model: GigaChatModel) -> Self {
        self.default_model = model;
        self
    }

    /// Point the client at another API base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Point the client at another OAuth endpoint
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the sampling temperature used when a request doesn't set one
    pub fn with_temperature(mut self, temperature: f32) -> InsightResult<Self> {
        self.default_temperature = Some(validate_range(temperature, 0.0, 2.0, "temperature")?);
        Ok(self)
    }

    /// Set a default max_tokens value for all requests
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> InsightResult<Self> {
        if max_tokens == 0 {
            return Err(InsightError::ValidationError("max_tokens must be greater than 0".into()));
        }
        self.default_max_tokens = Some(max_tokens);
        Ok(self)
    }

    /// Start building a chat-completion request
    pub fn completion(&self) -> CompletionBuilder {
        CompletionBuilder::from_client(Arc::new(self.clone()))
    }

    /// Return a valid access token, exchanging credentials when the cached one is missing or stale
    pub async fn access_token(&self) -> InsightResult<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > now_millis() + TOKEN_REFRESH_MARGIN_MS {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Drop the cached token so the next request re-authenticates
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    #[instrument(skip(self), fields(scope = %self.scope))]
    async fn request_token(&self) -> InsightResult<AccessToken> {
        debug!("requesting GigaChat access token");

        let response = self.http_client
            .post(&self.auth_url)
            .header(header::AUTHORIZATION, format!("Basic {}", self.credentials.as_str()))
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await?;

        let response = handle_error_response(response).await?;

        response.json::<AccessToken>().await.map_err(|e| InsightError::parse_error(
            "Failed to parse access token response",
            None,
            Some(e),
            Some(concat!(file!(), ":", line!()))
        ))
    }
}

#[async_trait]
impl TextGenerator for GigaChat {
    #[instrument(skip(self, prompt), fields(model = %self.default_model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        let response = self.completion().user_message(prompt)?.send().await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }

        response
            .first_text()
            .map(str::to_string)
            .ok_or(InsightError::EmptyCompletion)
    }
}
