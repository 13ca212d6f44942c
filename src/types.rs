// Core types and errors

use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::time::Duration;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// The result type used throughout the crate
pub type InsightResult<T> = Result<T, InsightError>;

/// Convert reqwest::Error to our InsightError
impl From<reqwest::Error> for InsightError {
    fn from(err: reqwest::Error) -> Self {
        InsightError::RequestError {
            message: err.to_string(),
            details: None,
            location: None,
            source: Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>),
        }
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::ParseError {
            message: err.to_string(),
            source_text: None,
            location: None,
            source: Some(Arc::new(err) as Arc<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// A secure container for service credentials that zeroes its memory when dropped
pub struct SecureCredentials {
    key: String,
}

impl SecureCredentials {
    /// Wrap a credential string
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Get a reference to the underlying credential
    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.trim().is_empty()
    }
}

impl Deref for SecureCredentials {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.key
    }
}

impl Drop for SecureCredentials {
    fn drop(&mut self) {
        // Overwrite the string with zeros to remove sensitive data from memory
        unsafe {
            let bytes = self.key.as_bytes_mut();
            bytes.iter_mut().for_each(|b| *b = 0);
        }
    }
}

// Never print credentials in logs/debug output
impl fmt::Debug for SecureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureCredentials([REDACTED])")
    }
}

impl fmt::Display for SecureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED CREDENTIALS]")
    }
}

impl Clone for SecureCredentials {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for SecureCredentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecureCredentials::new)
    }
}

#[derive(Debug, Error, Clone)]
pub enum InsightError {
    /// The sentiment classifier produced a tag outside NEGATIVE/NEUTRAL/POSITIVE
    #[error("Unknown sentiment label from classifier: {label}")]
    UnknownSentimentLabel {
        label: String,
    },

    #[error("Sentiment classifier returned no predictions")]
    EmptyClassification,

    #[error("Service request failed: {message}")]
    RequestError {
        message: String,
        details: Option<String>,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to parse service response: {message}")]
    ParseError {
        message: String,
        source_text: Option<String>,
        location: Option<String>,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Rate limited by service: retry after {retry_after:?}")]
    RateLimited {
        retry_after: Option<Duration>,
        details: Option<String>,
        location: Option<String>,
    },

    #[error("Service rejected the access token: {message}")]
    Unauthorized {
        message: String,
        location: Option<String>,
    },

    #[error("Service returned error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
        response_body: Option<String>,
        location: Option<String>,
    },

    #[error("Service returned no completion choices")]
    EmptyCompletion,

    #[error("Credentials not provided")]
    MissingCredentials {
        location: Option<String>,
    },

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl InsightError {
    pub fn request_error<T: Into<String>>(
        message: T,
        details: Option<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
        location: Option<&str>
    ) -> Self {
        let error = Self::RequestError {
            message: message.into(),
            details,
            location: location.map(String::from),
            source: source.map(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>),
        };
        error.log();
        error
    }

    pub fn parse_error<T: Into<String>>(
        message: T,
        source_text: Option<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
        location: Option<&str>
    ) -> Self {
        let error = Self::ParseError {
            message: message.into(),
            source_text,
            location: location.map(String::from),
            source: source.map(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>),
        };
        error.log();
        error
    }

    pub fn api_error<T: Into<String>>(
        message: T,
        status: Option<u16>,
        response_body: Option<String>,
        location: Option<&str>
    ) -> Self {
        let error = Self::ApiError {
            message: message.into(),
            status: status.unwrap_or(500),
            response_body,
            location: location.map(String::from),
        };
        error.log();
        error
    }

    pub fn unauthorized<T: Into<String>>(message: T, location: Option<&str>) -> Self {
        let error = Self::Unauthorized {
            message: message.into(),
            location: location.map(String::from),
        };
        error.log();
        error
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            retry_after,
            details: None,
            location: None,
        }
    }

    pub fn unknown_sentiment_label(label: impl Into<String>) -> Self {
        let error = Self::UnknownSentimentLabel { label: label.into() };
        error.log();
        error
    }

    fn log(&self) {
        if let Some(loc) = self.location() {
            log::error!("{} at {}", self, loc);
        } else {
            log::error!("{}", self);
        }
    }

    /// True for failures of the generative service or classifier transport.
    ///
    /// These are never recovered by the pipeline.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::RequestError { .. }
                | Self::ParseError { .. }
                | Self::RateLimited { .. }
                | Self::Unauthorized { .. }
                | Self::ApiError { .. }
                | Self::EmptyCompletion
        )
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::RequestError { location, .. } => location.as_deref(),
            Self::ParseError { location, .. } => location.as_deref(),
            Self::RateLimited { location, .. } => location.as_deref(),
            Self::Unauthorized { location, .. } => location.as_deref(),
            Self::MissingCredentials { location } => location.as_deref(),
            Self::ApiError { location, .. } => location.as_deref(),
            _ => None,
        }
    }

    pub fn source_error(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        match self {
            Self::RequestError { source, .. } => source.as_ref().map(|s| s.as_ref()),
            Self::ParseError { source, .. } => source.as_ref().map(|s| s.as_ref()),
            _ => None,
        }
    }
}

/// Capture file and line location with a request error
#[macro_export]
macro_rules! request_error {
    ($message:expr) => {
        $crate::InsightError::request_error($message, None, None::<reqwest::Error>, Some(concat!(file!(), ":", line!())))
    };
    ($message:expr, $details:expr) => {
        $crate::InsightError::request_error($message, Some($details), None::<reqwest::Error>, Some(concat!(file!(), ":", line!())))
    };
    ($message:expr, $details:expr, $source:expr) => {
        $crate::InsightError::request_error($message, Some($details), Some($source), Some(concat!(file!(), ":", line!())))
    };
}

/// GigaChat model identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GigaChatModel {
    #[serde(rename = "GigaChat")]
    GigaChat,
    #[serde(rename = "GigaChat-2")]
    GigaChat2,
    #[serde(rename = "GigaChat-2-Pro")]
    GigaChat2Pro,
    #[serde(rename = "GigaChat-2-Max")]
    GigaChat2Max,
    /// Any other model identifier accepted by the service
    #[serde(untagged)]
    Custom(String),
}

impl GigaChatModel {
    pub fn as_str(&self) -> &str {
        match self {
            GigaChatModel::GigaChat => "GigaChat",
            GigaChatModel::GigaChat2 => "GigaChat-2",
            GigaChatModel::GigaChat2Pro => "GigaChat-2-Pro",
            GigaChatModel::GigaChat2Max => "GigaChat-2-Max",
            GigaChatModel::Custom(id) => id,
        }
    }
}

impl Default for GigaChatModel {
    fn default() -> Self {
        GigaChatModel::GigaChat2
    }
}

impl fmt::Display for GigaChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// OAuth token as issued by the authorization endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct AccessToken {
    pub access_token: String,
    /// Expiry as Unix epoch milliseconds
    pub expires_at: u64,
}

/// Redact token-like substrings so credentials never end up in error messages
pub fn sanitize_error_message(message: &str) -> String {
    lazy_static::lazy_static! {
        static ref TOKEN_PATTERN: regex::Regex = regex::Regex::new(r"[A-Za-z0-9_=+-]{20,}")
            .expect("token pattern is valid");
    }
    TOKEN_PATTERN.replace_all(message, "[REDACTED]").into_owned()
}
