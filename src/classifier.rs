//! HTTP client for a locally hosted pretrained sentiment classifier.
//!
//! The model runs in an inference server next to the analyzer (for example a
//! text-classification server serving `blanchefort/rubert-base-cased-sentiment`).
//! The server receives `{"inputs": "<text>"}` and answers with a list of
//! `{label, score}` pairs, either flat or wrapped in an outer list.

use crate::client::{build_http_client, handle_error_response, TlsConfig};
use crate::config::ClassifierConfig;
use crate::service::{ClassifierPrediction, TextClassifier};
use crate::types::*;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

enum ClassifyResponse {
    Nested(Vec<Vec<ClassifierPrediction>>),
    Flat(Vec<ClassifierPrediction>),
}

impl ClassifyResponse {
    /// Pick the shape from the first element, then decode through `Value`
    /// so scores survive `arbitrary_precision` number handling.
    fn from_value(value: Value) -> serde_json::Result<Self> {
        let nested = matches!(&value, Value::Array(items) if items.first().map_or(false, Value::is_array));

        if nested {
            serde_json::from_value(value).map(ClassifyResponse::Nested)
        } else {
            serde_json::from_value(value).map(ClassifyResponse::Flat)
        }
    }

    fn into_ranked(self) -> Vec<ClassifierPrediction> {
        let mut predictions = match self {
            ClassifyResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            ClassifyResponse::Flat(predictions) => predictions,
        };
        predictions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        predictions
    }
}

/// Sentiment classifier reached over HTTP
#[derive(Clone)]
pub struct HttpClassifier {
    http_client: HttpClient,
    endpoint: String,
    model: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> InsightResult<Self> {
        Self::from_config(&ClassifierConfig {
            endpoint: endpoint.into(),
            ..ClassifierConfig::default()
        })
    }

    pub fn from_config(config: &ClassifierConfig) -> InsightResult<Self> {
        config.validate()?;
        let http_client = build_http_client(&TlsConfig::default(), config.timeout())?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn classify(&self, text: &str) -> InsightResult<Vec<ClassifierPrediction>> {
        let response = self.http_client
            .post(&self.endpoint)
            .json(&ClassifyRequest { inputs: text })
            .send()
            .await?;

        let response = handle_error_response(response).await?;

        let body = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&body)
            .and_then(ClassifyResponse::from_value)
            .map_err(|e| InsightError::parse_error(
                "Unexpected classifier response shape",
                Some(body.clone()),
                Some(e),
                Some(concat!(file!(), ":", line!()))
            ))?;

        let ranked = parsed.into_ranked();
        debug!(predictions = ranked.len(), top = ?ranked.first().map(|p| &p.label), "classifier answered");
        Ok(ranked)
    }
}
