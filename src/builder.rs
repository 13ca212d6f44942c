// Completion Builder

use crate::types::*;
use crate::client::{handle_error_response, GigaChat};
use crate::utils::{validate_positive, validate_range, StringValidator};

use std::sync::Arc;

/// A struct for building GigaChat completion requests with a fluent interface.
pub struct CompletionBuilder {
    client: Arc<GigaChat>,
    model: GigaChatModel,
    messages: Vec<Message>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    repetition_penalty: Option<f32>,
}

impl CompletionBuilder {
    /// Create a builder that inherits the client's defaults
    pub(crate) fn from_client(client: Arc<GigaChat>) -> Self {
        Self {
            model: client.default_model.clone(),
            temperature: client.default_temperature,
            max_tokens: client.default_max_tokens,
            client,
            messages: Vec::new(),
            top_p: None,
            repetition_penalty: None,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> InsightResult<Self> {
        let text = StringValidator::not_empty(system, "system")?;
        self.messages.push(Message { role: Role::System, content: text });
        Ok(self)
    }

    /// Override the client's default model
    pub fn model(mut self, model: GigaChatModel) -> Self {
        self.model = model;
        self
    }

    /// Add a user message
    pub fn user_message(mut self, text: impl Into<String>) -> InsightResult<Self> {
        let text = StringValidator::not_empty(text, "user message")?;
        self.messages.push(Message { role: Role::User, content: text });
        Ok(self)
    }

    /// Add an assistant message, e.g. to replay a previous turn
    pub fn assistant_message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message { role: Role::Assistant, content: text.into() });
        self
    }

    /// Set the temperature parameter (between 0.0 and 2.0)
    ///
    /// Lower values are more deterministic.
    pub fn temperature(mut self, temperature: f32) -> InsightResult<Self> {
        self.temperature = Some(validate_range(temperature, 0.0, 2.0, "temperature")?);
        Ok(self)
    }

    /// Set the nucleus-sampling threshold (between 0.0 and 1.0)
    pub fn top_p(mut self, top_p: f32) -> InsightResult<Self> {
        self.top_p = Some(validate_range(top_p, 0.0, 1.0, "top_p")?);
        Ok(self)
    }

    /// Set the maximum number of tokens to generate
    pub fn max_tokens(mut self, max_tokens: u32) -> InsightResult<Self> {
        self.max_tokens = Some(validate_positive(max_tokens, "max_tokens")?);
        Ok(self)
    }

    /// Penalize repeated tokens; 1.0 means no penalty
    pub fn repetition_penalty(mut self, penalty: f32) -> InsightResult<Self> {
        self.repetition_penalty = Some(validate_positive(penalty, "repetition_penalty")?);
        Ok(self)
    }

    /// The request body that `send` would post
    pub fn build_request(&self) -> CompletionRequest {
        CompletionRequest {
            model: self.model.as_str().to_string(),
            messages: self.messages.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            repetition_penalty: self.repetition_penalty,
        }
    }

    /// Send the request and return the parsed completion
    pub async fn send(self) -> InsightResult<CompletionResponse> {
        if self.messages.is_empty() {
            return Err(InsightError::ValidationError(
                "At least one message is required".to_string()
            ));
        }

        let request = self.build_request();
        let endpoint = format!("{}/chat/completions", self.client.base_url);
        let token = self.client.access_token().await?;

        let response = self.client.http_client
            .post(&endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let response = match handle_error_response(response).await {
            Ok(response) => response,
            Err(err @ InsightError::Unauthorized { .. }) => {
                self.client.invalidate_token().await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        response.json::<CompletionResponse>().await.map_err(|e| InsightError::parse_error(
            e.to_string(),
            None,
            Some(e),
            Some(concat!(file!(), ":", line!()))
        ))
    }
}
