// Collaborator traits

use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generative text service: a fully rendered prompt in, one completion out.
///
/// Sampling settings (model, temperature) belong to the implementation and are
/// fixed when it is constructed.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Submit a prompt and return the raw completion text
    async fn complete(&self, prompt: &str) -> InsightResult<String>;
}

/// One (label, confidence) pair emitted by a pretrained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierPrediction {
    pub label: String,
    pub score: f32,
}

impl ClassifierPrediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self { label: label.into(), score }
    }
}

/// A pretrained text classifier
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify raw text, returning predictions ranked best first
    async fn classify(&self, text: &str) -> InsightResult<Vec<ClassifierPrediction>>;
}
