// Sentiment classification stage

use crate::analysis::AnalysisStage;
use crate::service::TextClassifier;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Overall polarity of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// Map a raw classifier tag onto the label vocabulary.
    ///
    /// Only the classifier's own tags are accepted; anything else is an
    /// [`InsightError::UnknownSentimentLabel`].
    pub fn from_classifier_tag(tag: &str) -> InsightResult<Self> {
        match tag {
            "NEGATIVE" => Ok(SentimentLabel::Negative),
            "NEUTRAL" => Ok(SentimentLabel::Neutral),
            "POSITIVE" => Ok(SentimentLabel::Positive),
            other => Err(InsightError::unknown_sentiment_label(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wraps a pretrained three-class classifier
pub struct SentimentClassifier {
    classifier: Arc<dyn TextClassifier>,
}

impl SentimentClassifier {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify a review, keeping only the top-ranked prediction
    #[instrument(skip(self, text), fields(stage = "sentiment"))]
    pub async fn classify(&self, text: &str) -> InsightResult<SentimentLabel> {
        let predictions = self.classifier.classify(text).await?;
        let top = predictions.first().ok_or(InsightError::EmptyClassification)?;

        let label = SentimentLabel::from_classifier_tag(&top.label)?;
        debug!(raw = %top.label, score = top.score, %label, "sentiment classified");
        Ok(label)
    }
}

impl AnalysisStage for SentimentClassifier {
    fn stage_name(&self) -> &str {
        "sentiment"
    }
}
