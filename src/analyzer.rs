//! The review analysis pipeline.
//!
//! [`ReviewAnalyzer`] runs the three stages strictly in order for one review:
//! sentiment, then theme, then insight. Each stage awaits the previous one;
//! any stage error aborts the review and no partial [`AnalysisResult`] is
//! produced. Only an unparseable insight response is recovered, as
//! [`Insights::Unparsed`].

use crate::analysis::{InsightGenerator, Insights, SentimentClassifier, SentimentLabel, ThemeCategory, ThemeClassifier};
use crate::classifier::HttpClassifier;
use crate::client::GigaChat;
use crate::config::AnalyzerConfig;
use crate::service::{TextClassifier, TextGenerator};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// The structured record produced for one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub sentiment: SentimentLabel,
    pub theme: String,
    pub insights: Insights,
}

impl AnalysisResult {
    /// The theme as a taxonomy member, if the service answered with one
    pub fn theme_category(&self) -> Option<ThemeCategory> {
        ThemeCategory::from_label(&self.theme)
    }

    pub fn to_json(&self) -> InsightResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> InsightResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs sentiment, theme and insight stages for one review at a time.
///
/// The collaborators are shared read-only, so one analyzer can serve many
/// reviews, including concurrently.
pub struct ReviewAnalyzer {
    sentiment: SentimentClassifier,
    theme: ThemeClassifier,
    insight: InsightGenerator,
}

impl ReviewAnalyzer {
    /// Assemble the pipeline from a classifier and a generative service
    pub fn new(classifier: Arc<dyn TextClassifier>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            sentiment: SentimentClassifier::new(classifier),
            theme: ThemeClassifier::new(generator.clone()),
            insight: InsightGenerator::new(generator),
        }
    }

    /// Build the production collaborators (GigaChat and the HTTP classifier) from configuration
    pub fn from_config(config: &AnalyzerConfig) -> InsightResult<Self> {
        let generator = GigaChat::from_config(&config.gigachat)?;
        let classifier = HttpClassifier::from_config(&config.classifier)?;
        Ok(Self::new(Arc::new(classifier), Arc::new(generator)))
    }

    pub fn sentiment_classifier(&self) -> &SentimentClassifier {
        &self.sentiment
    }

    pub fn theme_classifier(&self) -> &ThemeClassifier {
        &self.theme
    }

    pub fn insight_generator(&self) -> &InsightGenerator {
        &self.insight
    }

    /// Analyze a single review
    #[instrument(skip(self, text), fields(review_len = text.len()))]
    pub async fn analyze_review(&self, text: &str) -> InsightResult<AnalysisResult> {
        let sentiment = self.sentiment.classify(text).await?;
        let theme = self.theme.classify(text).await?;
        let insights = self.insight.generate(text, sentiment, &theme).await?;

        info!(%sentiment, %theme, insights_parsed = insights.is_parsed(), "review analyzed");

        Ok(AnalysisResult {
            text: text.to_string(),
            sentiment,
            theme,
            insights,
        })
    }
}
