//! # review-insights: structured analysis of customer reviews
//!
//! This crate reduces a single free-text customer review to a machine-consumable
//! record: a sentiment label, a theme from a fixed taxonomy, and a short
//! structured insight (problem or strength, likely cause, recommendation,
//! priority).
//!
//! ## Pipeline
//!
//! 1. Sentiment: a pretrained three-class classifier, normalized to
//!    `negative` / `neutral` / `positive`. Unknown tags fail the review.
//! 2. Theme: a zero-temperature prompt to a generative service, answer trimmed
//!    and passed through.
//! 3. Insight: a JSON-only prompt; a response that is not a JSON object is
//!    replaced by `{"error": "Не удалось спарсить инсайты"}`.
//!
//! The collaborators sit behind [`TextClassifier`] and [`TextGenerator`], so
//! any service (or a test stub) can be plugged in. The crate ships a GigaChat
//! client and an HTTP client for a locally hosted classifier.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use review_insights::from_env;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GIGACHAT_CREDENTIALS, SENTIMENT_ENDPOINT, ...
//!     let analyzer = from_env()?;
//!
//!     let result = analyzer.analyze_review("Доставка была ужасно медленной").await?;
//!     println!("{}", result.to_json_pretty()?);
//!
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod client;
mod builder;
pub mod config;
pub mod service;
pub mod classifier;
pub mod analysis;
pub mod analyzer;
pub mod utils;

// Re-export core components
pub use client::{GigaChat, TlsConfig};
pub use builder::CompletionBuilder;
pub use types::{InsightError, InsightResult, GigaChatModel, Message, Role, SecureCredentials, sanitize_error_message};
pub use config::{AnalyzerConfig, ClassifierConfig, GigaChatConfig};
pub use service::{ClassifierPrediction, TextClassifier, TextGenerator};
pub use classifier::HttpClassifier;
pub use analyzer::{AnalysisResult, ReviewAnalyzer};

pub use analysis::{
    AnalysisStage,
    PromptOperations,
    PromptTemplate,
    SentimentClassifier,
    SentimentLabel,
    ThemeClassifier,
    ThemeCategory,
    InsightGenerator,
    Insights,
    InsightRecord,
    ErrorMarker,
    Priority,
    INSIGHT_PARSE_ERROR,
    INSIGHT_TEMPLATE,
    THEME_TEMPLATE,
};

pub mod prelude {
    //! Convenient imports for commonly used types and functions
    pub use crate::{
        from_env, AnalysisResult, AnalyzerConfig, InsightError, InsightResult, Insights,
        ReviewAnalyzer, SentimentLabel, TextClassifier, TextGenerator, ThemeCategory,
    };
}

/// Build an analyzer whose collaborators are configured from the environment
pub fn from_env() -> InsightResult<ReviewAnalyzer> {
    let config = AnalyzerConfig::from_env()?;
    ReviewAnalyzer::from_config(&config)
}
