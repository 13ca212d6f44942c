//! Analysis stages
//!
//! Each stage of the review pipeline is a small client of its own:
//!
//! - [`SentimentClassifier`]: pretrained classifier, label normalized to [`SentimentLabel`]
//! - [`ThemeClassifier`]: prompted generative call constrained to the theme taxonomy
//! - [`InsightGenerator`]: prompted generative call returning JSON, with a parse fallback
//!
//! Stages that talk to the generative service compose a [`BaseStage`] and
//! delegate [`PromptOperations`] to it, so prompt submission and its logging
//! live in one place.

pub mod base;
pub mod template;
pub mod sentiment;
pub mod theme;
pub mod insight;

pub use base::BaseStage;
pub use template::PromptTemplate;
pub use sentiment::{SentimentClassifier, SentimentLabel};
pub use theme::{ThemeCategory, ThemeClassifier, THEME_TEMPLATE};
pub use insight::{ErrorMarker, InsightGenerator, InsightRecord, Insights, Priority, INSIGHT_PARSE_ERROR, INSIGHT_TEMPLATE};

use crate::service::TextGenerator;
use crate::types::*;
use async_trait::async_trait;
use tracing::debug;

/// Common trait for all pipeline stages
pub trait AnalysisStage: Send + Sync {
    /// Name used in logs and stage errors
    fn stage_name(&self) -> &str;
}

/// Prompt submission shared by the generative stages
#[async_trait]
pub trait PromptOperations: AnalysisStage {
    /// The generative service this stage submits to
    fn generator(&self) -> &dyn TextGenerator;

    /// Render a fully parameterized template and return the raw completion
    async fn run_prompt(&self, template: &PromptTemplate) -> InsightResult<String> {
        let prompt = template.render()?;
        debug!(stage = self.stage_name(), prompt_len = prompt.len(), "submitting prompt");

        let completion = self.generator().complete(&prompt).await?;
        debug!(stage = self.stage_name(), completion_len = completion.len(), "completion received");

        Ok(completion)
    }
}
