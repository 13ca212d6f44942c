// Theme classification stage

use crate::analysis::{AnalysisStage, BaseStage, PromptOperations, PromptTemplate};
use crate::service::TextGenerator;
use crate::types::*;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Instruction for the theme call. One slot: `review_text`.
pub const THEME_TEMPLATE: &str = "Ты — опытный аналитик обратной связи. Определи основную тему отзыва клиента.
Тема должна быть одной из следующих категорий: [Качество товара, Доставка, Служба поддержки, Цена, Общее впечатление].

Отзыв: {{review_text}}

Верни ТОЛЬКО название категории, без кавычек, точек и дополнительного текста.";

/// The theme taxonomy the prompt asks for.
///
/// The pipeline does not enforce it; use [`ThemeCategory::from_label`] to check
/// whether a returned theme belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeCategory {
    ProductQuality,
    Delivery,
    CustomerSupport,
    Price,
    OverallImpression,
}

impl ThemeCategory {
    pub const ALL: [ThemeCategory; 5] = [
        ThemeCategory::ProductQuality,
        ThemeCategory::Delivery,
        ThemeCategory::CustomerSupport,
        ThemeCategory::Price,
        ThemeCategory::OverallImpression,
    ];

    /// Label as it appears in the prompt and in service responses
    pub fn label(&self) -> &'static str {
        match self {
            ThemeCategory::ProductQuality => "Качество товара",
            ThemeCategory::Delivery => "Доставка",
            ThemeCategory::CustomerSupport => "Служба поддержки",
            ThemeCategory::Price => "Цена",
            ThemeCategory::OverallImpression => "Общее впечатление",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            ThemeCategory::ProductQuality => "Product Quality",
            ThemeCategory::Delivery => "Delivery",
            ThemeCategory::CustomerSupport => "Customer Support",
            ThemeCategory::Price => "Price",
            ThemeCategory::OverallImpression => "Overall Impression",
        }
    }

    /// Exact match against the localized labels
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Assigns one theme per review through the generative service
pub struct ThemeClassifier {
    base: BaseStage,
}

impl ThemeClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            base: BaseStage::new(generator, "theme"),
        }
    }

    /// The rendered-ready template for one review
    pub fn prompt(&self, text: &str) -> InsightResult<PromptTemplate> {
        PromptTemplate::new(THEME_TEMPLATE)?.with_param("review_text", text)
    }

    /// Classify a review's theme.
    ///
    /// Returns the service response with surrounding whitespace removed and
    /// nothing else changed. Off-taxonomy answers are logged, not rejected.
    #[instrument(skip(self, text), fields(stage = "theme"))]
    pub async fn classify(&self, text: &str) -> InsightResult<String> {
        let raw = self.run_prompt(&self.prompt(text)?).await?;
        let theme = raw.trim().to_string();

        if ThemeCategory::from_label(&theme).is_none() {
            warn!(%theme, "theme is outside the requested taxonomy");
        }

        Ok(theme)
    }
}

impl AnalysisStage for ThemeClassifier {
    fn stage_name(&self) -> &str {
        self.base.stage_name()
    }
}

impl PromptOperations for ThemeClassifier {
    fn generator(&self) -> &dyn TextGenerator {
        self.base.generator()
    }
}
