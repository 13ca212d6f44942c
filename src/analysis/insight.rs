// Insight extraction stage

use crate::analysis::{AnalysisStage, BaseStage, PromptOperations, PromptTemplate, SentimentLabel};
use crate::service::TextGenerator;
use crate::types::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Instruction for the insight call. Slots: `review_text`, `sentiment`, `theme`.
pub const INSIGHT_TEMPLATE: &str = r#"На основе отзыва клиента сгенерируй структурированный анализ
Отзыв: {{review_text}}
Тональность: {{sentiment}}
Тема: {{theme}}

Проанализируй и верни ответ в формату JSON:
{
    "key_problem_or_strength": "Основная проблема или преимущество (одно предложение)",
    "root_cause": "Возможная причина проблемы (если есть)",
    "actionable_recommendation": "Конкретная рекомендация для бизнеса",
    "priority": "Приоритет (high/medium/low)"
}
Только JSON, никакого другого текста. Старайся быть довольно кратким."#;

/// Diagnostic stored when the insight response is not a JSON object
pub const INSIGHT_PARSE_ERROR: &str = "Не удалось спарсить инсайты";

/// Fallback value standing in for an unparseable insight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorMarker {
    pub error: String,
}

impl ErrorMarker {
    pub fn parse_failure() -> Self {
        Self {
            error: INSIGHT_PARSE_ERROR.to_string(),
        }
    }
}

/// The insight part of an analysis: the parsed object or the error marker.
///
/// Serializes to the bare object in both cases. Reading a record back, only
/// the exact marker object `{"error": INSIGHT_PARSE_ERROR}` becomes
/// `Unparsed`; any other object, including one with its own `error` key,
/// stays `Parsed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Insights {
    Unparsed(ErrorMarker),
    Parsed(Map<String, Value>),
}

impl<'de> Deserialize<'de> for Insights {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let is_marker = object.len() == 1
            && object.get("error").and_then(Value::as_str) == Some(INSIGHT_PARSE_ERROR);

        if is_marker {
            Ok(Insights::Unparsed(ErrorMarker::parse_failure()))
        } else {
            Ok(Insights::Parsed(object))
        }
    }
}

impl Insights {
    /// Parse a raw service response.
    ///
    /// The trimmed text must be a JSON object; it is kept exactly as parsed.
    /// Anything else becomes the error marker. This never fails.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Object(object)) => Insights::Parsed(object),
            _ => Insights::Unparsed(ErrorMarker::parse_failure()),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Insights::Parsed(_))
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Insights::Parsed(object) => Some(object),
            Insights::Unparsed(_) => None,
        }
    }

    pub fn error_marker(&self) -> Option<&ErrorMarker> {
        match self {
            Insights::Unparsed(marker) => Some(marker),
            Insights::Parsed(_) => None,
        }
    }

    /// Typed view of a parsed object.
    ///
    /// Missing fields become `None`; returns `None` if a field has a non-string value.
    pub fn record(&self) -> Option<InsightRecord> {
        self.as_object()
            .and_then(|object| serde_json::from_value(Value::Object(object.clone())).ok())
    }
}

/// Lenient typed view of the four requested insight fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRecord {
    #[serde(default)]
    pub key_problem_or_strength: Option<String>,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub actionable_recommendation: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl InsightRecord {
    pub fn priority_level(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::from_label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Case-insensitive match on high/medium/low
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Produces the structured insight for a review
pub struct InsightGenerator {
    base: BaseStage,
}

impl InsightGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            base: BaseStage::new(generator, "insight"),
        }
    }

    pub fn prompt(&self, text: &str, sentiment: SentimentLabel, theme: &str) -> InsightResult<PromptTemplate> {
        PromptTemplate::new(INSIGHT_TEMPLATE)?
            .with_param("review_text", text)?
            .with_param("sentiment", sentiment.as_str())?
            .with_param("theme", theme)
    }

    /// Generate insights for a review already labelled with sentiment and theme.
    ///
    /// Service failures propagate; a malformed response becomes [`Insights::Unparsed`].
    #[instrument(skip(self, text), fields(stage = "insight"))]
    pub async fn generate(&self, text: &str, sentiment: SentimentLabel, theme: &str) -> InsightResult<Insights> {
        let raw = self.run_prompt(&self.prompt(text, sentiment, theme)?).await?;
        let insights = Insights::parse(&raw);

        if !insights.is_parsed() {
            warn!(response_len = raw.len(), "insight response is not a JSON object");
        }

        Ok(insights)
    }
}

impl AnalysisStage for InsightGenerator {
    fn stage_name(&self) -> &str {
        self.base.stage_name()
    }
}

impl PromptOperations for InsightGenerator {
    fn generator(&self) -> &dyn TextGenerator {
        self.base.generator()
    }
}
