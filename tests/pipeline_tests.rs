use pretty_assertions::assert_eq;
use review_insights::{
    AnalysisResult, AnalysisStage, InsightError, Insights, ReviewAnalyzer, SentimentLabel, ThemeCategory,
    INSIGHT_PARSE_ERROR,
};
use serde_json::json;
use std::sync::Arc;

use test_helpers::*;

const THEME_KEY: &str = "основную тему";
const INSIGHT_KEY: &str = "структурированный анализ";

fn analyzer(classifier: StubClassifier, generator: StubGenerator) -> (ReviewAnalyzer, Arc<StubClassifier>, Arc<StubGenerator>) {
    let classifier = Arc::new(classifier);
    let generator = Arc::new(generator);
    let analyzer = ReviewAnalyzer::new(classifier.clone(), generator.clone());
    (analyzer, classifier, generator)
}

#[tokio::test]
async fn test_negative_delivery_review() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, "Доставка\n"), (INSIGHT_KEY, DELIVERY_INSIGHT)]),
    );

    let text = "Delivery was terribly slow";
    let result = analyzer.analyze_review(text).await.unwrap();

    assert_eq!(result.text, text);
    assert_eq!(result.sentiment, SentimentLabel::Negative);
    assert_eq!(result.theme, "Доставка");
    assert_eq!(result.theme_category(), Some(ThemeCategory::Delivery));
    assert_eq!(
        serde_json::to_value(&result.insights).unwrap(),
        json!({
            "key_problem_or_strength": "Slow delivery",
            "root_cause": "Logistics delays",
            "actionable_recommendation": "Improve courier SLAs",
            "priority": "high"
        })
    );
}

#[tokio::test]
async fn test_prose_wrapped_insight_becomes_error_marker() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("POSITIVE"),
        StubGenerator::by_prompt(&[
            (THEME_KEY, "Качество товара"),
            (INSIGHT_KEY, "Sure, here is the JSON: {...}"),
        ]),
    );

    let result = analyzer.analyze_review("Great quality, love it").await.unwrap();

    assert_eq!(result.sentiment, SentimentLabel::Positive);
    assert_eq!(result.theme, "Качество товара");
    assert!(!result.insights.is_parsed());
    assert_eq!(
        serde_json::to_value(&result.insights).unwrap(),
        json!({ "error": INSIGHT_PARSE_ERROR })
    );
    assert_eq!(INSIGHT_PARSE_ERROR, "Не удалось спарсить инсайты");
}

#[tokio::test]
async fn test_unknown_sentiment_tag_fails_before_any_prompt() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("MIXED"),
        StubGenerator::fixed(DELIVERY_THEME),
    );

    let err = analyzer.analyze_review("It was fine I guess").await.unwrap_err();

    match err {
        InsightError::UnknownSentimentLabel { label } => assert_eq!(label, "MIXED"),
        other => panic!("expected UnknownSentimentLabel, got {:?}", other),
    }
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_empty_classifier_output_fails() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::returning(&[]),
        StubGenerator::fixed(DELIVERY_THEME),
    );

    let err = analyzer.analyze_review("anything").await.unwrap_err();
    assert!(matches!(err, InsightError::EmptyClassification));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_theme_service_error_is_fatal() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("NEUTRAL"),
        StubGenerator::sequence(vec![Err(api_error(503))]),
    );

    let err = analyzer.analyze_review("Nothing special").await.unwrap_err();

    assert!(matches!(err, InsightError::ApiError { status: 503, .. }));
    assert!(err.is_upstream());
    // The insight stage is never reached
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_insight_service_error_is_not_recovered() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::sequence(vec![
            Ok(DELIVERY_THEME.to_string()),
            Err(InsightError::rate_limited(None)),
        ]),
    );

    let err = analyzer.analyze_review("Courier lost my parcel").await.unwrap_err();

    assert!(matches!(err, InsightError::RateLimited { .. }));
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_classifier_error_is_fatal() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::failing(api_error(500)),
        StubGenerator::fixed(DELIVERY_THEME),
    );

    assert!(analyzer.analyze_review("text").await.is_err());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let events = EventLog::default();
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("NEGATIVE").with_events(events.clone()),
        StubGenerator::sequence(vec![
            Ok(DELIVERY_THEME.to_string()),
            Ok(DELIVERY_INSIGHT.to_string()),
        ])
        .with_events(events.clone()),
    );

    analyzer.analyze_review("Delivery was terribly slow").await.unwrap();

    assert_eq!(events.events(), vec!["classifier", "generator", "generator"]);

    let prompts = generator.prompts();
    assert!(prompts[0].contains(THEME_KEY));
    assert!(prompts[1].contains(INSIGHT_KEY));
}

#[tokio::test]
async fn test_insight_prompt_carries_previous_stage_outputs() {
    let (analyzer, classifier, generator) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, "  Доставка  "), (INSIGHT_KEY, DELIVERY_INSIGHT)]),
    );

    let text = "Delivery was terribly slow";
    analyzer.analyze_review(text).await.unwrap();

    assert_eq!(classifier.inputs(), vec![text.to_string()]);

    let prompts = generator.prompts();
    assert!(prompts[0].contains(&format!("Отзыв: {}", text)));
    assert!(prompts[1].contains(&format!("Отзыв: {}", text)));
    assert!(prompts[1].contains("Тональность: negative"));
    // The theme reaches the insight prompt already trimmed
    assert!(prompts[1].contains("Тема: Доставка\n"));
}

#[tokio::test]
async fn test_same_input_gives_equal_results() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, DELIVERY_THEME), (INSIGHT_KEY, DELIVERY_INSIGHT)]),
    );

    let first = analyzer.analyze_review("Delivery was terribly slow").await.unwrap();
    let second = analyzer.analyze_review("Delivery was terribly slow").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_review_is_analyzed() {
    let (analyzer, classifier, generator) = analyzer(
        StubClassifier::tag("NEUTRAL"),
        StubGenerator::by_prompt(&[(THEME_KEY, "Общее впечатление"), (INSIGHT_KEY, "{}")]),
    );

    let result = analyzer.analyze_review("").await.unwrap();

    assert_eq!(result.text, "");
    assert_eq!(result.sentiment, SentimentLabel::Neutral);
    assert_eq!(result.insights, Insights::Parsed(serde_json::Map::new()));
    assert_eq!(classifier.inputs(), vec![String::new()]);
    assert!(generator.prompts()[0].contains("Отзыв: \n"));
}

#[tokio::test]
async fn test_result_serializes_with_four_keys() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, DELIVERY_THEME), (INSIGHT_KEY, DELIVERY_INSIGHT)]),
    );

    let result = analyzer.analyze_review("Delivery was terribly slow").await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["text", "sentiment", "theme", "insights"]);
    assert_eq!(value["sentiment"], "negative");

    let restored: AnalysisResult = serde_json::from_value(value).unwrap();
    assert_eq!(restored, result);
}

#[tokio::test]
async fn test_russian_delivery_review_end_to_end() {
    let insight = r#"{"key_problem_or_strength": "Медленная доставка", "root_cause": "Логистика", "actionable_recommendation": "Оптимизировать маршруты", "priority": "high"}"#;
    let (analyzer, classifier, _) = analyzer(
        StubClassifier::tag("NEGATIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, "Доставка"), (INSIGHT_KEY, insight)]),
    );

    let result = analyzer.analyze_review("Доставка была ужасно медленной").await.unwrap();

    assert_eq!(classifier.inputs(), vec!["Доставка была ужасно медленной".to_string()]);
    assert_eq!(result.text, "Доставка была ужасно медленной");
    assert_eq!(result.sentiment, SentimentLabel::Negative);
    assert_eq!(result.theme, "Доставка");
    assert_eq!(
        serde_json::to_value(&result.insights).unwrap(),
        json!({
            "key_problem_or_strength": "Медленная доставка",
            "root_cause": "Логистика",
            "actionable_recommendation": "Оптимизировать маршруты",
            "priority": "high"
        })
    );

    let restored: AnalysisResult = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(restored, result);
}

#[tokio::test]
async fn test_service_error_object_stays_parsed_after_round_trip() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("NEUTRAL"),
        StubGenerator::by_prompt(&[(THEME_KEY, DELIVERY_THEME), (INSIGHT_KEY, r#"{"error": "model refused"}"#)]),
    );

    let result = analyzer.analyze_review("Нормально").await.unwrap();
    assert!(result.insights.is_parsed());

    let restored: AnalysisResult = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert!(restored.insights.is_parsed());
    assert_eq!(restored.insights.error_marker(), None);
    assert_eq!(restored, result);
}

#[tokio::test]
async fn test_error_marker_survives_round_trip() {
    let (analyzer, _, _) = analyzer(
        StubClassifier::tag("NEUTRAL"),
        StubGenerator::by_prompt(&[(THEME_KEY, DELIVERY_THEME), (INSIGHT_KEY, "not json")]),
    );

    let result = analyzer.analyze_review("Нормально").await.unwrap();
    let restored: AnalysisResult = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();

    assert!(!restored.insights.is_parsed());
    assert_eq!(restored, result);
}

#[tokio::test]
async fn test_stage_accessors() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("POSITIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, "Цена"), (INSIGHT_KEY, "{}")]),
    );

    assert_eq!(analyzer.sentiment_classifier().stage_name(), "sentiment");
    assert_eq!(analyzer.theme_classifier().stage_name(), "theme");
    assert_eq!(analyzer.insight_generator().stage_name(), "insight");

    assert_eq!(analyzer.sentiment_classifier().classify("Дёшево").await.unwrap(), SentimentLabel::Positive);
    assert_eq!(analyzer.theme_classifier().classify("Дёшево").await.unwrap(), "Цена");
    let insights = analyzer
        .insight_generator()
        .generate("Дёшево", SentimentLabel::Positive, "Цена")
        .await
        .unwrap();
    assert!(insights.is_parsed());
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_concurrent_reviews_share_one_analyzer() {
    let (analyzer, _, generator) = analyzer(
        StubClassifier::tag("POSITIVE"),
        StubGenerator::by_prompt(&[(THEME_KEY, "Цена"), (INSIGHT_KEY, DELIVERY_INSIGHT)]),
    );
    let analyzer = Arc::new(analyzer);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let analyzer = analyzer.clone();
            tokio::spawn(async move { analyzer.analyze_review(&format!("review {}", i)).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.theme, "Цена");
    }
    assert_eq!(generator.call_count(), 8);
}
