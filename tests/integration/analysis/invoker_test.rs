//! HTTP model invoker contract tests
//!
//! Drives the invoker against a wiremock model service to pin down the
//! retryable/non-retryable split the pipeline's policy depends on.

use std::time::Duration;

use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yuu::backend::analysis::invoker::{
    AnalysisRequest, HttpModelInvoker, ModelError, ModelInvoker,
};

use crate::common::{mock_model_server, mount_generate_status, mount_generate_text, valid_document};

fn request() -> AnalysisRequest {
    AnalysisRequest {
        narrative: "I dreamed of deep water".to_string(),
        language: "en".to_string(),
        from_transcript: false,
    }
}

#[tokio::test]
async fn well_formed_response_parses() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_text(&server, &valid_document()).await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let payload = invoker.invoke(&request()).await.unwrap();

    assert_eq!(payload.sentiment_score, -0.35);
    assert_eq!(payload.emotions.get("anxiety"), Some(&0.78));
    assert_eq!(invoker.model_id(), "mock-model");
}

#[tokio::test]
async fn fenced_response_parses() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    let fenced = format!("```json\n{}\n```", valid_document());
    mount_generate_text(&server, &fenced).await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let payload = invoker.invoke(&request()).await.unwrap();
    assert_eq!(payload.summary, "an uneasy dream about deep water");
}

#[tokio::test]
async fn rate_limit_is_retryable() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_status(&server, 429).await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();

    assert!(matches!(err, ModelError::RateLimited));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn upstream_error_is_retryable() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_status(&server, 503).await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();

    assert!(matches!(err, ModelError::Upstream { status: 503 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn client_rejection_is_not_retryable() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_status(&server, 400).await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();

    assert!(matches!(err, ModelError::Api { status: 400, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn out_of_range_sentiment_is_malformed() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_text(
        &server,
        r#"{"summary": "a dream", "sentiment_score": 2.0, "emotions": {}}"#,
    )
    .await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();

    assert!(matches!(err, ModelError::MalformedResponse { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn prose_instead_of_json_is_malformed() {
    let (server, config) = mock_model_server(Duration::from_secs(5)).await;
    mount_generate_text(&server, "I am sorry, I cannot analyze this dream.").await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();
    assert!(matches!(err, ModelError::MalformedResponse { .. }));
}

#[tokio::test]
async fn slow_response_times_out_as_retryable() {
    let (server, config) = mock_model_server(Duration::from_millis(100)).await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/models/.+:generate$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "text": valid_document() }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let invoker = HttpModelInvoker::new(config).unwrap();
    let err = invoker.invoke(&request()).await.unwrap_err();

    assert!(matches!(err, ModelError::Timeout));
    assert!(err.is_retryable());
}
