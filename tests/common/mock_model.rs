//! Mock model service helpers
//!
//! Provides a wiremock-backed stand-in for the hosted model service so
//! the HTTP invoker can be exercised against real request/response
//! cycles.

use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yuu::shared::config::ModelConfig;

/// Start a mock model server and a config pointing at it
pub async fn mock_model_server(timeout: std::time::Duration) -> (MockServer, ModelConfig) {
    let server = MockServer::start().await;
    let config = ModelConfig {
        endpoint: server.uri(),
        model: "mock-model".to_string(),
        timeout,
    };
    (server, config)
}

/// Mount a generate response returning the given analysis document
///
/// The document is wrapped in the `{"text": ...}` envelope the model
/// service produces.
pub async fn mount_generate_text(server: &MockServer, document: &str) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/models/.+:generate$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": document })),
        )
        .mount(server)
        .await;
}

/// Mount a generate response with the given HTTP status
pub async fn mount_generate_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/models/.+:generate$"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// A well-formed analysis document the mock model can return
pub fn valid_document() -> String {
    r#"{
        "summary": "an uneasy dream about deep water",
        "emotions": {"anxiety": 0.78},
        "sentiment_score": -0.35,
        "themes": ["water"],
        "symbols": [{"symbol": "ocean", "confidence": 0.8, "explanation": "depth and the unknown"}],
        "risk_flags": {"self_harm": "none", "suicide": "none", "violence": false, "abuse_mention": false}
    }"#
    .to_string()
}
