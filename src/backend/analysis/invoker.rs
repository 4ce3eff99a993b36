//! Model Service Client
//!
//! Wraps calls to the hosted generative-model service behind the
//! `ModelInvoker` trait. The HTTP implementation enforces a request
//! timeout and validates the response against the expected analysis
//! schema before returning success, so the pipeline only ever sees
//! well-formed payloads.
//!
//! # Error Taxonomy
//!
//! Errors split into two families that drive the pipeline's retry
//! policy:
//!
//! - *retryable*: timeout, rate limit, upstream 5xx, network failure
//! - *non-retryable*: other API rejections and schema violations
//!   (`malformed-response`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::config::ModelConfig;

use super::payload::AnalysisPayload;

/// Errors that can occur when invoking the model service
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request exceeded the configured timeout
    #[error("model request timed out")]
    Timeout,

    /// The service rejected the request with 429
    #[error("model service rate limited the request")]
    RateLimited,

    /// The service failed with a 5xx status
    #[error("model service error (status {status})")]
    Upstream { status: u16 },

    /// Transport-level failure before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// The service rejected the request (non-retryable 4xx)
    #[error("model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not match the expected analysis schema
    #[error("malformed model response: {detail}")]
    MalformedResponse { detail: String },
}

impl ModelError {
    /// Whether the pipeline should retry this error with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::Timeout
                | ModelError::RateLimited
                | ModelError::Upstream { .. }
                | ModelError::Network(_)
        )
    }

    /// Create a malformed-response error
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            detail: detail.into(),
        }
    }
}

/// One analysis request handed to the invoker
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The narrative text to analyze
    pub narrative: String,
    /// BCP 47 language tag of the narrative
    pub language: String,
    /// Whether the narrative came from an audio transcript
    pub from_transcript: bool,
}

/// Client for the hosted model service
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Analyze a dream narrative, returning a validated payload
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, ModelError>;

    /// Identifier of the model this invoker talks to
    fn model_id(&self) -> &str;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// HTTP implementation of `ModelInvoker`
#[derive(Clone)]
pub struct HttpModelInvoker {
    client: reqwest::Client,
    config: ModelConfig,
}

impl HttpModelInvoker {
    /// Create an invoker from a model configuration
    ///
    /// The per-request timeout is enforced by the underlying HTTP
    /// client; a timeout surfaces as a retryable `ModelError::Timeout`.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1/models/{}:generate",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ModelInvoker for HttpModelInvoker {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, ModelError> {
        let prompt = build_prompt(&request.narrative, &request.language);
        let body = GenerateRequest {
            prompt: &prompt,
            temperature: 0.1,
            max_output_tokens: 2048,
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            return Err(match status {
                429 => ModelError::RateLimited,
                500..=599 => ModelError::Upstream { status },
                _ => {
                    let message = response.text().await.unwrap_or_default();
                    ModelError::Api { status, message }
                }
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::malformed(format!("bad response envelope: {e}")))?;

        parse_payload(&generated.text)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// Build the JSON-only analysis prompt for a narrative
fn build_prompt(narrative: &str, language: &str) -> String {
    format!(
        r#"You are an empathetic mental health analysis assistant. Analyze the user's dream text below (language: {language}).
Produce a JSON object only (no other text, no markdown fences) that follows this exact schema:

{{
  "summary": "string",
  "emotions": {{ "<emotion>": number (0 to 1) }},
  "sentiment_score": number (-1.0 to 1.0),
  "themes": ["string"],
  "symbols": [{{ "symbol": "string", "confidence": number, "explanation": "string" }}],
  "risk_flags": {{
     "self_harm": "none|low|medium|high",
     "suicide": "none|low|medium|high",
     "violence": boolean,
     "abuse_mention": boolean
  }}
}}

Dream text:
---
{narrative}
---

Return only the valid JSON object."#
    )
}

/// Parse and validate the model's generated text into a payload
///
/// Models occasionally wrap the JSON document in markdown fences
/// despite the prompt; those are stripped before parsing.
fn parse_payload(text: &str) -> Result<AnalysisPayload, ModelError> {
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let payload: AnalysisPayload = serde_json::from_str(cleaned)
        .map_err(|e| ModelError::malformed(format!("invalid JSON: {e}")))?;

    payload
        .validate()
        .map_err(|e| ModelError::malformed(e.to_string()))?;

    Ok(payload)
}
