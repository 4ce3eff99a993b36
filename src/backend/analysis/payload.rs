//! Analysis Payload Schema
//!
//! The wire shape the model service is expected to return for a dream
//! narrative, and the validation applied before the pipeline will touch
//! it. A payload that fails validation is a non-retryable model error:
//! retrying a schema violation burns model spend without changing the
//! outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::SharedError;

/// Raw risk sub-payload as produced by the model
///
/// Categories may arrive as explicit grades (`none|low|medium|high`),
/// as numeric scores in 0..=1, or both. The classifier reconciles them;
/// this type only carries what the model said.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawRiskBlock {
    /// Explicit self-harm grade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_harm: Option<String>,
    /// Numeric self-harm score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_harm_score: Option<f64>,
    /// Explicit suicide grade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suicide: Option<String>,
    /// Numeric suicide score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suicide_score: Option<f64>,
    /// Violence mentioned
    #[serde(default)]
    pub violence: bool,
    /// Abuse mentioned
    #[serde(default)]
    pub abuse_mention: bool,
}

/// One symbol entry in the model payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSymbol {
    pub symbol: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Structured analysis payload returned by the model service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisPayload {
    /// Free-text summary
    pub summary: String,
    /// Emotion label -> intensity in 0..=1
    #[serde(default)]
    pub emotions: BTreeMap<String, f64>,
    /// Overall sentiment in -1..=1
    pub sentiment_score: f64,
    /// Ordered theme labels
    #[serde(default)]
    pub themes: Vec<String>,
    /// Ordered symbol entries
    #[serde(default)]
    pub symbols: Vec<RawSymbol>,
    /// Risk sub-payload; absence is tolerated (classifier logs it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_flags: Option<RawRiskBlock>,
}

impl AnalysisPayload {
    /// Validate the payload against its declared numeric ranges
    ///
    /// # Errors
    ///
    /// Returns the first violation found: an empty summary, an emotion
    /// intensity outside 0..=1, a sentiment outside -1..=1, or a symbol
    /// confidence outside 0..=1.
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.summary.trim().is_empty() {
            return Err(SharedError::validation("summary", "must not be empty"));
        }

        for (label, intensity) in &self.emotions {
            if !(0.0..=1.0).contains(intensity) || !intensity.is_finite() {
                return Err(SharedError::validation(
                    format!("emotions.{label}"),
                    format!("intensity {intensity} outside 0..=1"),
                ));
            }
        }

        if !(-1.0..=1.0).contains(&self.sentiment_score) || !self.sentiment_score.is_finite() {
            return Err(SharedError::validation(
                "sentiment_score",
                format!("score {} outside -1..=1", self.sentiment_score),
            ));
        }

        for (idx, entry) in self.symbols.iter().enumerate() {
            if !(0.0..=1.0).contains(&entry.confidence) || !entry.confidence.is_finite() {
                return Err(SharedError::validation(
                    format!("symbols[{idx}].confidence"),
                    format!("confidence {} outside 0..=1", entry.confidence),
                ));
            }
        }

        if let Some(risk) = &self.risk_flags {
            for (field, score) in [
                ("risk_flags.self_harm_score", risk.self_harm_score),
                ("risk_flags.suicide_score", risk.suicide_score),
            ] {
                if let Some(score) = score {
                    if !(0.0..=1.0).contains(&score) || !score.is_finite() {
                        return Err(SharedError::validation(
                            field,
                            format!("score {score} outside 0..=1"),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
