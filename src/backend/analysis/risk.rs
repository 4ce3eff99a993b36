//! Risk Classification
//!
//! Derives typed `RiskFlags` from a validated analysis payload. The
//! classifier is a pure function of the payload and the configured
//! thresholds: no hidden state, deterministic for a given input.
//!
//! # Policy
//!
//! Per category (self-harm, suicide) the tier is the maximum of:
//!
//! - the score-derived tier: score >= high threshold -> `High`,
//!   score >= low threshold -> `Low`, else `None`
//! - the grade-derived tier from the model's explicit label:
//!   `high`/`medium` -> `High`, `low` -> `Low`, `none` -> `None`
//!
//! An ambiguous or unknown grade never lowers a tier the raw score
//! implies. An absent or unrecognizable risk sub-payload defaults to
//! `None` and is logged as an anomaly rather than silently ignored.

use crate::shared::config::RiskThresholds;
use crate::shared::{RiskFlags, RiskTier};

use super::payload::{AnalysisPayload, RawRiskBlock};

/// Classify a validated payload into risk flags
pub fn classify(payload: &AnalysisPayload, thresholds: &RiskThresholds) -> RiskFlags {
    let Some(risk) = &payload.risk_flags else {
        tracing::warn!("[Risk] payload carried no risk block, defaulting all tiers to none");
        return RiskFlags::default();
    };

    RiskFlags {
        self_harm: category_tier("self_harm", risk.self_harm.as_deref(), risk.self_harm_score, thresholds),
        suicide: category_tier("suicide", risk.suicide.as_deref(), risk.suicide_score, thresholds),
        violence: risk.violence,
        abuse_mention: risk.abuse_mention,
    }
}

/// Reconcile one category's explicit grade and numeric score
fn category_tier(
    category: &str,
    grade: Option<&str>,
    score: Option<f64>,
    thresholds: &RiskThresholds,
) -> RiskTier {
    let from_score = match score {
        Some(s) if s >= thresholds.high => RiskTier::High,
        Some(s) if s >= thresholds.low => RiskTier::Low,
        Some(_) => RiskTier::None,
        None => RiskTier::None,
    };

    let from_grade = match grade.map(|g| g.trim().to_ascii_lowercase()) {
        Some(g) if g == "high" || g == "medium" => RiskTier::High,
        Some(g) if g == "low" => RiskTier::Low,
        Some(g) if g == "none" => RiskTier::None,
        Some(g) => {
            tracing::warn!(
                "[Risk] unrecognized {category} grade '{g}', falling back to score-derived tier"
            );
            RiskTier::None
        }
        None => RiskTier::None,
    };

    from_score.max(from_grade)
}

/// Whether the raw block carries any signal at all (used for logging)
pub fn has_signal(risk: &RawRiskBlock) -> bool {
    risk.self_harm.is_some()
        || risk.suicide.is_some()
        || risk.self_harm_score.is_some()
        || risk.suicide_score.is_some()
        || risk.violence
        || risk.abuse_mention
}
