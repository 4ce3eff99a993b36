//! Dream Record Data Structures
//!
//! This module defines the dream record and its embedded analysis
//! sub-document. A dream record is owned by the submitting user; the
//! analysis pipeline is the only writer of its `status`, `analysis`,
//! `failure` and escalation fields, while the share policy is mutated
//! only by the user.
//!
//! # Lifecycle
//!
//! A record moves through `submitted → processing → {analyzed, failed}`.
//! The invariant maintained by the pipeline is that `status` is
//! `analyzed` if and only if `analysis` is present and complete; the two
//! are always written in a single atomic store operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lifecycle state of a dream record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DreamStatus {
    /// Submitted by the user, not yet picked up by the pipeline
    Submitted,
    /// An analysis attempt is in flight
    Processing,
    /// Analysis completed and persisted
    Analyzed,
    /// Analysis failed after retries (or a non-retryable error)
    Failed,
}

/// Risk signal strength for a single category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// No signal detected
    #[default]
    None,
    /// Weak signal, below the high threshold
    Low,
    /// Strong signal, warrants escalation
    High,
}

impl RiskTier {
    /// Whether this tier warrants an escalation call
    pub fn is_actionable(&self) -> bool {
        !matches!(self, RiskTier::None)
    }
}

/// Risk flags derived from a model analysis
///
/// Any tier other than `none` must trigger exactly one escalation call
/// per dream, recorded via the record's `escalated_at` timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RiskFlags {
    /// Self-harm signal tier
    pub self_harm: RiskTier,
    /// Suicide signal tier
    pub suicide: RiskTier,
    /// Violence mentioned in the narrative
    pub violence: bool,
    /// Abuse mentioned in the narrative
    pub abuse_mention: bool,
}

impl RiskFlags {
    /// Whether any tier warrants notifying the escalation path
    pub fn requires_escalation(&self) -> bool {
        self.self_harm.is_actionable() || self.suicide.is_actionable()
    }

    /// The strongest tier across categories
    pub fn max_tier(&self) -> RiskTier {
        self.self_harm.max(self.suicide)
    }
}

/// One symbol identified in the dream narrative
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolEntry {
    /// The symbol label (e.g. "falling", "water")
    pub symbol: String,
    /// Model confidence in 0..=1
    pub confidence: f64,
    /// Short free-text explanation
    pub explanation: Option<String>,
}

/// Structured analysis produced by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    /// Identifier of the model that produced this analysis
    pub model: String,
    /// When the analysis was generated
    pub generated_at: DateTime<Utc>,
    /// Free-text summary of the dream
    pub summary: String,
    /// Emotion label -> intensity score in 0..=1
    pub emotions: BTreeMap<String, f64>,
    /// Overall sentiment in -1..=1
    pub sentiment_score: f64,
    /// Ordered theme labels
    pub themes: Vec<String>,
    /// Ordered symbol entries
    pub symbols: Vec<SymbolEntry>,
    /// Derived risk flags
    pub risk_flags: RiskFlags,
}

/// Why an analysis attempt ended in `failed`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Transient model errors exhausted the retry budget
    TransientExhausted,
    /// The model returned a payload that failed schema validation
    MalformedResponse,
    /// The model service rejected the request outright (non-retryable)
    UpstreamRejected,
    /// The record had neither text nor a usable transcript
    EmptyNarrative,
}

/// Failure details captured on a `failed` record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisFailure {
    /// Machine-readable reason code
    pub reason: FailureReason,
    /// Raw error detail for audits
    pub detail: String,
    /// When the failure was recorded
    pub failed_at: DateTime<Utc>,
}

/// User-controlled sharing policy for a dream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SharePolicy {
    /// May be shared with the user's groups
    pub shareable: bool,
    /// May appear anonymously in the forum
    pub forum_anonymous: bool,
    /// May be used for research
    pub allow_research: bool,
}

/// A user-submitted dream and its analysis lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DreamRecord {
    /// Unique record id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// When the dream occurred (client-provided, UTC)
    pub timestamp: DateTime<Utc>,
    /// IANA timezone the dream was recorded in
    pub timezone: String,
    /// Raw narrative text
    pub text_content: Option<String>,
    /// Reference to an uploaded audio narration
    pub audio_url: Option<String>,
    /// Transcript of the audio narration, if transcribed
    pub audio_transcript: Option<String>,
    /// BCP 47 language tag of the narrative
    pub language: String,
    /// Lifecycle state
    pub status: DreamStatus,
    /// Embedded analysis, present once `status` is `analyzed`
    pub analysis: Option<AnalysisResult>,
    /// Failure details, present once `status` is `failed`
    pub failure: Option<AnalysisFailure>,
    /// When the escalation notifier was successfully called
    pub escalated_at: Option<DateTime<Utc>>,
    /// User-controlled sharing policy
    pub share_policy: SharePolicy,
    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl DreamRecord {
    /// Create a new record in `submitted` state
    pub fn new(user_id: Uuid, text_content: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            timestamp: now,
            timezone: "UTC".to_string(),
            text_content,
            audio_url: None,
            audio_transcript: None,
            language: "en".to_string(),
            status: DreamStatus::Submitted,
            analysis: None,
            failure: None,
            escalated_at: None,
            share_policy: SharePolicy::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the dream timestamp and timezone
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>, timezone: impl Into<String>) -> Self {
        self.timestamp = timestamp;
        self.timezone = timezone.into();
        self
    }

    /// Set the narrative language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Attach an audio reference and optional transcript
    pub fn with_audio(mut self, url: impl Into<String>, transcript: Option<String>) -> Self {
        self.audio_url = Some(url.into());
        self.audio_transcript = transcript;
        self
    }

    /// Set the sharing policy
    pub fn with_share_policy(mut self, policy: SharePolicy) -> Self {
        self.share_policy = policy;
        self
    }

    /// The text the model should analyze: narrative text, else transcript
    pub fn narrative(&self) -> Option<&str> {
        self.text_content
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                self.audio_transcript
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
            })
    }
}
