//! Dream-Analysis Subsystem
//!
//! This module contains the full analysis path for a submitted dream:
//!
//! 1. `pipeline` picks the dream up and drives its state machine
//! 2. `invoker` calls the hosted language model and validates the payload
//! 3. `risk` derives typed risk flags from the validated payload
//! 4. `escalation` notifies the human-support path on non-`none` tiers
//!
//! The pipeline is the only writer of a record's analysis fields.

/// Analysis payload schema and validation
pub mod payload;

/// Model service client
pub mod invoker;

/// Risk classification
pub mod risk;

/// Escalation notification
pub mod escalation;

/// Pipeline orchestration
pub mod pipeline;

pub use escalation::{EscalationNotifier, NoopEscalationNotifier, WebhookEscalationNotifier};
pub use invoker::{AnalysisRequest, HttpModelInvoker, ModelError, ModelInvoker};
pub use payload::{AnalysisPayload, RawRiskBlock};
pub use pipeline::{AnalysisPipeline, PipelineError};
pub use risk::classify;
