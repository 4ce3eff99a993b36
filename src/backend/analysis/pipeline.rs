//! Analysis Pipeline
//!
//! Drives the per-dream state machine `submitted → processing →
//! {analyzed, failed}`. Work items are processed by a bounded worker
//! pool; the pool size bounds the number of concurrent model calls, and
//! the bounded queue pushes back on bursts of submissions instead of
//! spawning unbounded concurrent calls.
//!
//! # Single Flight
//!
//! At most one analysis attempt per dream id is in flight at any time.
//! A duplicate submission while an id is queued or processing is
//! rejected synchronously - not queued - to avoid duplicate model spend
//! and conflicting writes.
//!
//! # Escalation
//!
//! A non-`none` risk tier triggers exactly one escalation call per
//! dream, guarded by the record's `escalated_at` stamp. Escalation
//! failures are logged and never roll back the `analyzed` status.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::store::{DreamStore, StoreError};
use crate::shared::config::AnalysisConfig;
use crate::shared::{
    AnalysisFailure, AnalysisResult, DreamRecord, DreamStatus, FailureReason, RiskFlags,
    SymbolEntry,
};

use super::escalation::EscalationNotifier;
use super::invoker::{AnalysisRequest, ModelError, ModelInvoker};
use super::payload::AnalysisPayload;
use super::risk;

/// Errors surfaced to submitters
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The dream already has an analysis attempt in flight
    #[error("analysis already in flight for dream {dream_id}")]
    DuplicateSubmission { dream_id: Uuid },

    /// The job queue is at capacity
    #[error("analysis queue is full")]
    QueueFull,

    /// The pipeline workers have shut down
    #[error("analysis pipeline is shut down")]
    Closed,
}

/// Handle to the analysis worker pool
///
/// Cloning the handle is cheap; all clones share the same queue and
/// single-flight guard.
#[derive(Clone)]
pub struct AnalysisPipeline {
    jobs: mpsc::Sender<Uuid>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl AnalysisPipeline {
    /// Spawn the worker pool and return a submission handle
    pub fn spawn(
        store: Arc<dyn DreamStore>,
        invoker: Arc<dyn ModelInvoker>,
        notifier: Arc<dyn EscalationNotifier>,
        config: AnalysisConfig,
    ) -> Self {
        let (jobs, rx) = mpsc::channel::<Uuid>(config.queue_capacity);
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let worker = Arc::new(Worker {
            store,
            invoker,
            notifier,
            config,
        });

        for worker_id in 0..worker.config.worker_count {
            let rx = rx.clone();
            let worker = worker.clone();
            let in_flight = in_flight.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only for the dequeue itself
                    let job = { rx.lock().await.recv().await };
                    let Some(dream_id) = job else {
                        tracing::debug!("[Pipeline] worker {worker_id} shutting down");
                        break;
                    };

                    worker.process(dream_id).await;
                    in_flight.lock().unwrap().remove(&dream_id);
                }
            });
        }

        Self { jobs, in_flight }
    }

    /// Enqueue a dream for analysis
    ///
    /// Rejects synchronously if the id is already in flight
    /// (`DuplicateSubmission`) or the queue is at capacity
    /// (`QueueFull`). Neither rejection mutates the record.
    pub fn submit(&self, dream_id: Uuid) -> Result<(), PipelineError> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(dream_id) {
                tracing::info!("[Pipeline] rejecting duplicate submission for dream {dream_id}");
                return Err(PipelineError::DuplicateSubmission { dream_id });
            }
        }

        match self.jobs.try_send(dream_id) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Submission failed, release the single-flight slot
                self.in_flight.lock().unwrap().remove(&dream_id);
                match err {
                    mpsc::error::TrySendError::Full(_) => {
                        tracing::warn!("[Pipeline] queue full, rejecting dream {dream_id}");
                        Err(PipelineError::QueueFull)
                    }
                    mpsc::error::TrySendError::Closed(_) => Err(PipelineError::Closed),
                }
            }
        }
    }

    /// Whether the given dream currently has an attempt in flight
    pub fn is_in_flight(&self, dream_id: Uuid) -> bool {
        self.in_flight.lock().unwrap().contains(&dream_id)
    }
}

struct Worker {
    store: Arc<dyn DreamStore>,
    invoker: Arc<dyn ModelInvoker>,
    notifier: Arc<dyn EscalationNotifier>,
    config: AnalysisConfig,
}

impl Worker {
    /// Run one dream through the state machine
    async fn process(&self, dream_id: Uuid) {
        let record = match self.store.load(dream_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!("[Pipeline] dream {dream_id} vanished before pickup, dropping job");
                return;
            }
            Err(err) => {
                tracing::error!("[Pipeline] failed to load dream {dream_id}: {err}");
                return;
            }
        };

        // Re-running an analyzed record without explicit resubmission is
        // a no-op
        if record.status == DreamStatus::Analyzed {
            tracing::info!("[Pipeline] dream {dream_id} already analyzed, skipping");
            return;
        }

        if let Err(err) = self.store.set_status(dream_id, DreamStatus::Processing).await {
            tracing::error!("[Pipeline] could not mark dream {dream_id} processing: {err}");
            return;
        }

        let Some(narrative) = record.narrative().map(str::to_owned) else {
            tracing::warn!("[Pipeline] dream {dream_id} has no analyzable text");
            self.fail(
                dream_id,
                FailureReason::EmptyNarrative,
                "no text content or transcript available".to_string(),
            )
            .await;
            return;
        };

        let request = AnalysisRequest {
            from_transcript: record.text_content.as_deref().map_or(true, |t| t.trim().is_empty()),
            narrative,
            language: record.language.clone(),
        };

        let payload = match self.invoke_with_retries(dream_id, &request).await {
            Ok(payload) => payload,
            Err((reason, detail)) => {
                self.fail(dream_id, reason, detail).await;
                return;
            }
        };

        let flags = risk::classify(&payload, &self.config.thresholds);
        let analysis = build_result(self.invoker.model_id(), payload, flags.clone());

        match self
            .store
            .update_analysis(dream_id, analysis, DreamStatus::Analyzed)
            .await
        {
            Ok(()) => {
                tracing::info!("[Pipeline] dream {dream_id} analyzed");
            }
            Err(StoreError::NotFound { .. }) => {
                // Deleted externally mid-flight; the result is orphaned
                tracing::info!("[Pipeline] dream {dream_id} deleted mid-flight, result discarded");
                return;
            }
            Err(err) => {
                tracing::error!("[Pipeline] failed to persist analysis for dream {dream_id}: {err}");
                return;
            }
        }

        if flags.requires_escalation() {
            self.escalate_once(&record, &flags).await;
        }
    }

    /// Invoke the model with bounded retries and exponential backoff
    async fn invoke_with_retries(
        &self,
        dream_id: Uuid,
        request: &AnalysisRequest,
    ) -> Result<AnalysisPayload, (FailureReason, String)> {
        let max_attempts = self.config.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.invoker.invoke(request).await {
                Ok(payload) => return Ok(payload),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        "[Pipeline] transient model error for dream {dream_id} \
                         (attempt {attempt}/{max_attempts}): {err}"
                    );
                    last_error = err.to_string();
                    if attempt < max_attempts {
                        let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(err @ ModelError::MalformedResponse { .. }) => {
                    tracing::error!("[Pipeline] malformed model response for dream {dream_id}: {err}");
                    return Err((FailureReason::MalformedResponse, err.to_string()));
                }
                Err(err) => {
                    tracing::error!("[Pipeline] model rejected dream {dream_id}: {err}");
                    return Err((FailureReason::UpstreamRejected, err.to_string()));
                }
            }
        }

        Err((FailureReason::TransientExhausted, last_error))
    }

    /// Mark the record failed; escalation is never attempted on failure
    async fn fail(&self, dream_id: Uuid, reason: FailureReason, detail: String) {
        let failure = AnalysisFailure {
            reason,
            detail,
            failed_at: Utc::now(),
        };
        match self.store.mark_failed(dream_id, failure).await {
            Ok(()) => tracing::info!("[Pipeline] dream {dream_id} marked failed ({reason:?})"),
            Err(StoreError::NotFound { .. }) => {
                tracing::info!("[Pipeline] dream {dream_id} deleted mid-flight, failure discarded");
            }
            Err(err) => {
                tracing::error!("[Pipeline] could not mark dream {dream_id} failed: {err}");
            }
        }
    }

    /// Notify the escalation path at most once per dream
    async fn escalate_once(&self, record: &DreamRecord, flags: &RiskFlags) {
        if record.escalated_at.is_some() {
            tracing::info!(
                "[Pipeline] dream {} already escalated, skipping notification",
                record.id
            );
            return;
        }

        match self.notifier.notify(record.id, record.user_id, flags).await {
            Ok(()) => {
                if let Err(err) = self.store.mark_escalated(record.id, Utc::now()).await {
                    tracing::error!(
                        "[Pipeline] escalation for dream {} delivered but not stamped: {err}",
                        record.id
                    );
                }
            }
            Err(err) => {
                // The analyzed status stands; redelivery is an external
                // reconciliation concern
                tracing::error!(
                    "[Pipeline] escalation delivery failed for dream {}: {err}",
                    record.id
                );
            }
        }
    }
}

/// Assemble the persisted analysis from a validated payload
fn build_result(model: &str, payload: AnalysisPayload, flags: RiskFlags) -> AnalysisResult {
    AnalysisResult {
        model: model.to_string(),
        generated_at: Utc::now(),
        summary: payload.summary,
        emotions: payload.emotions,
        sentiment_score: payload.sentiment_score,
        themes: payload.themes,
        symbols: payload
            .symbols
            .into_iter()
            .map(|s| SymbolEntry {
                symbol: s.symbol,
                confidence: s.confidence,
                explanation: s.explanation,
            })
            .collect(),
        risk_flags: flags,
    }
}
