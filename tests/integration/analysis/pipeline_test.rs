//! Pipeline lifecycle scenarios
//!
//! Exercises the per-dream state machine end to end against the
//! in-memory store: single-flight submission, retry exhaustion,
//! at-most-once escalation and idempotent re-runs.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use yuu::backend::analysis::invoker::ModelError;
use yuu::backend::analysis::pipeline::{AnalysisPipeline, PipelineError};
use yuu::backend::store::{DreamStore, MemoryDreamStore};
use yuu::shared::{DreamRecord, DreamStatus, FailureReason, RiskTier};

use crate::common::{
    calm_payload, high_risk_payload, test_analysis_config, wait_for_status, CountingNotifier,
    ScriptedInvoker,
};

fn pipeline_with(
    store: Arc<MemoryDreamStore>,
    invoker: Arc<ScriptedInvoker>,
    notifier: Arc<CountingNotifier>,
) -> AnalysisPipeline {
    AnalysisPipeline::spawn(store, invoker, notifier, test_analysis_config())
}

#[tokio::test]
async fn anxious_dream_analyzes_without_escalation() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![Ok(calm_payload())]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker, notifier.clone());

    let record = DreamRecord::new(Uuid::new_v4(), Some("I was adrift at night".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();

    let analyzed = wait_for_status(&store, record.id, DreamStatus::Analyzed).await;
    let analysis = analyzed.analysis.unwrap();

    assert_eq!(analysis.emotions.get("anxiety"), Some(&0.78));
    assert_eq!(analysis.sentiment_score, -0.35);
    assert_eq!(analysis.risk_flags.suicide, RiskTier::None);
    assert_eq!(notifier.call_count(), 0);
    assert!(analyzed.escalated_at.is_none());
}

#[tokio::test]
async fn high_risk_dream_escalates_exactly_once() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![Ok(high_risk_payload())]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker, notifier.clone());

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dark dream".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();

    let analyzed = wait_for_status(&store, record.id, DreamStatus::Analyzed).await;
    assert!(analyzed.escalated_at.is_some());

    let calls = notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, record.id);
    assert_eq!(calls[0].1.suicide, RiskTier::High);
}

#[tokio::test]
async fn escalation_survives_pipeline_rerun() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![
        Ok(high_risk_payload()),
        Ok(high_risk_payload()),
    ]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker, notifier.clone());

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dark dream".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();
    wait_for_status(&store, record.id, DreamStatus::Analyzed).await;
    assert_eq!(notifier.call_count(), 1);

    // Explicit resubmission re-runs the analysis, but the escalation
    // stamp keeps the notification at-most-once per dream
    store
        .set_status(record.id, DreamStatus::Submitted)
        .await
        .unwrap();
    pipeline.submit(record.id).unwrap();
    wait_for_status(&store, record.id, DreamStatus::Analyzed).await;

    assert_eq!(notifier.call_count(), 1);
}

#[tokio::test]
async fn three_timeouts_exhaust_the_retry_budget() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![
        Err(ModelError::Timeout),
        Err(ModelError::Timeout),
        Err(ModelError::Timeout),
    ]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker.clone(), notifier.clone());

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dream".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();

    let failed = wait_for_status(&store, record.id, DreamStatus::Failed).await;
    assert_eq!(
        failed.failure.unwrap().reason,
        FailureReason::TransientExhausted
    );
    assert_eq!(invoker.call_count(), 3);
    assert_eq!(notifier.call_count(), 0);
    assert!(failed.analysis.is_none());
}

#[tokio::test]
async fn malformed_response_never_reaches_analyzed() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![Err(ModelError::malformed(
        "sentiment_score 2.0 outside -1..=1",
    ))]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker.clone(), notifier);

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dream".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();

    let failed = wait_for_status(&store, record.id, DreamStatus::Failed).await;
    assert_eq!(
        failed.failure.unwrap().reason,
        FailureReason::MalformedResponse
    );
    // Non-retryable: exactly one model call
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_submissions_run_once() {
    let store = Arc::new(MemoryDreamStore::new());
    // Keep the attempt in flight long enough for all submitters to race
    let invoker =
        Arc::new(ScriptedInvoker::new(vec![]).with_delay(Duration::from_millis(200)));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker.clone(), notifier);

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dream".to_string()));
    store.save(&record).await.unwrap();

    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..8 {
        match pipeline.submit(record.id) {
            Ok(()) => accepted += 1,
            Err(PipelineError::DuplicateSubmission { .. }) => rejected += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(rejected, 7);

    wait_for_status(&store, record.id, DreamStatus::Analyzed).await;
    // Only the accepted submission ever reached the model
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn rerun_on_analyzed_record_is_a_noop() {
    let store = Arc::new(MemoryDreamStore::new());
    let invoker = Arc::new(ScriptedInvoker::new(vec![]));
    let notifier = Arc::new(CountingNotifier::new());
    let pipeline = pipeline_with(store.clone(), invoker.clone(), notifier);

    let record = DreamRecord::new(Uuid::new_v4(), Some("a dream".to_string()));
    store.save(&record).await.unwrap();
    pipeline.submit(record.id).unwrap();
    let analyzed = wait_for_status(&store, record.id, DreamStatus::Analyzed).await;
    assert_eq!(invoker.call_count(), 1);

    // Submitting again without resetting the status does not re-analyze
    pipeline.submit(record.id).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let after = store.load(record.id).await.unwrap();
    assert_eq!(invoker.call_count(), 1);
    assert_eq!(after.analysis, analyzed.analysis);
}
