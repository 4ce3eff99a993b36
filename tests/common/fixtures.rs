//! Test fixtures and doubles for the analysis pipeline

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use yuu::backend::analysis::escalation::{EscalationError, EscalationNotifier};
use yuu::backend::analysis::invoker::{AnalysisRequest, ModelError, ModelInvoker};
use yuu::backend::analysis::payload::{AnalysisPayload, RawRiskBlock};
use yuu::backend::store::{DreamStore, MemoryDreamStore};
use yuu::shared::config::AnalysisConfig;
use yuu::shared::{DreamRecord, DreamStatus, RiskFlags};

/// Pipeline configuration with fast backoff for tests
pub fn test_analysis_config() -> AnalysisConfig {
    AnalysisConfig {
        worker_count: 2,
        queue_capacity: 16,
        max_attempts: 3,
        backoff_base: Duration::from_millis(1),
        ..AnalysisConfig::default()
    }
}

/// A calm, low-risk analysis payload
pub fn calm_payload() -> AnalysisPayload {
    AnalysisPayload {
        summary: "an uneasy but manageable dream".to_string(),
        emotions: BTreeMap::from([("anxiety".to_string(), 0.78)]),
        sentiment_score: -0.35,
        themes: vec!["water".to_string()],
        symbols: vec![],
        risk_flags: Some(RawRiskBlock {
            self_harm: Some("none".to_string()),
            suicide: Some("none".to_string()),
            violence: false,
            abuse_mention: false,
            ..RawRiskBlock::default()
        }),
    }
}

/// A payload whose suicide grade is high
pub fn high_risk_payload() -> AnalysisPayload {
    let mut payload = calm_payload();
    payload.risk_flags = Some(RawRiskBlock {
        suicide: Some("high".to_string()),
        ..RawRiskBlock::default()
    });
    payload
}

/// Model invoker that replays a scripted sequence of outcomes
///
/// Once the script is exhausted every further call succeeds with the
/// calm payload. An optional per-call delay keeps attempts in flight
/// long enough for concurrency tests to observe them.
pub struct ScriptedInvoker {
    script: Mutex<VecDeque<Result<AnalysisPayload, ModelError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedInvoker {
    pub fn new(script: Vec<Result<AnalysisPayload, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, _request: &AnalysisRequest) -> Result<AnalysisPayload, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(calm_payload()))
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }
}

/// Escalation notifier that records every invocation
#[derive(Default)]
pub struct CountingNotifier {
    calls: Mutex<Vec<(Uuid, RiskFlags)>>,
    pub fail: bool,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Uuid, RiskFlags)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EscalationNotifier for CountingNotifier {
    async fn notify(
        &self,
        dream_id: Uuid,
        _user_id: Uuid,
        flags: &RiskFlags,
    ) -> Result<(), EscalationError> {
        self.calls.lock().unwrap().push((dream_id, flags.clone()));
        if self.fail {
            Err(EscalationError::Delivery("hook unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Poll the store until the record reaches the expected status
pub async fn wait_for_status(
    store: &MemoryDreamStore,
    dream_id: Uuid,
    expected: DreamStatus,
) -> DreamRecord {
    for _ in 0..400 {
        let record = store.load(dream_id).await.unwrap();
        if record.status == expected {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("dream {dream_id} never reached {expected:?}");
}
