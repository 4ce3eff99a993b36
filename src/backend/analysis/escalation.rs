//! Escalation Notification
//!
//! When a dream's risk flags carry a non-`none` tier the pipeline hands
//! the case to an `EscalationNotifier` exactly once. Delivery is
//! fire-and-forget from the pipeline's perspective: a failed
//! notification is logged and the analyzed status stands, since losing
//! the analysis would be worse than a missed notification attempt.
//! Redelivery of unnotified high-risk records is an external
//! reconciliation concern.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::RiskFlags;

/// Errors that can occur while delivering an escalation
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The webhook rejected the notification
    #[error("escalation hook error (status {status})")]
    Rejected { status: u16 },

    /// Transport-level failure
    #[error("escalation delivery failed: {0}")]
    Delivery(String),
}

/// Hook into the human-support path (mentor alerting, hotline)
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    /// Notify the support path about a high-risk dream
    async fn notify(
        &self,
        dream_id: Uuid,
        user_id: Uuid,
        flags: &RiskFlags,
    ) -> Result<(), EscalationError>;
}

#[derive(Serialize)]
struct EscalationPayload<'a> {
    dream_id: Uuid,
    user_id: Uuid,
    #[serde(flatten)]
    flags: &'a RiskFlags,
    occurred_at: chrono::DateTime<Utc>,
}

/// Webhook-backed notifier
///
/// Posts the escalation to a configured support-hotline hook URL.
pub struct WebhookEscalationNotifier {
    client: reqwest::Client,
    hook_url: String,
}

impl WebhookEscalationNotifier {
    /// Create a notifier for the given hook URL
    pub fn new(hook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            hook_url: hook_url.into(),
        }
    }
}

#[async_trait]
impl EscalationNotifier for WebhookEscalationNotifier {
    async fn notify(
        &self,
        dream_id: Uuid,
        user_id: Uuid,
        flags: &RiskFlags,
    ) -> Result<(), EscalationError> {
        let payload = EscalationPayload {
            dream_id,
            user_id,
            flags,
            occurred_at: Utc::now(),
        };

        let response = self
            .client
            .post(&self.hook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EscalationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EscalationError::Rejected {
                status: response.status().as_u16(),
            });
        }

        tracing::info!(
            "[Escalation] notified support hook for dream {} (max tier {:?})",
            dream_id,
            flags.max_tier()
        );
        Ok(())
    }
}

/// Notifier used when no hook URL is configured
///
/// Logs the escalation at warn level so a misconfigured deployment is
/// loud about dropping crisis signals.
#[derive(Default)]
pub struct NoopEscalationNotifier;

#[async_trait]
impl EscalationNotifier for NoopEscalationNotifier {
    async fn notify(
        &self,
        dream_id: Uuid,
        user_id: Uuid,
        flags: &RiskFlags,
    ) -> Result<(), EscalationError> {
        tracing::warn!(
            "[Escalation] no hook configured; dropping escalation for dream {} (user {}, flags {:?})",
            dream_id,
            user_id,
            flags
        );
        Ok(())
    }
}
