//! Storage Traits
//!
//! This module defines the storage seams the core depends on. Durable
//! persistence of dream records and group membership is an external
//! concern; the pipeline and realtime layer talk to these traits only.
//!
//! # Atomicity
//!
//! `update_analysis` writes the analysis sub-document and the record
//! status in one call so no reader can observe an `analyzed` status
//! without its analysis (or a half-populated analysis). Each
//! implementation provides that atomicity its own way: a single UPDATE
//! in PostgreSQL, a single locked mutation in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{AnalysisFailure, AnalysisResult, DreamRecord, DreamStatus, GroupSession};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryDreamStore, MemoryGroupDirectory};
pub use postgres::PgDreamStore;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist (or was deleted mid-flight)
    #[error("record not found: {id}")]
    NotFound { id: Uuid },

    /// The underlying store failed
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound { id }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

/// Durable storage for dream records
///
/// The pipeline is the only writer of `status`, `analysis`, `failure`
/// and escalation fields; the API surface writes new records and share
/// policies.
#[async_trait]
pub trait DreamStore: Send + Sync {
    /// Load a record by id
    async fn load(&self, dream_id: Uuid) -> Result<DreamRecord, StoreError>;

    /// Persist a new record
    async fn save(&self, record: &DreamRecord) -> Result<(), StoreError>;

    /// List a user's records, newest first
    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<DreamRecord>, StoreError>;

    /// Set the record status only (used for the `processing` transition)
    async fn set_status(&self, dream_id: Uuid, status: DreamStatus) -> Result<(), StoreError>;

    /// Atomically persist the analysis and flip the status to `analyzed`
    async fn update_analysis(
        &self,
        dream_id: Uuid,
        analysis: AnalysisResult,
        status: DreamStatus,
    ) -> Result<(), StoreError>;

    /// Atomically record a failure and flip the status to `failed`
    async fn mark_failed(&self, dream_id: Uuid, failure: AnalysisFailure) -> Result<(), StoreError>;

    /// Stamp the escalation timestamp after a successful notification
    async fn mark_escalated(&self, dream_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Read-only view of group membership
///
/// Group lifecycle is owned elsewhere; the realtime layer reads
/// membership to authorize fan-out.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Look up a group session by id
    async fn group(&self, group_id: Uuid) -> Result<Option<GroupSession>, StoreError>;
}
