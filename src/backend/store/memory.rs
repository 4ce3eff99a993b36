//! In-Memory Storage
//!
//! Process-local implementations of the storage traits, used when no
//! `DATABASE_URL` is configured and throughout the test suite. All
//! mutations happen under a single mutex, which trivially gives
//! `update_analysis` its required atomicity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::shared::{AnalysisFailure, AnalysisResult, DreamRecord, DreamStatus, GroupSession};

use super::{DreamStore, GroupDirectory, StoreError};

/// In-memory dream record store
#[derive(Default)]
pub struct MemoryDreamStore {
    records: Mutex<HashMap<Uuid, DreamRecord>>,
}

impl MemoryDreamStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a record, simulating an external deletion (tests)
    pub fn remove(&self, dream_id: Uuid) -> Option<DreamRecord> {
        self.records.lock().unwrap().remove(&dream_id)
    }

    fn with_record<T>(
        &self,
        dream_id: Uuid,
        f: impl FnOnce(&mut DreamRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&dream_id)
            .ok_or_else(|| StoreError::not_found(dream_id))?;
        let out = f(record);
        record.updated_at = Utc::now();
        Ok(out)
    }
}

#[async_trait]
impl DreamStore for MemoryDreamStore {
    async fn load(&self, dream_id: Uuid) -> Result<DreamRecord, StoreError> {
        self.records
            .lock()
            .unwrap()
            .get(&dream_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(dream_id))
    }

    async fn save(&self, record: &DreamRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<DreamRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut out: Vec<DreamRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit.max(0) as usize);
        Ok(out)
    }

    async fn set_status(&self, dream_id: Uuid, status: DreamStatus) -> Result<(), StoreError> {
        self.with_record(dream_id, |r| r.status = status)
    }

    async fn update_analysis(
        &self,
        dream_id: Uuid,
        analysis: AnalysisResult,
        status: DreamStatus,
    ) -> Result<(), StoreError> {
        self.with_record(dream_id, |r| {
            r.analysis = Some(analysis);
            r.failure = None;
            r.status = status;
        })
    }

    async fn mark_failed(&self, dream_id: Uuid, failure: AnalysisFailure) -> Result<(), StoreError> {
        self.with_record(dream_id, |r| {
            r.failure = Some(failure);
            r.status = DreamStatus::Failed;
        })
    }

    async fn mark_escalated(&self, dream_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_record(dream_id, |r| r.escalated_at = Some(at))
    }
}

/// In-memory group membership directory
#[derive(Default)]
pub struct MemoryGroupDirectory {
    groups: Mutex<HashMap<Uuid, GroupSession>>,
}

impl MemoryGroupDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group session (membership lifecycle is external)
    pub fn insert(&self, group: GroupSession) {
        self.groups.lock().unwrap().insert(group.id, group);
    }
}

#[async_trait]
impl GroupDirectory for MemoryGroupDirectory {
    async fn group(&self, group_id: Uuid) -> Result<Option<GroupSession>, StoreError> {
        Ok(self.groups.lock().unwrap().get(&group_id).cloned())
    }
}
