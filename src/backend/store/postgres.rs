//! PostgreSQL Storage
//!
//! sqlx-backed implementation of `DreamStore`. The analysis and failure
//! sub-documents are stored as JSONB next to the scalar lifecycle
//! columns; `update_analysis` and `mark_failed` are single UPDATE
//! statements, which gives the analysis+status pair its required
//! atomicity with respect to concurrent readers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::shared::{
    AnalysisFailure, AnalysisResult, DreamRecord, DreamStatus, SharePolicy,
};

use super::{DreamStore, StoreError};

/// PostgreSQL dream record store
#[derive(Clone)]
pub struct PgDreamStore {
    pool: PgPool,
}

impl PgDreamStore {
    /// Create a store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert a status to its database representation
fn status_to_str(status: DreamStatus) -> &'static str {
    match status {
        DreamStatus::Submitted => "submitted",
        DreamStatus::Processing => "processing",
        DreamStatus::Analyzed => "analyzed",
        DreamStatus::Failed => "failed",
    }
}

/// Parse a status from its database representation
fn status_from_str(s: &str) -> DreamStatus {
    match s {
        "processing" => DreamStatus::Processing,
        "analyzed" => DreamStatus::Analyzed,
        "failed" => DreamStatus::Failed,
        _ => DreamStatus::Submitted,
    }
}

/// Map a database row to a `DreamRecord`
fn row_to_record(row: &PgRow) -> Result<DreamRecord, StoreError> {
    let status: String = row.try_get("status")?;

    let analysis: Option<serde_json::Value> = row.try_get("analysis")?;
    let analysis: Option<AnalysisResult> = analysis
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| StoreError::backend(format!("bad analysis document: {e}")))?;

    let failure: Option<serde_json::Value> = row.try_get("failure")?;
    let failure: Option<AnalysisFailure> = failure
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| StoreError::backend(format!("bad failure document: {e}")))?;

    let share_policy: serde_json::Value = row.try_get("share_policy")?;
    let share_policy: SharePolicy = serde_json::from_value(share_policy)
        .map_err(|e| StoreError::backend(format!("bad share policy document: {e}")))?;

    Ok(DreamRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        timestamp: row.try_get("timestamp")?,
        timezone: row.try_get("timezone")?,
        text_content: row.try_get("text_content")?,
        audio_url: row.try_get("audio_url")?,
        audio_transcript: row.try_get("audio_transcript")?,
        language: row.try_get("language")?,
        status: status_from_str(&status),
        analysis,
        failure,
        escalated_at: row.try_get("escalated_at")?,
        share_policy,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Serialize a value into a JSONB parameter
fn to_jsonb<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::backend(e.to_string()))
}

const SELECT_COLUMNS: &str = r#"
    id, user_id, timestamp, timezone, text_content, audio_url,
    audio_transcript, language, status, analysis, failure,
    escalated_at, share_policy, created_at, updated_at
"#;

#[async_trait]
impl DreamStore for PgDreamStore {
    async fn load(&self, dream_id: Uuid) -> Result<DreamRecord, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM dreams WHERE id = $1"
        ))
        .bind(dream_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(dream_id))?;

        row_to_record(&row)
    }

    async fn save(&self, record: &DreamRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO dreams (
                id, user_id, timestamp, timezone, text_content, audio_url,
                audio_transcript, language, status, analysis, failure,
                escalated_at, share_policy, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                text_content = EXCLUDED.text_content,
                audio_url = EXCLUDED.audio_url,
                audio_transcript = EXCLUDED.audio_transcript,
                share_policy = EXCLUDED.share_policy,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.timestamp)
        .bind(&record.timezone)
        .bind(&record.text_content)
        .bind(&record.audio_url)
        .bind(&record.audio_transcript)
        .bind(&record.language)
        .bind(status_to_str(record.status))
        .bind(record.analysis.as_ref().map(to_jsonb).transpose()?)
        .bind(record.failure.as_ref().map(to_jsonb).transpose()?)
        .bind(record.escalated_at)
        .bind(to_jsonb(&record.share_policy)?)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<DreamRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM dreams WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn set_status(&self, dream_id: Uuid, status: DreamStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE dreams SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(dream_id)
            .bind(status_to_str(status))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(dream_id));
        }
        Ok(())
    }

    async fn update_analysis(
        &self,
        dream_id: Uuid,
        analysis: AnalysisResult,
        status: DreamStatus,
    ) -> Result<(), StoreError> {
        // Single UPDATE: analysis and status become visible together
        let result = sqlx::query(
            r#"
            UPDATE dreams
            SET analysis = $2, failure = NULL, status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(dream_id)
        .bind(to_jsonb(&analysis)?)
        .bind(status_to_str(status))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(dream_id));
        }
        Ok(())
    }

    async fn mark_failed(&self, dream_id: Uuid, failure: AnalysisFailure) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE dreams
            SET failure = $2, status = 'failed', updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(dream_id)
        .bind(to_jsonb(&failure)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(dream_id));
        }
        Ok(())
    }

    async fn mark_escalated(&self, dream_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE dreams SET escalated_at = $2, updated_at = NOW() WHERE id = $1")
                .bind(dream_id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(dream_id));
        }
        Ok(())
    }
}
