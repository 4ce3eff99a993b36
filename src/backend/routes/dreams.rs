//! Dream Journaling Handlers
//!
//! HTTP handlers for submitting dreams and reading back their analysis
//! state. Submission enqueues the dream into the analysis pipeline and
//! returns immediately; the record's `status` field reports progress.
//!
//! Authentication is handled upstream; the caller's identity arrives
//! in the `X-User-Id` header.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::{DreamRecord, DreamStatus, SharePolicy, SharedError};

/// Maximum accepted narrative length in characters
const MAX_TEXT_LENGTH: usize = 20_000;

/// Payload accepted when a user creates a new dream entry
#[derive(Debug, Deserialize)]
pub struct CreateDreamRequest {
    /// Narrative text
    pub text_content: Option<String>,
    /// Client-local dream time (UTC)
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    /// IANA timezone the dream was recorded in
    pub timezone: Option<String>,
    /// BCP 47 language tag
    pub language: Option<String>,
    /// Reference to an uploaded audio narration
    pub audio_url: Option<String>,
    /// Transcript of the audio narration
    pub audio_transcript: Option<String>,
    /// Sharing policy
    pub share_policy: Option<SharePolicy>,
}

/// Query parameters for listing dreams
#[derive(Debug, Deserialize)]
pub struct ListDreamsQuery {
    /// Maximum records to return
    pub limit: Option<i64>,
}

/// Resolve the caller's user id from the `X-User-Id` header
fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, BackendError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            BackendError::handler(StatusCode::UNAUTHORIZED, "Missing X-User-Id header")
        })?;

    Uuid::parse_str(raw)
        .map_err(|_| BackendError::handler(StatusCode::BAD_REQUEST, "Invalid X-User-Id header"))
}

/// Create a dream entry and enqueue it for analysis
///
/// Returns `201 Created` with the stored record in `submitted` status.
/// Analysis runs in the background; the record is readable immediately
/// and flips to `analyzed` or `failed` once the pipeline finishes.
pub async fn create_dream(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDreamRequest>,
) -> Result<(StatusCode, Json<DreamRecord>), BackendError> {
    let user_id = extract_user_id(&headers)?;

    if let Some(text) = &request.text_content {
        if text.len() > MAX_TEXT_LENGTH {
            return Err(SharedError::validation(
                "text_content",
                format!("must not exceed {MAX_TEXT_LENGTH} characters"),
            )
            .into());
        }
    }

    let mut record = DreamRecord::new(user_id, request.text_content);
    if let Some(timestamp) = request.timestamp {
        record = record.with_timestamp(timestamp, request.timezone.unwrap_or_else(|| "UTC".to_string()));
    }
    if let Some(language) = request.language {
        record = record.with_language(language);
    }
    if let Some(url) = request.audio_url {
        record = record.with_audio(url, request.audio_transcript);
    }
    if let Some(policy) = request.share_policy {
        record = record.with_share_policy(policy);
    }

    app_state.store.save(&record).await?;
    tracing::info!("[Dreams] created dream {} for user {}", record.id, user_id);

    // Fire-and-continue: the caller gets the submitted record back
    // while analysis proceeds in the worker pool
    app_state.pipeline.submit(record.id)?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// List the caller's dreams, newest first
pub async fn list_dreams(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListDreamsQuery>,
) -> Result<Json<Vec<DreamRecord>>, BackendError> {
    let user_id = extract_user_id(&headers)?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let records = app_state.store.list_for_user(user_id, limit).await?;
    Ok(Json(records))
}

/// Fetch one dream with its analysis state
pub async fn get_dream(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DreamRecord>, BackendError> {
    let user_id = extract_user_id(&headers)?;
    let record = app_state.store.load(id).await?;

    // Dreams are private to their owner
    if record.user_id != user_id {
        return Err(BackendError::handler(StatusCode::NOT_FOUND, "Dream not found"));
    }

    Ok(Json(record))
}

/// Explicitly resubmit a dream for analysis
///
/// Used to re-drive a `failed` record (or re-analyze an `analyzed`
/// one). A dream whose analysis is still in flight is rejected with
/// `409 Conflict`.
pub async fn resubmit_dream(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<DreamRecord>), BackendError> {
    let user_id = extract_user_id(&headers)?;
    let record = app_state.store.load(id).await?;

    if record.user_id != user_id {
        return Err(BackendError::handler(StatusCode::NOT_FOUND, "Dream not found"));
    }

    // The explicit resubmission resets the lifecycle; a duplicate
    // while processing is rejected by the pipeline's single-flight
    // guard before any state changes
    if app_state.pipeline.is_in_flight(id) {
        return Err(crate::backend::analysis::pipeline::PipelineError::DuplicateSubmission {
            dream_id: id,
        }
        .into());
    }

    app_state.store.set_status(id, DreamStatus::Submitted).await?;
    app_state.pipeline.submit(id)?;

    let record = app_state.store.load(id).await?;
    tracing::info!("[Dreams] resubmitted dream {} for user {}", id, user_id);
    Ok((StatusCode::ACCEPTED, Json(record)))
}
