//! Application State Management
//!
//! This module defines the application state structure and implements
//! the necessary `FromRef` traits for Axum state extraction.
//!
//! # Architecture
//!
//! The `AppState` struct serves as the central state container for the
//! application, holding:
//! - The dream store and group directory seams
//! - The analysis pipeline handle
//! - The connection registry, broadcaster and presence tracker
//! - The optional database pool
//!
//! # Thread Safety
//!
//! All state is designed to be thread-safe: the trait objects are
//! behind `Arc`, the pipeline handle and broadcaster are cheap clones
//! sharing internal channels, and the registry guards its own map.
//!
//! # State Extraction
//!
//! The `FromRef` implementations allow Axum handlers to extract
//! specific parts of the state without needing the entire `AppState`,
//! following Axum's recommended pattern for state management.

use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

use crate::backend::analysis::pipeline::AnalysisPipeline;
use crate::backend::realtime::broadcast::GroupBroadcaster;
use crate::backend::realtime::presence::PresenceTracker;
use crate::backend::realtime::registry::ConnectionRegistry;
use crate::backend::store::{DreamStore, GroupDirectory};

/// Application state shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Dream record storage
    pub store: Arc<dyn DreamStore>,

    /// Group membership directory
    pub directory: Arc<dyn GroupDirectory>,

    /// Analysis pipeline handle
    pub pipeline: AnalysisPipeline,

    /// Live connection registry
    pub registry: Arc<ConnectionRegistry>,

    /// Group message broadcaster
    pub broadcaster: GroupBroadcaster,

    /// Presence tracker
    pub presence: Arc<PresenceTracker>,

    /// Database connection pool
    ///
    /// This is `None` if the database is not configured (e.g. if the
    /// `DATABASE_URL` environment variable is not set); the server
    /// then runs on the in-memory store.
    pub db_pool: Option<PgPool>,
}

/// Allow handlers to extract the dream store directly
impl FromRef<AppState> for Arc<dyn DreamStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

/// Allow handlers to extract the group directory directly
impl FromRef<AppState> for Arc<dyn GroupDirectory> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.directory.clone()
    }
}

/// Allow handlers to extract the pipeline handle directly
impl FromRef<AppState> for AnalysisPipeline {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.pipeline.clone()
    }
}

/// Allow handlers to extract the connection registry directly
impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

/// Allow handlers to extract the broadcaster directly
impl FromRef<AppState> for GroupBroadcaster {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.broadcaster.clone()
    }
}

/// Allow handlers to extract the presence tracker directly
impl FromRef<AppState> for Arc<PresenceTracker> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}

/// Allow handlers to extract the optional database pool directly
impl FromRef<AppState> for Option<PgPool> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
