//! Backend Module
//!
//! This module contains all server-side code for the Yuu wellness
//! backend. It provides a complete Axum HTTP server around the two core
//! subsystems: the dream-analysis pipeline and the realtime group layer.
//!
//! # Overview
//!
//! The backend module includes:
//! - Axum HTTP server setup and configuration
//! - The dream-analysis pipeline with risk classification and escalation
//! - The group-session realtime layer (registry, broadcaster, presence)
//! - Storage traits with in-memory and PostgreSQL implementations
//! - Route configuration
//! - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── analysis/       - Pipeline, model invoker, risk, escalation
//! ├── realtime/       - Registry, broadcaster, presence
//! ├── store/          - DreamStore / GroupDirectory traits and impls
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! The backend uses shared state (`AppState`) containing the pipeline
//! handle, the connection registry, the broadcaster, the presence
//! tracker and the store. State is shared across request handlers using
//! `Arc`; the registry guards its connection map with a `std::sync`
//! mutex and publishes lifecycle events on a `tokio::sync::broadcast`
//! channel.
//!
//! # Error Handling
//!
//! The backend uses standard HTTP status codes and custom error types:
//! - `BackendError` for handler-level errors
//! - Typed pipeline/model/store errors propagated with the `?` operator

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Dream-analysis pipeline
pub mod analysis;

/// Realtime group-session layer
pub mod realtime;

/// Storage traits and implementations
pub mod store;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use analysis::pipeline::{AnalysisPipeline, PipelineError};
pub use error::BackendError;
pub use realtime::broadcast::GroupBroadcaster;
pub use realtime::presence::PresenceTracker;
pub use realtime::registry::ConnectionRegistry;
pub use store::{DreamStore, GroupDirectory, StoreError};
