//! Yuu - Wellness Backend Core
//!
//! Yuu is the backend core for a dream-journaling wellness application,
//! providing AI-driven dream analysis with crisis detection and real-time
//! peer-support group sessions.
//!
//! # Overview
//!
//! This library provides two independent subsystems:
//!
//! - The **analysis pipeline** takes submitted dream narratives through a
//!   `submitted → processing → {analyzed, failed}` lifecycle: a hosted
//!   language model produces a structured analysis, a risk classifier
//!   derives self-harm/suicide tiers from it, and any non-`none` tier
//!   triggers a one-time escalation to a human-support hook.
//! - The **realtime layer** manages live group-session connections:
//!   a connection registry with heartbeat-based expiry, best-effort group
//!   broadcasting with per-recipient failure isolation, and presence
//!   tracking with join/leave announcements.
//!
//! # Module Structure
//!
//! The library is organized into two main modules:
//!
//! - **`shared`** - Types shared between the core and its API surface
//!   - Dream records, analysis results, risk flags
//!   - Wire message and registry event types
//!   - Configuration and error types
//!
//! - **`backend`** - Server-side code
//!   - Axum HTTP server with dream endpoints and the group WebSocket
//!   - Analysis pipeline, model invoker, risk classifier, escalation
//!   - Connection registry, group broadcaster, presence tracker
//!   - Storage traits with in-memory and PostgreSQL implementations
//!
//! # Usage
//!
//! ```rust,no_run
//! use yuu::backend::server::init::create_app;
//!
//! # async fn example() {
//! let app = create_app().await;
//! // Use app with Axum server
//! # }
//! ```

/// Shared types: dream records, events, configuration, errors
pub mod shared;

/// Server-side code: pipeline, realtime layer, HTTP surface
pub mod backend;
