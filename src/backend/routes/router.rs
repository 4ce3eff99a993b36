//! Router Configuration
//!
//! This module provides the main router creation function that combines
//! all route configurations into a single Axum router.
//!
//! # Route Details
//!
//! ## Dream Routes
//!
//! - `POST /api/v1/dreams` - Create a dream and enqueue analysis
//! - `GET /api/v1/dreams` - List the caller's dreams
//! - `GET /api/v1/dreams/{id}` - Fetch one dream with its analysis
//! - `POST /api/v1/dreams/{id}/analyze` - Explicitly resubmit a dream
//!
//! ## Realtime Routes
//!
//! - `GET /ws/groups/{group_id}` - Group-session WebSocket
//! - `GET /api/v1/groups/{group_id}/presence` - Presence snapshot
//!
//! ## Health
//!
//! - `GET /health` - Liveness probe

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::backend::routes::{dreams, groups};
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/api/v1/dreams",
            post(dreams::create_dream).get(dreams::list_dreams),
        )
        .route("/api/v1/dreams/{id}", get(dreams::get_dream))
        .route("/api/v1/dreams/{id}/analyze", post(dreams::resubmit_dream))
        .route("/api/v1/groups/{group_id}/presence", get(groups::get_presence))
        .route("/ws/groups/{group_id}", get(groups::group_ws));

    // The mobile clients are served from a different origin
    let router = router.layer(CorsLayer::permissive());

    // Fallback handler for 404
    let router = router.fallback(|| async { "404 Not Found" });

    router.with_state(app_state)
}
