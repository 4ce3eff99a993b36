//! Server Initialization
//!
//! This module handles the initialization and setup of the Axum HTTP
//! server: configuration loading, subsystem wiring and route
//! configuration.
//!
//! # Initialization Process
//!
//! 1. Load configuration from the environment
//! 2. Load optional services (database)
//! 3. Wire the analysis pipeline (store, invoker, notifier, workers)
//! 4. Wire the realtime layer (registry, broadcaster, presence, sweeper)
//! 5. Create and configure the router
//!
//! # Error Handling
//!
//! Initialization is resilient: a missing database falls back to the
//! in-memory store and a missing escalation hook falls back to the
//! logging notifier. An invalid environment value falls back to the
//! default configuration so a typo cannot keep the service down.

use axum::Router;
use std::sync::Arc;

use crate::backend::analysis::escalation::{
    EscalationNotifier, NoopEscalationNotifier, WebhookEscalationNotifier,
};
use crate::backend::analysis::invoker::HttpModelInvoker;
use crate::backend::analysis::pipeline::AnalysisPipeline;
use crate::backend::realtime::broadcast::GroupBroadcaster;
use crate::backend::realtime::presence::PresenceTracker;
use crate::backend::realtime::registry::ConnectionRegistry;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;
use crate::backend::store::{
    DreamStore, GroupDirectory, MemoryDreamStore, MemoryGroupDirectory, PgDreamStore,
};
use crate::shared::config::AppConfig;

/// Create and configure the Axum application
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub async fn create_app() -> Router<()> {
    tracing::info!("Initializing Yuu backend server");

    // Step 1: Load configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}. Using defaults.");
            AppConfig::default()
        }
    };

    // Step 2: Load optional services
    let db_pool = load_database().await;
    let store: Arc<dyn DreamStore> = match &db_pool {
        Some(pool) => Arc::new(PgDreamStore::new(pool.clone())),
        None => Arc::new(MemoryDreamStore::new()),
    };

    // Group lifecycle is owned by an external service; the realtime
    // layer only reads membership
    let directory: Arc<dyn GroupDirectory> = Arc::new(MemoryGroupDirectory::new());

    // Step 3: Wire the analysis pipeline
    let invoker = Arc::new(HttpModelInvoker::new(config.model.clone()).expect("Failed to build model HTTP client"));
    let notifier: Arc<dyn EscalationNotifier> = match &config.escalation_hook_url {
        Some(url) => {
            tracing::info!("Escalation hook configured");
            Arc::new(WebhookEscalationNotifier::new(url.clone()))
        }
        None => {
            tracing::warn!("ESCALATION_HOOK_URL not set. Escalations will only be logged.");
            Arc::new(NoopEscalationNotifier)
        }
    };
    let pipeline = AnalysisPipeline::spawn(
        store.clone(),
        invoker,
        notifier,
        config.analysis.clone(),
    );
    tracing::info!(
        "Analysis pipeline started with {} workers",
        config.analysis.worker_count
    );

    // Step 4: Wire the realtime layer
    let registry = Arc::new(ConnectionRegistry::new(config.realtime.event_capacity));
    let broadcaster = GroupBroadcaster::new(registry.clone(), directory.clone());
    let presence = PresenceTracker::spawn(&registry, broadcaster.clone());
    ConnectionRegistry::spawn_sweeper(registry.clone(), config.realtime.clone());
    tracing::info!(
        "Realtime layer started (heartbeat timeout {:?})",
        config.realtime.heartbeat_timeout
    );

    // Step 5: Create app state and router
    let app_state = AppState {
        store,
        directory,
        pipeline,
        registry,
        broadcaster,
        presence,
        db_pool,
    };

    create_router(app_state)
}
