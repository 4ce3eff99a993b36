//! Server Module
//!
//! Server initialization, application state and configuration loading
//! for the Axum HTTP server.

/// Application state and extraction
pub mod state;

/// Configuration loading (database)
pub mod config;

/// Server initialization
pub mod init;

pub use init::create_app;
pub use state::AppState;
