//! Routes Module
//!
//! HTTP route configuration for the backend server.

/// Router assembly
pub mod router;

/// Dream journaling endpoints
pub mod dreams;

/// Group-session WebSocket endpoint
pub mod groups;
