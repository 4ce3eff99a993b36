//! Realtime Group-Session Layer
//!
//! This module manages live group-session connections:
//!
//! - `registry` tracks connections per group with heartbeat-based
//!   expiry and replace-on-reconnect semantics
//! - `broadcast` fans messages out to a group's live connections with
//!   per-recipient failure isolation
//! - `presence` derives online membership from registry events and
//!   announces join/leave to the group
//!
//! Synchronization is scoped to the registry's connection map; sink
//! sends are non-blocking, so fan-out happens under the registry lock
//! and a connection removed before a broadcast never receives it.

/// Connection registry and heartbeat sweeper
pub mod registry;

/// Group message fan-out
pub mod broadcast;

/// Presence tracking
pub mod presence;

pub use broadcast::{BroadcastError, BroadcastOutcome, GroupBroadcaster};
pub use presence::PresenceTracker;
pub use registry::{Connection, ConnectionRegistry};
