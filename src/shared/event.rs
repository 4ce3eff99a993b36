//! Real-time Event System
//!
//! This module defines the wire format delivered to group-session
//! connections and the internal registry events that drive presence
//! tracking. Wire messages are JSON-shaped:
//!
//! ```json
//! {"type": "message", "group_id": "...", "sender_id": "...",
//!  "payload": {...}, "timestamp": "..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of outbound wire message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireMessageKind {
    /// A member-published chat message
    Message,
    /// A join/leave presence announcement
    Presence,
    /// A server-originated system message
    System,
}

/// One outbound message delivered to group connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    /// Message kind
    #[serde(rename = "type")]
    pub kind: WireMessageKind,
    /// Target group session
    pub group_id: Uuid,
    /// Publishing user; absent for presence/system messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    /// Message payload (JSON-serializable data)
    pub payload: serde_json::Value,
    /// When the message was published
    pub timestamp: DateTime<Utc>,
}

impl WireMessage {
    /// Create a member-published message
    pub fn message(group_id: Uuid, sender_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            kind: WireMessageKind::Message,
            group_id,
            sender_id: Some(sender_id),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create a presence announcement for a user joining or leaving
    pub fn presence(group_id: Uuid, user_id: Uuid, online: bool) -> Self {
        Self {
            kind: WireMessageKind::Presence,
            group_id,
            sender_id: None,
            payload: serde_json::json!({
                "user_id": user_id,
                "online": online,
            }),
            timestamp: Utc::now(),
        }
    }

    /// Create a server-originated system message
    pub fn system(group_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            kind: WireMessageKind::System,
            group_id,
            sender_id: None,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Why a connection left the registry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Client closed the transport
    ClientClosed,
    /// No activity within the heartbeat timeout
    HeartbeatTimeout,
    /// A send on the transport failed mid-broadcast
    TransportFailed,
    /// Replaced by a re-registration of the same connection id
    Replaced,
}

/// Connection lifecycle event emitted by the registry
///
/// Consumed by the presence tracker to derive per-group snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A connection was registered for a group
    Registered {
        connection_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    },
    /// A connection was removed from a group
    Unregistered {
        connection_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
        reason: DisconnectReason,
    },
}
