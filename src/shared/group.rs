//! Group Session Data Structures
//!
//! Represents a peer-support group session and its derived presence
//! snapshot. Group membership lifecycle (create, invite, leave) is an
//! external concern; the realtime core only reads membership to
//! authorize fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A persistent peer-support group with a real-time messaging channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSession {
    /// Unique group id
    pub id: Uuid,
    /// Ordered member user ids
    pub member_ids: Vec<Uuid>,
    /// Group creation time
    pub created_at: DateTime<Utc>,
}

impl GroupSession {
    /// Create a new group session with the given members
    pub fn new(member_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_ids,
            created_at: Utc::now(),
        }
    }

    /// Whether the given user is a member of this group
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }
}

/// The set of user ids currently connected to a group session
///
/// Derived from the live connection set; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PresenceSnapshot {
    /// Group the snapshot describes
    pub group_id: Uuid,
    /// Currently connected members
    pub online: BTreeSet<Uuid>,
}

impl PresenceSnapshot {
    /// An empty snapshot for a group
    pub fn empty(group_id: Uuid) -> Self {
        Self {
            group_id,
            online: BTreeSet::new(),
        }
    }
}
