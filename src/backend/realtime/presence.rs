//! Presence Tracking
//!
//! Derives the online membership of every group session from registry
//! lifecycle events. A user is online in a group while at least one of
//! their connections is registered for it; transitions across zero emit
//! a synthetic presence announcement through the broadcaster.
//!
//! Snapshots are recomputed state, never persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::shared::{DisconnectReason, PresenceSnapshot, RegistryEvent, WireMessage};

use super::broadcast::GroupBroadcaster;
use super::registry::ConnectionRegistry;

/// Tracks per-group online membership
pub struct PresenceTracker {
    /// group id -> user id -> live connection count
    counts: Mutex<HashMap<Uuid, HashMap<Uuid, usize>>>,
}

impl PresenceTracker {
    fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the tracker task over a registry's event stream
    ///
    /// Join/leave transitions are announced to the affected group via
    /// the broadcaster as `presence` wire messages.
    pub fn spawn(registry: &ConnectionRegistry, broadcaster: GroupBroadcaster) -> Arc<Self> {
        let tracker = Arc::new(Self::new());
        let mut events = registry.subscribe_events();

        let task_tracker = tracker.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => task_tracker.apply(event, &broadcaster),
                    Err(RecvError::Lagged(skipped)) => {
                        // Presence may briefly undercount after a lag;
                        // later events converge it
                        tracing::warn!("[Presence] event stream lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("[Presence] registry event stream closed, stopping");
                        break;
                    }
                }
            }
        });

        tracker
    }

    /// Current presence snapshot for a group
    pub fn snapshot(&self, group_id: Uuid) -> PresenceSnapshot {
        let counts = self.counts.lock().unwrap();
        let mut snapshot = PresenceSnapshot::empty(group_id);
        if let Some(users) = counts.get(&group_id) {
            snapshot.online = users.keys().copied().collect();
        }
        snapshot
    }

    /// Apply one registry event, announcing membership transitions
    fn apply(&self, event: RegistryEvent, broadcaster: &GroupBroadcaster) {
        match event {
            RegistryEvent::Registered {
                user_id, group_id, ..
            } => {
                let joined = {
                    let mut counts = self.counts.lock().unwrap();
                    let user_count = counts
                        .entry(group_id)
                        .or_default()
                        .entry(user_id)
                        .or_insert(0);
                    *user_count += 1;
                    *user_count == 1
                };

                if joined {
                    tracing::info!("[Presence] user {user_id} joined group {group_id}");
                    broadcaster.announce(WireMessage::presence(group_id, user_id, true));
                }
            }
            RegistryEvent::Unregistered {
                user_id,
                group_id,
                reason,
                ..
            } => {
                let left = {
                    let mut counts = self.counts.lock().unwrap();
                    let Some(users) = counts.get_mut(&group_id) else {
                        return;
                    };
                    let Some(user_count) = users.get_mut(&user_id) else {
                        return;
                    };
                    *user_count = user_count.saturating_sub(1);
                    if *user_count == 0 {
                        users.remove(&user_id);
                        if users.is_empty() {
                            counts.remove(&group_id);
                        }
                        true
                    } else {
                        false
                    }
                };

                // A replaced connection is immediately re-registered;
                // suppressing its leave avoids a spurious flap
                if left && reason != DisconnectReason::Replaced {
                    tracing::info!("[Presence] user {user_id} left group {group_id} ({reason:?})");
                    broadcaster.announce(WireMessage::presence(group_id, user_id, false));
                }
            }
        }
    }
}
