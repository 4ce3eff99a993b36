//! Connection Registry
//!
//! Tracks the live real-time connections of every group session. Each
//! connection is owned by the registry for its lifetime: registered on
//! transport open, destroyed on disconnect, transport failure or
//! heartbeat timeout.
//!
//! # Invariants
//!
//! - A connection belongs to exactly one group session for its
//!   lifetime; re-registering the same connection id replaces the prior
//!   entry (a reconnect, not a duplicate).
//! - Every register/unregister emits a `RegistryEvent` consumed by the
//!   presence tracker.
//!
//! # Synchronization
//!
//! A single `std::sync` mutex guards the connection map. Nothing awaits
//! under the lock: sink sends are non-blocking and event emission uses
//! `tokio::sync::broadcast`, so holding the lock across a group fan-out
//! is safe and gives broadcasts a consistent view of the live set.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::shared::config::RealtimeConfig;
use crate::shared::{DisconnectReason, RegistryEvent, WireMessage};

/// One live real-time connection bound to a user and a group
#[derive(Debug)]
pub struct Connection {
    /// Connection id (client-supplied so reconnects can replace)
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Group session this connection belongs to
    pub group_id: Uuid,
    /// Transport sink; the WebSocket pump drains the other end
    pub sink: mpsc::UnboundedSender<WireMessage>,
    /// Last observed activity
    last_seen: Instant,
}

impl Connection {
    /// Create a connection with a fresh heartbeat
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
        sink: mpsc::UnboundedSender<WireMessage>,
    ) -> Self {
        Self {
            id,
            user_id,
            group_id,
            sink,
            last_seen: Instant::now(),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    /// group id -> connection id -> connection
    groups: HashMap<Uuid, HashMap<Uuid, Connection>>,
    /// connection id -> group id
    index: HashMap<Uuid, Uuid>,
}

impl RegistryInner {
    fn remove(&mut self, connection_id: Uuid) -> Option<Connection> {
        let group_id = self.index.remove(&connection_id)?;
        let group = self.groups.get_mut(&group_id)?;
        let connection = group.remove(&connection_id);
        if group.is_empty() {
            self.groups.remove(&group_id);
        }
        connection
    }
}

/// Registry of live group-session connections
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    events: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    /// Create a registry with the given event channel capacity
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            inner: Mutex::new(RegistryInner::default()),
            events,
        }
    }

    /// Subscribe to connection lifecycle events
    pub fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Register a connection, replacing any prior entry with its id
    ///
    /// A re-registration is a reconnect: the old entry is dropped
    /// (closing its sink) and an `Unregistered { reason: Replaced }`
    /// event precedes the new `Registered` event.
    pub fn register(&self, connection: Connection) {
        let mut emitted = Vec::with_capacity(2);
        {
            let mut inner = self.inner.lock().unwrap();

            if let Some(old) = inner.remove(connection.id) {
                tracing::debug!(
                    "[Registry] connection {} reconnecting (was group {})",
                    connection.id,
                    old.group_id
                );
                emitted.push(RegistryEvent::Unregistered {
                    connection_id: old.id,
                    user_id: old.user_id,
                    group_id: old.group_id,
                    reason: DisconnectReason::Replaced,
                });
            }

            emitted.push(RegistryEvent::Registered {
                connection_id: connection.id,
                user_id: connection.user_id,
                group_id: connection.group_id,
            });

            inner.index.insert(connection.id, connection.group_id);
            inner
                .groups
                .entry(connection.group_id)
                .or_default()
                .insert(connection.id, connection);
        }

        for event in emitted {
            // No subscribers is fine (e.g. presence tracker not started)
            let _ = self.events.send(event);
        }
    }

    /// Remove a connection, emitting an unregister event
    pub fn unregister(&self, connection_id: Uuid, reason: DisconnectReason) -> bool {
        let removed = self.inner.lock().unwrap().remove(connection_id);
        match removed {
            Some(connection) => {
                tracing::debug!(
                    "[Registry] connection {} unregistered ({:?})",
                    connection_id,
                    reason
                );
                let _ = self.events.send(RegistryEvent::Unregistered {
                    connection_id: connection.id,
                    user_id: connection.user_id,
                    group_id: connection.group_id,
                    reason,
                });
                true
            }
            None => false,
        }
    }

    /// Refresh a connection's heartbeat
    pub fn touch(&self, connection_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(group_id) = inner.index.get(&connection_id).copied() {
            if let Some(connection) = inner
                .groups
                .get_mut(&group_id)
                .and_then(|g| g.get_mut(&connection_id))
            {
                connection.last_seen = Instant::now();
            }
        }
    }

    /// Run a closure over each live connection of a group
    ///
    /// The closure runs under the registry lock and must not block;
    /// the broadcaster uses this for consistent fan-out.
    pub(crate) fn for_each_connection(&self, group_id: Uuid, mut f: impl FnMut(&Connection)) {
        let inner = self.inner.lock().unwrap();
        if let Some(group) = inner.groups.get(&group_id) {
            for connection in group.values() {
                f(connection);
            }
        }
    }

    /// Connection ids and owners currently registered for a group
    pub fn connections_for(&self, group_id: Uuid) -> Vec<(Uuid, Uuid)> {
        let inner = self.inner.lock().unwrap();
        inner
            .groups
            .get(&group_id)
            .map(|g| g.values().map(|c| (c.id, c.user_id)).collect())
            .unwrap_or_default()
    }

    /// Total live connections across all groups
    pub fn live_count(&self) -> usize {
        self.inner.lock().unwrap().index.len()
    }

    /// Expire connections idle past the timeout
    ///
    /// Returns the number expired; each emits an
    /// `Unregistered { reason: HeartbeatTimeout }` event.
    pub fn expire_stale(&self, timeout: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<Uuid> = {
            let inner = self.inner.lock().unwrap();
            inner
                .groups
                .values()
                .flat_map(|g| g.values())
                .filter(|c| now.duration_since(c.last_seen) > timeout)
                .map(|c| c.id)
                .collect()
        };

        let count = stale.len();
        for connection_id in stale {
            tracing::info!("[Registry] connection {connection_id} timed out, expiring");
            self.unregister(connection_id, DisconnectReason::HeartbeatTimeout);
        }
        count
    }

    /// Spawn the background sweeper that expires stale connections
    pub fn spawn_sweeper(registry: std::sync::Arc<Self>, config: RealtimeConfig) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.sweep_interval);
            loop {
                interval.tick().await;
                let expired = registry.expire_stale(config.heartbeat_timeout);
                if expired > 0 {
                    tracing::debug!("[Registry] sweeper expired {expired} connections");
                }
            }
        });
    }
}
