//! Registry and presence integration tests
//!
//! Covers reconnect semantics and heartbeat expiry as observed through
//! the presence tracker.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use yuu::backend::realtime::broadcast::GroupBroadcaster;
use yuu::backend::realtime::presence::PresenceTracker;
use yuu::backend::realtime::registry::{Connection, ConnectionRegistry};
use yuu::backend::store::MemoryGroupDirectory;
use yuu::shared::DisconnectReason;

fn realtime_stack() -> (Arc<ConnectionRegistry>, Arc<PresenceTracker>) {
    let registry = Arc::new(ConnectionRegistry::new(64));
    let directory = Arc::new(MemoryGroupDirectory::new());
    let broadcaster = GroupBroadcaster::new(registry.clone(), directory);
    let presence = PresenceTracker::spawn(&registry, broadcaster);
    (registry, presence)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn connect_disconnect_reconnect_shows_one_connection() {
    let (registry, presence) = realtime_stack();
    let group_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();

    // Connect
    let (tx1, _rx1) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx1));
    settle().await;
    assert_eq!(registry.connections_for(group_id).len(), 1);

    // Disconnect
    registry.unregister(connection_id, DisconnectReason::ClientClosed);
    settle().await;
    assert!(presence.snapshot(group_id).online.is_empty());

    // Reconnect with the same connection id
    let (tx2, _rx2) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx2));
    settle().await;

    // One active connection, not two; presence reflects a single member
    assert_eq!(registry.connections_for(group_id).len(), 1);
    let snapshot = presence.snapshot(group_id);
    assert_eq!(snapshot.online.len(), 1);
    assert!(snapshot.online.contains(&user_id));
}

#[tokio::test]
async fn reconnect_without_disconnect_does_not_double_count() {
    let (registry, presence) = realtime_stack();
    let group_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();

    let (tx1, _rx1) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx1));
    let (tx2, _rx2) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx2));
    settle().await;

    assert_eq!(registry.connections_for(group_id).len(), 1);
    assert_eq!(presence.snapshot(group_id).online.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_timeout_expires_and_updates_presence() {
    let (registry, presence) = realtime_stack();
    let group_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();

    let (tx, _rx) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx));
    tokio::time::advance(Duration::from_millis(20)).await;
    assert!(presence.snapshot(group_id).online.contains(&user_id));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(registry.expire_stale(Duration::from_secs(60)), 1);
    tokio::time::advance(Duration::from_millis(20)).await;

    assert!(registry.connections_for(group_id).is_empty());
    assert!(presence.snapshot(group_id).online.is_empty());
}
