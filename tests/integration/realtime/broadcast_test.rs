//! Group broadcast integration tests
//!
//! Verifies per-recipient failure isolation and publish ordering over
//! live registry state.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use yuu::backend::realtime::broadcast::GroupBroadcaster;
use yuu::backend::realtime::registry::{Connection, ConnectionRegistry};
use yuu::backend::store::MemoryGroupDirectory;
use yuu::shared::GroupSession;

struct Member {
    user_id: Uuid,
    connection_id: Uuid,
    rx: mpsc::UnboundedReceiver<yuu::shared::WireMessage>,
}

fn join(registry: &ConnectionRegistry, group_id: Uuid) -> Member {
    let user_id = Uuid::new_v4();
    let connection_id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(Connection::new(connection_id, user_id, group_id, tx));
    Member {
        user_id,
        connection_id,
        rx,
    }
}

#[tokio::test]
async fn mid_disconnect_delivers_to_the_rest() {
    let registry = Arc::new(ConnectionRegistry::new(64));
    let directory = Arc::new(MemoryGroupDirectory::new());

    let group_id = Uuid::new_v4();

    // Five live members, one of which is mid-disconnect
    let mut members: Vec<Member> = (0..5).map(|_| join(&registry, group_id)).collect();
    let dropped = members.remove(2);
    let dropped_id = dropped.connection_id;
    drop(dropped.rx);

    let sender = members[0].user_id;
    directory.insert(GroupSession {
        id: group_id,
        member_ids: members.iter().map(|m| m.user_id).collect(),
        created_at: chrono::Utc::now(),
    });

    let broadcaster = GroupBroadcaster::new(registry.clone(), directory);
    let outcome = broadcaster
        .publish(group_id, sender, serde_json::json!({"text": "anyone awake?"}))
        .await
        .unwrap();

    // N-1 delivered, the dead connection removed, nothing raised
    assert_eq!(outcome.delivered, 4);
    assert_eq!(outcome.failed, vec![dropped_id]);
    for member in members.iter_mut() {
        let message = member.rx.recv().await.unwrap();
        assert_eq!(message.payload["text"], "anyone awake?");
    }
    assert_eq!(registry.connections_for(group_id).len(), 4);
}

#[tokio::test]
async fn sequential_publishes_arrive_in_order_per_recipient() {
    let registry = Arc::new(ConnectionRegistry::new(64));
    let directory = Arc::new(MemoryGroupDirectory::new());
    let group_id = Uuid::new_v4();

    let mut members: Vec<Member> = (0..3).map(|_| join(&registry, group_id)).collect();
    let sender = members[0].user_id;
    directory.insert(GroupSession {
        id: group_id,
        member_ids: members.iter().map(|m| m.user_id).collect(),
        created_at: chrono::Utc::now(),
    });

    let broadcaster = GroupBroadcaster::new(registry, directory);
    for seq in 0..20 {
        broadcaster
            .publish(group_id, sender, serde_json::json!({"seq": seq}))
            .await
            .unwrap();
    }

    for member in members.iter_mut() {
        for seq in 0..20 {
            assert_eq!(member.rx.recv().await.unwrap().payload["seq"], seq);
        }
    }
}

#[tokio::test]
async fn broadcast_to_empty_group_is_harmless() {
    let registry = Arc::new(ConnectionRegistry::new(64));
    let directory = Arc::new(MemoryGroupDirectory::new());
    let member = Uuid::new_v4();
    let group = GroupSession::new(vec![member]);
    directory.insert(group.clone());

    let broadcaster = GroupBroadcaster::new(registry, directory);
    let outcome = broadcaster
        .publish(group.id, member, serde_json::json!({"text": "hello?"}))
        .await
        .unwrap();

    assert_eq!(outcome.delivered, 0);
    assert!(outcome.failed.is_empty());
}
