//! Group Message Fan-Out
//!
//! Delivers messages to every live connection of a group session.
//! Delivery is best-effort per connection: a transport failure on one
//! connection removes that connection but never blocks or fails
//! delivery to the others.
//!
//! # Ordering
//!
//! Sink sends happen under the registry lock, so messages broadcast
//! sequentially by one publisher reach each live recipient in publish
//! order. No ordering is promised across different publishers.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::backend::store::{GroupDirectory, StoreError};
use crate::shared::{DisconnectReason, WireMessage};

use super::registry::ConnectionRegistry;

/// Per-broadcast delivery outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Connections the message was handed to
    pub delivered: usize,
    /// Connections whose transport failed; removed from the registry
    pub failed: Vec<Uuid>,
}

/// Errors rejecting a publish before any fan-out happens
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The group session does not exist
    #[error("unknown group {group_id}")]
    UnknownGroup { group_id: Uuid },

    /// The publisher is not a member of the group
    #[error("user {user_id} is not a member of group {group_id}")]
    NotAMember { user_id: Uuid, group_id: Uuid },

    /// Membership lookup failed
    #[error(transparent)]
    Directory(#[from] StoreError),
}

/// Fans messages out to a group's live connections
#[derive(Clone)]
pub struct GroupBroadcaster {
    registry: Arc<ConnectionRegistry>,
    directory: Arc<dyn GroupDirectory>,
}

impl GroupBroadcaster {
    /// Create a broadcaster over a registry and membership directory
    pub fn new(registry: Arc<ConnectionRegistry>, directory: Arc<dyn GroupDirectory>) -> Self {
        Self {
            registry,
            directory,
        }
    }

    /// Publish a member message to a group
    ///
    /// Membership is checked against the group directory before any
    /// fan-out; unknown groups and non-members are rejected without
    /// side effects.
    pub async fn publish(
        &self,
        group_id: Uuid,
        sender_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<BroadcastOutcome, BroadcastError> {
        let group = self
            .directory
            .group(group_id)
            .await?
            .ok_or(BroadcastError::UnknownGroup { group_id })?;

        if !group.has_member(sender_id) {
            return Err(BroadcastError::NotAMember {
                user_id: sender_id,
                group_id,
            });
        }

        Ok(self.deliver(WireMessage::message(group_id, sender_id, payload)))
    }

    /// Deliver a server-originated message (presence, system) to a group
    pub fn announce(&self, message: WireMessage) -> BroadcastOutcome {
        self.deliver(message)
    }

    /// Fan a message out to the group's live connections
    ///
    /// Runs under the registry lock for a consistent view of the live
    /// set; failed connections are unregistered afterwards so their
    /// removal never interferes with the remaining recipients.
    fn deliver(&self, message: WireMessage) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        self.registry.for_each_connection(message.group_id, |connection| {
            match connection.sink.send(message.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(_) => outcome.failed.push(connection.id),
            }
        });

        for connection_id in &outcome.failed {
            tracing::warn!(
                "[Broadcast] transport failed for connection {connection_id}, removing"
            );
            self.registry
                .unregister(*connection_id, DisconnectReason::TransportFailed);
        }

        tracing::debug!(
            "[Broadcast] group {} message delivered to {} connections ({} failed)",
            message.group_id,
            outcome.delivered,
            outcome.failed.len()
        );
        outcome
    }
}
