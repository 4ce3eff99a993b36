//! Group-Session Realtime Handlers
//!
//! The WebSocket endpoint binding one client session to one group. On
//! upgrade the connection is registered with the registry; inbound text
//! frames are published to the group through the broadcaster, and any
//! inbound frame refreshes the connection's heartbeat. The outbound
//! half pumps registry-delivered wire messages onto the socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::realtime::broadcast::BroadcastError;
use crate::backend::realtime::registry::Connection;
use crate::backend::server::state::AppState;
use crate::shared::{DisconnectReason, PresenceSnapshot};

/// Query parameters for the WebSocket upgrade
///
/// Authentication is handled upstream; the user id arrives as a query
/// parameter alongside an optional client-stable connection id used
/// for reconnects.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Connecting user
    pub user_id: Uuid,
    /// Client-stable connection id; a reconnect with the same id
    /// replaces the prior entry
    pub connection_id: Option<Uuid>,
}

/// Inbound frame published by a client
#[derive(Debug, Deserialize)]
struct ClientFrame {
    /// Frame type; only "message" is currently meaningful
    #[serde(rename = "type")]
    kind: String,
    /// Message payload
    #[serde(default)]
    payload: serde_json::Value,
}

/// Presence snapshot for a group (GET /api/v1/groups/{group_id}/presence)
pub async fn get_presence(
    State(app_state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<PresenceSnapshot>, BackendError> {
    app_state
        .directory
        .group(group_id)
        .await?
        .ok_or(BroadcastError::UnknownGroup { group_id })?;

    Ok(Json(app_state.presence.snapshot(group_id)))
}

/// Upgrade a client to the group-session WebSocket
///
/// Membership is verified before the upgrade: unknown groups yield
/// 404 and non-members 403.
pub async fn group_ws(
    State(app_state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    let group = app_state
        .directory
        .group(group_id)
        .await?
        .ok_or(BroadcastError::UnknownGroup { group_id })?;

    if !group.has_member(params.user_id) {
        return Err(BroadcastError::NotAMember {
            user_id: params.user_id,
            group_id,
        }
        .into());
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, app_state, group_id, params)))
}

/// Drive one WebSocket session for its lifetime
async fn handle_socket(socket: WebSocket, app_state: AppState, group_id: Uuid, params: WsParams) {
    let connection_id = params.connection_id.unwrap_or_else(Uuid::new_v4);
    let user_id = params.user_id;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    app_state
        .registry
        .register(Connection::new(connection_id, user_id, group_id, outbound_tx));
    tracing::info!(
        "[Groups] connection {connection_id} opened (user {user_id}, group {group_id})"
    );

    let (mut socket_tx, mut socket_rx) = socket.split();

    // Outbound pump: wire messages -> socket frames
    let pump = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let frame = match serde_json::to_string(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("[Groups] failed to serialize wire message: {e}");
                    continue;
                }
            };
            if socket_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: every frame refreshes the heartbeat; text frames
    // are published to the group
    while let Some(frame) = socket_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("[Groups] connection {connection_id} transport error: {e}");
                break;
            }
        };

        app_state.registry.touch(connection_id);

        match frame {
            Message::Text(text) => {
                let parsed: ClientFrame = match serde_json::from_str(text.as_str()) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::debug!(
                            "[Groups] connection {connection_id} sent unparseable frame: {e}"
                        );
                        continue;
                    }
                };

                if parsed.kind != "message" {
                    tracing::debug!(
                        "[Groups] connection {connection_id} sent unsupported frame type '{}'",
                        parsed.kind
                    );
                    continue;
                }

                if let Err(e) = app_state
                    .broadcaster
                    .publish(group_id, user_id, parsed.payload)
                    .await
                {
                    tracing::warn!("[Groups] publish from {connection_id} rejected: {e}");
                }
            }
            Message::Close(_) => break,
            // Ping/Pong/Binary only refresh the heartbeat
            _ => {}
        }
    }

    app_state
        .registry
        .unregister(connection_id, DisconnectReason::ClientClosed);
    pump.abort();
    tracing::info!("[Groups] connection {connection_id} closed");
}
