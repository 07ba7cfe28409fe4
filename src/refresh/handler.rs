//! WebSocket Handler
//!
//! Upgrades `/ws?user_id=...` and runs the connection lifecycle: register
//! with the hub, pump hub messages out, handle client frames in.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{ClientMessage, ServerMessage};
use crate::api::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: String,
}

/// GET /ws?user_id=
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let user_id = params.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }

    let hub = Arc::clone(&state.ws_hub);
    if hub.is_full().await {
        return Err(ApiError::ServiceUnavailable(
            "too many WebSocket connections".to_string(),
        ));
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, user_id)))
}

async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, user_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(&user_id, tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "Failed to register WebSocket connection");
            let _ = sender
                .send(Message::Text(ServerMessage::error(e.to_string()).to_json()))
                .await;
            return;
        }
    };

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    if sender.send(Message::Text(connected.to_json())).await.is_err() {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.to_json())).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&connection_id).await;
}

/// Returns false if the connection should be closed
async fn handle_ws_message(hub: &ConnectionHub, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_client_message(hub, connection_id, client_msg).await,
                Err(e) => {
                    tracing::debug!(connection_id, error = %e, "Invalid client message");
                    let _ = hub
                        .send_to(
                            connection_id,
                            ServerMessage::error(format!("Invalid message format: {}", e)),
                        )
                        .await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let _ = hub
                .send_to(
                    connection_id,
                    ServerMessage::error("Binary messages not supported"),
                )
                .await;
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id, "Client requested close");
            false
        }
    }
}

async fn handle_client_message(hub: &ConnectionHub, connection_id: &str, message: ClientMessage) {
    let response = match message {
        ClientMessage::Subscribe { topics } => hub
            .subscribe(connection_id, topics)
            .await
            .map(|topics| ServerMessage::Subscribed { topics }),
        ClientMessage::Unsubscribe { topics } => hub
            .unsubscribe(connection_id, topics)
            .await
            .map(|topics| ServerMessage::Unsubscribed { topics }),
        ClientMessage::Ping => Ok(ServerMessage::Pong),
    };

    let response = response.unwrap_or_else(|e| {
        tracing::error!(connection_id, error = %e, "Client message failed");
        ServerMessage::error(e.to_string())
    });
    let _ = hub.send_to(connection_id, response).await;
}
