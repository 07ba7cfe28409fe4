//! WebSocket Connection Hub
//!
//! Tracks live connections, who owns them and which refresh topics they
//! follow. The hub subscribes to the refresh bus and forwards each emitted
//! event to the emitting user's matching connections only.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::bus::{RefreshEvent, RefreshSubscriber};
use super::messages::ServerMessage;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Topic matching every refresh event
pub const WILDCARD_TOPIC: &str = "refresh.*";

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub user_id: String,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub subscriptions: HashSet<String>,
}

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic → subscribed connections
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a connection owned by `user_id`
    pub async fn register(
        &self,
        user_id: &str,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections {
                limit: self.config.max_connections,
            });
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                user_id: user_id.to_string(),
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, user_id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; invalid topics are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Send a refresh frame to `user_id`'s connections following `event`
    ///
    /// Returns the number of connections reached.
    pub async fn broadcast(&self, event: RefreshEvent, user_id: &str) -> usize {
        let connections = self.connections.read().await;
        let subs = self.subscriptions.read().await;

        let empty = HashSet::new();
        let direct = subs.get(&event.topic()).unwrap_or(&empty);
        let wildcard = subs.get(WILDCARD_TOPIC).unwrap_or(&empty);

        let message = ServerMessage::Refresh { event };
        let mut sent_count = 0;
        for id in direct.union(wildcard) {
            if let Some(handle) = connections.get(id) {
                if handle.user_id == user_id && handle.sender.send(message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        if sent_count > 0 {
            tracing::trace!(event = %event, user_id, connections = sent_count, "Forwarded refresh");
        }
        sent_count
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle.sender.send(message).map_err(|_| HubError::SendFailed)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_full(&self) -> bool {
        self.connection_count().await >= self.config.max_connections
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RefreshSubscriber for ConnectionHub {
    async fn on_refresh(&self, event: RefreshEvent, user_id: &str) {
        self.broadcast(event, user_id).await;
    }
}

/// `refresh.*` or `refresh.<event>`
fn is_valid_topic(topic: &str) -> bool {
    topic == WILDCARD_TOPIC
        || topic
            .strip_prefix("refresh.")
            .map(|name| name.parse::<RefreshEvent>().is_ok())
            .unwrap_or(false)
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {limit})")]
    TooManyConnections { limit: usize },

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}
