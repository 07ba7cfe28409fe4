//! WebSocket Message Types
//!
//! Frames exchanged between clients and the refresh hub.

use serde::{Deserialize, Serialize};

use super::bus::RefreshEvent;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics (e.g. "refresh.meals", "refresh.*")
    Subscribe { topics: Vec<String> },
    Unsubscribe { topics: Vec<String> },
    /// Keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Views backed by `event` should reload
    Refresh { event: RefreshEvent },
    Subscribed { topics: Vec<String> },
    Unsubscribed { topics: Vec<String> },
    Pong,
    Error { message: String },
    Connected { connection_id: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// JSON text frame
    pub fn to_json(&self) -> String {
        // Every variant holds only strings and unit enums
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["refresh.meals", "refresh.*"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics, vec!["refresh.meals", "refresh.*"]);
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_refresh_message_json() {
        let msg = ServerMessage::Refresh {
            event: RefreshEvent::Meals,
        };
        assert_eq!(msg.to_json(), r#"{"type":"refresh","event":"meals"}"#);
    }

    #[test]
    fn test_connected_message_json() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = msg.to_json();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
