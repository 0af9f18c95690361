//! WebSocket connection management
//! Handles the lifecycle of client connections

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

use crate::core::message_types::ServerMessage;

/// Identifies one transport session. A player keeps their `PlayerId` across
/// reconnects but gets a new connection each time.
pub type ConnectionId = String;

/// Represents the state of a single WebSocket connection
pub struct Connection {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(sender: mpsc::UnboundedSender<Message>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender)
    }

    pub fn with_id(id: ConnectionId, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a text message through this connection
    pub fn send_text(&self, text: &str) -> bool {
        match self.sender.send(Message::text(text)) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to client {}", self.id);
                false
            }
        }
    }

    /// Serialize and send a server event
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(&text),
            Err(e) => {
                warn!(
                    "Failed to serialize {} for client {}: {}",
                    message.event_name(),
                    self.id,
                    e
                );
                false
            }
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
