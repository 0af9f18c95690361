use std::collections::HashMap;
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::core::connection::{Connection, ConnectionId};
use crate::core::message_types::ServerMessage;
use crate::error::{Result, WordRushError};

// Manages the open client connections, keyed by connection id
#[derive(Default)]
pub struct SessionManager {
    connections: HashMap<ConnectionId, Connection>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Register a new client connection
    pub fn register(&mut self, id: ConnectionId, sender: mpsc::UnboundedSender<WsMessage>) -> Result<()> {
        if self.connections.contains_key(&id) {
            return Err(WordRushError::ConnectionError(format!(
                "connection {} already registered",
                id
            )));
        }
        let connection = Connection::with_id(id.clone(), sender);
        self.connections.insert(id, connection);
        Ok(())
    }

    // Remove a client connection
    pub fn unregister(&mut self, id: &str) -> Result<()> {
        self.connections
            .remove(id)
            .map(|connection| {
                log::debug!(
                    "Connection {} closed after {:?}",
                    id,
                    connection.connection_duration()
                );
            })
            .ok_or_else(|| WordRushError::SessionNotFound(id.to_string()))
    }

    /// Deliver an event to one connection. Gone connections are skipped.
    pub fn send(&self, id: &str, message: &ServerMessage) -> bool {
        match self.connections.get(id) {
            Some(connection) => connection.send_message(message),
            None => {
                log::trace!("Dropping {} for closed connection {}", message.event_name(), id);
                false
            }
        }
    }

    /// Deliver an event to several connections, returning how many got it
    pub fn send_many(&self, ids: &[ConnectionId], message: &ServerMessage) -> usize {
        ids.iter().filter(|id| self.send(id, message)).count()
    }

    // Get current clients count
    pub fn client_count(&self) -> usize {
        self.connections.len()
    }
}
