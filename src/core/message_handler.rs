//! Message handler that routes client events to the lobby or to a room

use log::{debug, warn};

use crate::core::message_types::{ClientMessage, ServerMessage};
use crate::core::server::SharedServerManager;
use crate::error::{Result, WordRushError};
use crate::game::RoomEvent;

/// Handles incoming client messages and routes them appropriately
pub struct MessageHandler {
    server: SharedServerManager,
}

impl MessageHandler {
    pub fn new(server: SharedServerManager) -> Self {
        Self { server }
    }

    /// Helper to send an error to a connection with proper logging
    async fn send_error_safe(&self, connection: &str, message: impl Into<String>) {
        let message = ServerMessage::error(message);
        if !self.server.send_to_connection(connection, &message).await {
            warn!("Failed to send room:error to connection {}", connection);
        }
    }

    /// Helper to route a game event to the sender's room
    async fn dispatch_safe(&self, connection: &str, event: RoomEvent) {
        if !self.server.dispatch(connection, event).await {
            debug!("Dropped event from {}: not in a room", connection);
        }
    }

    /// Handle one text frame from a client.
    ///
    /// Oversized and rate-limited frames are answered with `room:error`.
    /// Frames that do not parse are reported back to the caller only, the
    /// client hears nothing.
    pub async fn handle_client_message(&self, connection: &str, message_text: &str) -> Result<()> {
        if message_text.len() > self.server.max_message_size() {
            warn!(
                "Large message rejected from {}: {} bytes",
                connection,
                message_text.len()
            );
            self.send_error_safe(connection, "Message too large").await;
            return Err(WordRushError::MessageTooLarge(message_text.len()));
        }

        if !self.server.allow_message(connection).await {
            self.send_error_safe(connection, WordRushError::RateLimited.to_string())
                .await;
            return Err(WordRushError::RateLimited);
        }

        let client_message: ClientMessage = serde_json::from_str(message_text)
            .map_err(|e| WordRushError::MessageParseError(format!("Invalid JSON: {}", e)))?;

        match client_message {
            ClientMessage::RoomCreate {
                player_name,
                category,
                series_length,
            } => {
                self.handle_create_room(connection, &player_name, &category, series_length)
                    .await
            }

            ClientMessage::RoomJoin {
                room_code,
                player_name,
            } => {
                if let Err(e) = self.server.join_room(connection, &room_code, &player_name).await {
                    self.send_error_safe(connection, e.to_string()).await;
                }
            }

            ClientMessage::ReconnectAttempt {
                room_code,
                player_name,
            } => {
                if let Err(e) = self.server.reconnect(connection, &room_code, &player_name).await {
                    self.send_error_safe(connection, e.to_string()).await;
                }
            }

            ClientMessage::RoomLeave => self.server.leave_current_room(connection).await,

            ClientMessage::PlayerReady => {
                self.dispatch_safe(
                    connection,
                    RoomEvent::Ready {
                        connection: connection.to_string(),
                    },
                )
                .await
            }

            ClientMessage::WordSubmit(claim) => {
                self.dispatch_safe(
                    connection,
                    RoomEvent::SubmitWord {
                        connection: connection.to_string(),
                        claim,
                    },
                )
                .await
            }

            ClientMessage::PowerupUse { kind } => {
                self.dispatch_safe(
                    connection,
                    RoomEvent::UsePowerup {
                        connection: connection.to_string(),
                        kind,
                    },
                )
                .await
            }

            ClientMessage::PlayAgain => {
                self.dispatch_safe(
                    connection,
                    RoomEvent::PlayAgain {
                        connection: connection.to_string(),
                    },
                )
                .await
            }
        }

        Ok(())
    }

    async fn handle_create_room(
        &self,
        connection: &str,
        player_name: &str,
        category: &str,
        series_length: u8,
    ) {
        match self
            .server
            .create_room(connection, player_name, category, series_length)
            .await
        {
            Ok(code) => debug!("Connection {} created room {}", connection, code),
            Err(e) => {
                debug!("Room create from {} rejected: {}", connection, e);
                self.send_error_safe(connection, e.to_string()).await;
            }
        }
    }
}
