use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::WebSocket;

use crate::core::message_handler::MessageHandler;
use crate::core::server::SharedServerManager;

// Handle a WebSocket connection
pub async fn handle_ws_client(ws: WebSocket, server: SharedServerManager) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn a task to forward messages from our channel to the WebSocket
    tokio::task::spawn(async move {
        let mut rx = rx;
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(message).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Generate a unique connection ID
    let connection_id = Uuid::new_v4().to_string();

    if let Err(e) = server.register_connection(connection_id.clone(), tx).await {
        error!("Failed to register connection {}: {}", connection_id, e);
        return;
    }
    info!("Client connected: {}", connection_id);

    let handler = MessageHandler::new(server.clone());

    // Handle incoming messages
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                // Only process text messages
                if let Ok(text) = msg.to_str() {
                    if let Err(e) = handler.handle_client_message(&connection_id, text).await {
                        debug!("Dropped message from {}: {}", connection_id, e);
                    }
                }
            }
            Err(e) => {
                warn!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    // Client disconnected
    if let Err(e) = server.unregister_connection(&connection_id).await {
        error!("Error unregistering connection {}: {}", connection_id, e);
    } else {
        info!("Client disconnected: {}", connection_id);
    }
}
