//! Integrated server service that coordinates connections and rooms

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message as WsMessage;

use crate::config::ServerConfig;
use crate::core::connection::ConnectionId;
use crate::core::message_types::ServerMessage;
use crate::core::rate_limiter::MessageRateLimiter;
use crate::core::registry::{RoomHandle, RoomRegistry};
use crate::core::room::normalize_room_code;
use crate::core::room_actor::{RoomActor, RoomCommand};
use crate::core::session::SessionManager;
use crate::error::{Result, WordRushError};
use crate::game::{GameServices, RoomEvent, SessionOrchestrator};
use crate::storage::{MemoryWordSource, WordSource};

/// Integrated server service that manages connections and rooms together
pub struct ServerManager {
    sessions: Arc<RwLock<SessionManager>>,
    registry: Arc<RwLock<RoomRegistry>>,
    rate_limiter: Arc<MessageRateLimiter>,
    services: GameServices,
    max_message_size: usize,
}

impl ServerManager {
    pub fn new(services: GameServices, max_messages_per_minute: u32, max_message_size: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            registry: Arc::new(RwLock::new(RoomRegistry::new())),
            rate_limiter: Arc::new(MessageRateLimiter::new(max_messages_per_minute)),
            services,
            max_message_size,
        }
    }

    /// Build from configuration, loading the word lists it names
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let words: Arc<dyn WordSource> = match &config.word_list_path {
            Some(path) => {
                info!("Loading word lists from {}", path);
                Arc::new(MemoryWordSource::from_path(path)?)
            }
            None => Arc::new(MemoryWordSource::builtin()),
        };
        let services = GameServices::new(config.game.clone(), words);
        Ok(Self::new(
            services,
            config.rate_limit_messages_per_minute,
            config.max_message_size,
        ))
    }

    pub fn services(&self) -> &GameServices {
        &self.services
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Start the periodic rate limiter cleanup
    pub fn start_background_tasks(&self) {
        self.rate_limiter.clone().start_cleanup_task();
    }

    pub async fn allow_message(&self, connection: &str) -> bool {
        self.rate_limiter.allow_message(connection).await
    }

    /// Register a freshly upgraded connection
    pub async fn register_connection(
        &self,
        connection: ConnectionId,
        sender: mpsc::UnboundedSender<WsMessage>,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.register(connection, sender)?;
        debug!("Current connections: {}", sessions.client_count());
        Ok(())
    }

    /// The socket is gone: tell its room and forget it
    pub async fn unregister_connection(&self, connection: &str) -> Result<()> {
        self.dispatch(
            connection,
            RoomEvent::Disconnect {
                connection: connection.to_string(),
            },
        )
        .await;
        self.rate_limiter.remove(connection).await;

        let mut sessions = self.sessions.write().await;
        sessions.unregister(connection)?;
        debug!("Current connections: {}", sessions.client_count());
        Ok(())
    }

    pub async fn send_to_connection(&self, connection: &str, message: &ServerMessage) -> bool {
        self.sessions.read().await.send(connection, message)
    }

    /// Open a room with `connection` as its first player. Returns the code.
    pub async fn create_room(
        &self,
        connection: &str,
        player_name: &str,
        category: &str,
        series_length: u8,
    ) -> Result<String> {
        // Allocation and insertion under one lock so two creates never share a code
        let mut registry = self.registry.write().await;
        let code = registry.allocate_code(&mut rand::thread_rng())?;
        let (orchestrator, effects) = SessionOrchestrator::create(
            code.clone(),
            category,
            series_length,
            connection.to_string(),
            player_name,
            self.services.clone(),
            StdRng::from_entropy(),
        )?;
        let (handle, inbox) = RoomActor::channel(&code);
        registry.insert(handle.clone())?;
        drop(registry);

        // Binding the creator moves them out of any room they were in
        RoomActor::new(
            orchestrator,
            &handle,
            inbox,
            self.sessions.clone(),
            self.registry.clone(),
        )
        .spawn(effects);
        Ok(code)
    }

    /// Ask a room to seat `connection`. The room answers the client itself,
    /// and the connection only leaves its current room once it is seated.
    pub async fn join_room(&self, connection: &str, room_code: &str, player_name: &str) -> Result<()> {
        let handle = self.find_room(room_code).await.ok_or(WordRushError::RoomNotFound)?;
        if self.current_room(connection).await.as_deref() == Some(handle.code.as_str()) {
            return Err(WordRushError::InvalidInput(
                "You are already in this room".to_string(),
            ));
        }

        let sent = handle.send(RoomCommand::Event(RoomEvent::Join {
            connection: connection.to_string(),
            player_name: player_name.to_string(),
        }));
        if sent {
            Ok(())
        } else {
            Err(WordRushError::RoomNotFound)
        }
    }

    /// Ask a room to hand a seat back to `connection`
    pub async fn reconnect(&self, connection: &str, room_code: &str, player_name: &str) -> Result<()> {
        let gone = || WordRushError::InvalidInput("Room no longer exists".to_string());
        let handle = self.find_room(room_code).await.ok_or_else(gone)?;

        let sent = handle.send(RoomCommand::Event(RoomEvent::Reconnect {
            connection: connection.to_string(),
            player_name: player_name.to_string(),
        }));
        if sent {
            Ok(())
        } else {
            Err(gone())
        }
    }

    /// Route an event to the room `connection` is bound to. False if there is none.
    pub async fn dispatch(&self, connection: &str, event: RoomEvent) -> bool {
        let handle = self.registry.read().await.room_for_connection(connection).cloned();
        match handle {
            Some(handle) => handle.send(RoomCommand::Event(event)),
            None => {
                debug!("Connection {} is not in a room", connection);
                false
            }
        }
    }

    /// Leave whatever room `connection` is in
    pub async fn leave_current_room(&self, connection: &str) {
        let handle = {
            let mut registry = self.registry.write().await;
            let handle = registry.room_for_connection(connection).cloned();
            if let Some(handle) = &handle {
                registry.unbind(connection, &handle.code);
            }
            handle
        };

        if let Some(handle) = handle {
            info!("Connection {} leaving room {}", connection, handle.code);
            if !handle.send(RoomCommand::Event(RoomEvent::Leave {
                connection: connection.to_string(),
            })) {
                warn!("Room {} was already closed", handle.code);
            }
        }
    }

    pub async fn current_room(&self, connection: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .room_for_connection(connection)
            .map(|handle| handle.code.clone())
    }

    async fn find_room(&self, room_code: &str) -> Option<RoomHandle> {
        let code = normalize_room_code(room_code)?;
        self.registry.read().await.get(&code).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.registry.read().await.room_count()
    }

    pub async fn client_count(&self) -> usize {
        self.sessions.read().await.client_count()
    }
}

/// Thread-safe server manager
pub type SharedServerManager = Arc<ServerManager>;
