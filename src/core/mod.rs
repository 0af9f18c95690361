//! Core functionality for the WebSocket server

pub mod connection;
pub mod message_handler;
pub mod message_types;
pub mod rate_limiter;
pub mod registry;
pub mod room;
pub mod room_actor;
pub mod server;
pub mod session;
pub mod timers;

// Re-export main components for convenience
pub use connection::{Connection, ConnectionId};
pub use message_handler::MessageHandler;
pub use message_types::{ClientMessage, ServerMessage};
pub use rate_limiter::MessageRateLimiter;
pub use registry::{RoomHandle, RoomRegistry};
pub use room::{Phase, Player, PlayerId, Room};
pub use room_actor::{RoomActor, RoomCommand};
pub use server::{ServerManager, SharedServerManager};
pub use session::SessionManager;
