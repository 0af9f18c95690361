//! WordRush - a real-time two-player word-search contest server
//!
//! Players meet in a room by code, race to find the same hidden words on a
//! shared grid, and spend power-ups earned along the way. Each room runs on
//! its own task; clients speak JSON events over a WebSocket.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod game;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::{GameConfig, ServerConfig};
pub use constants::*;
pub use error::{Result, WordRushError};
