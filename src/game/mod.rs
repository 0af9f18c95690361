//! Game rules: puzzles, claims, scoring, power-ups, series and the per-room
//! orchestrator that ties them together

pub mod claim;
pub mod orchestrator;
pub mod powerup;
pub mod puzzle;
pub mod reconnect;
pub mod scoring;
pub mod series;
pub mod session;

pub use orchestrator::{Effect, GameServices, Outbound, RoomEvent, SessionOrchestrator, TimerKind};
pub use powerup::{PowerupKind, PowerupRegistry};
pub use session::GameSession;
