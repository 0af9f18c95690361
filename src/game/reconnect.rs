//! Grace periods for players who drop mid-game

use std::collections::HashMap;
use tokio::time::Instant;

use crate::core::room::{PlayerId, Room};
use crate::error::{Result, WordRushError};

/// Players currently inside their reconnect window
#[derive(Debug, Default)]
pub struct ReconnectionManager {
    pending: HashMap<PlayerId, Instant>,
}

impl ReconnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a window for `player_id`, closing at `deadline`
    pub fn begin_grace(&mut self, player_id: &str, deadline: Instant) {
        self.pending.insert(player_id.to_string(), deadline);
    }

    #[cfg(test)]
    fn is_pending(&self, player_id: &str) -> bool {
        self.pending.contains_key(player_id)
    }

    /// Match a returning player by display name. Only a seat whose window is
    /// still open at `now` can be taken back; the window closes on success.
    pub fn resolve(&mut self, room: &Room, player_name: &str, now: Instant) -> Result<PlayerId> {
        let player = room
            .players
            .iter()
            .find(|p| p.name == player_name)
            .ok_or(WordRushError::PlayerNotFound)?;
        match self.pending.get(&player.id) {
            Some(deadline) if now <= *deadline => {
                self.pending.remove(&player.id);
                Ok(player.id.clone())
            }
            Some(_) => Err(WordRushError::InvalidInput(
                "Reconnect window has closed".to_string(),
            )),
            None => Err(WordRushError::InvalidInput(
                "That player is still connected".to_string(),
            )),
        }
    }

    /// The window ran out. Returns true if the player was still waiting.
    pub fn expire(&mut self, player_id: &str) -> bool {
        self.pending.remove(player_id).is_some()
    }

    /// Drop every open window, returning who was waiting
    pub fn clear(&mut self) -> Vec<PlayerId> {
        self.pending.drain().map(|(id, _)| id).collect()
    }
}
