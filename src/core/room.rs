use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    MAX_PLAYERS_PER_ROOM, MAX_PLAYER_NAME_LENGTH, ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH,
};
use crate::core::connection::ConnectionId;
use crate::error::{Result, WordRushError};
use crate::game::series::SeriesState;

/// Stable identity of a player for the lifetime of a room
pub type PlayerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Countdown,
    Playing,
    Results,
}

/// A seat in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    /// Transport session currently speaking for this player; replaced on reconnect
    pub connection: ConnectionId,
    pub name: String,
    pub ready: bool,
    pub score: u32,
    pub connected: bool,
}

impl Player {
    pub fn new(
        id: impl Into<String>,
        connection: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            connection: connection.into(),
            name: name.into(),
            ready: false,
            score: 0,
            connected: true,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            ready: self.ready,
            score: self.score,
            connected: self.connected,
        }
    }
}

/// Player as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub score: u32,
    pub connected: bool,
}

/// A two-player match and its series
#[derive(Debug, Clone)]
pub struct Room {
    /// Six character shareable code
    pub code: String,
    pub category: String,
    pub phase: Phase,
    /// Join order is preserved
    pub players: Vec<Player>,
    pub series: SeriesState,
    /// Bumped on every state change, echoed in snapshots
    pub version: u64,
}

impl Room {
    pub fn new(code: String, category: String, series: SeriesState) -> Self {
        Self {
            code,
            category,
            phase: Phase::Lobby,
            players: Vec::with_capacity(MAX_PLAYERS_PER_ROOM),
            series,
            version: 0,
        }
    }

    /// Seat a player. Fails without change if the room is full, mid-game, or
    /// already has someone by that name (names identify players on reconnect).
    pub fn add_player(&mut self, player: Player) -> Result<()> {
        if self.players.len() >= MAX_PLAYERS_PER_ROOM {
            return Err(WordRushError::RoomFull);
        }
        if self.phase != Phase::Lobby {
            return Err(WordRushError::GameInProgress);
        }
        if self.players.iter().any(|p| p.name == player.name) {
            return Err(WordRushError::NameTaken);
        }
        self.series.enroll(&player.id);
        self.players.push(player);
        self.touch();
        Ok(())
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        self.touch();
        Some(self.players.remove(index))
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id != player_id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS_PER_ROOM
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn all_ready(&self) -> bool {
        self.players.len() == MAX_PLAYERS_PER_ROOM && self.players.iter().all(|p| p.ready)
    }

    pub fn players_info(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::info).collect()
    }

    pub fn scores(&self) -> BTreeMap<PlayerId, u32> {
        self.players.iter().map(|p| (p.id.clone(), p.score)).collect()
    }

    /// Connections of every player still attached
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players
            .iter()
            .filter(|p| p.connected)
            .map(|p| p.connection.clone())
            .collect()
    }

    /// Back to the lobby: scores and ready flags cleared, series kept
    pub fn reset_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        for player in &mut self.players {
            player.ready = false;
            player.score = 0;
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.version += 1;
    }
}

/// Trimmed display name, or why it is unusable
pub fn validate_player_name(input: &str) -> Result<String> {
    let name = input.trim();
    if name.is_empty() {
        return Err(WordRushError::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
        return Err(WordRushError::InvalidInput(format!(
            "Name cannot be longer than {} characters",
            MAX_PLAYER_NAME_LENGTH
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(WordRushError::InvalidInput(
            "Name contains invalid characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Canonical form of a user supplied room code
pub fn normalize_room_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    let valid = code.len() == ROOM_CODE_LENGTH
        && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
    valid.then_some(code)
}
