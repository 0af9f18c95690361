//! Wire messages exchanged with game clients
//!
//! Every frame is a JSON envelope `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::room::{Phase, PlayerId, PlayerInfo};
use crate::game::claim::WordClaim;
use crate::game::powerup::{FogPatch, PowerupKind};
use crate::game::session::{Cell, WordStatus};

fn default_series_length() -> u8 {
    1
}

/// Client-to-server messages
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    #[serde(rename = "room:create")]
    RoomCreate {
        player_name: String,
        category: String,
        #[serde(default = "default_series_length")]
        series_length: u8,
    },

    #[serde(rename = "room:join")]
    RoomJoin {
        room_code: String,
        player_name: String,
    },

    #[serde(rename = "room:leave")]
    RoomLeave,

    #[serde(rename = "player:ready")]
    PlayerReady,

    #[serde(rename = "word:submit")]
    WordSubmit(WordClaim),

    #[serde(rename = "powerup:use")]
    PowerupUse {
        #[serde(rename = "type")]
        kind: String,
    },

    #[serde(rename = "room:playAgain")]
    PlayAgain,

    #[serde(rename = "reconnect:attempt")]
    ReconnectAttempt {
        room_code: String,
        player_name: String,
    },
}

/// Winner reference in a game result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerInfo {
    pub id: PlayerId,
    pub name: String,
}

/// Full room state for a (re)joining client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub version: u64,
    pub phase: Phase,
    pub room_code: String,
    pub category: String,
    pub series_length: u8,
    pub series_wins: BTreeMap<PlayerId, u32>,
    pub players: Vec<PlayerInfo>,
    pub player_id: PlayerId,
    pub scores: BTreeMap<PlayerId, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<Vec<char>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub powerups: Option<BTreeMap<PowerupKind, u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_countdown: Option<u32>,
}

/// Server-to-client messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    #[serde(rename = "room:created")]
    RoomCreated {
        room_code: String,
        players: Vec<PlayerInfo>,
        category: String,
        player_id: PlayerId,
        series_length: u8,
    },

    #[serde(rename = "room:joined")]
    RoomJoined {
        room_code: String,
        players: Vec<PlayerInfo>,
        category: String,
        player_id: PlayerId,
        series_length: u8,
    },

    #[serde(rename = "room:update")]
    RoomUpdate { players: Vec<PlayerInfo> },

    #[serde(rename = "room:error")]
    RoomError { message: String },

    #[serde(rename = "game:countdown")]
    Countdown { count: u32 },

    #[serde(rename = "game:start")]
    GameStart {
        grid: Vec<Vec<char>>,
        words: Vec<WordStatus>,
        scores: BTreeMap<PlayerId, u32>,
    },

    #[serde(rename = "word:confirmed")]
    WordConfirmed {
        word: String,
        found_by: PlayerId,
        cells: Vec<Cell>,
        points: u32,
        scores: BTreeMap<PlayerId, u32>,
        words: Vec<WordStatus>,
    },

    #[serde(rename = "word:rejected")]
    WordRejected { message: String },

    #[serde(rename = "game:multiplierUpdate")]
    MultiplierUpdate { multiplier: u32 },

    #[serde(rename = "game:finalCountdown")]
    FinalCountdown { seconds: u32, points: u32 },

    #[serde(rename = "powerup:earned")]
    PowerupEarned { powerups: BTreeMap<PowerupKind, u32> },

    #[serde(rename = "powerup:freeze")]
    PowerupFreeze {
        frozen_player_id: PlayerId,
        duration: u64,
    },

    #[serde(rename = "powerup:hint")]
    PowerupHint {
        cells: Vec<Cell>,
        word: String,
        duration: u64,
    },

    #[serde(rename = "powerup:fog")]
    PowerupFog { patches: Vec<FogPatch>, duration: u64 },

    #[serde(rename = "powerup:scramble")]
    PowerupScramble { duration: u64 },

    #[serde(rename = "powerup:rotate")]
    PowerupRotate { duration: u64 },

    #[serde(rename = "powerup:bonus")]
    PowerupBonus {},

    #[serde(rename = "powerup:bonusUsed")]
    PowerupBonusUsed {},

    #[serde(rename = "powerup:steal")]
    PowerupSteal {
        scores: BTreeMap<PlayerId, u32>,
        thief_id: PlayerId,
    },

    #[serde(rename = "powerup:drain")]
    PowerupDrain {
        scores: BTreeMap<PlayerId, u32>,
        drainer_id: PlayerId,
    },

    #[serde(rename = "game:end")]
    GameEnd {
        winner: Option<WinnerInfo>,
        scores: BTreeMap<PlayerId, u32>,
        series_wins: BTreeMap<PlayerId, u32>,
        series_length: u8,
        series_over: bool,
        series_winner: Option<PlayerId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename = "game:state")]
    GameState(Box<GameSnapshot>),

    #[serde(rename = "player:disconnected")]
    PlayerDisconnected { player_id: PlayerId },

    #[serde(rename = "player:reconnected")]
    PlayerReconnected { player_id: PlayerId },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::RoomError {
            message: message.into(),
        }
    }

    /// Wire name of this message
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "room:created",
            Self::RoomJoined { .. } => "room:joined",
            Self::RoomUpdate { .. } => "room:update",
            Self::RoomError { .. } => "room:error",
            Self::Countdown { .. } => "game:countdown",
            Self::GameStart { .. } => "game:start",
            Self::WordConfirmed { .. } => "word:confirmed",
            Self::WordRejected { .. } => "word:rejected",
            Self::MultiplierUpdate { .. } => "game:multiplierUpdate",
            Self::FinalCountdown { .. } => "game:finalCountdown",
            Self::PowerupEarned { .. } => "powerup:earned",
            Self::PowerupFreeze { .. } => "powerup:freeze",
            Self::PowerupHint { .. } => "powerup:hint",
            Self::PowerupFog { .. } => "powerup:fog",
            Self::PowerupScramble { .. } => "powerup:scramble",
            Self::PowerupRotate { .. } => "powerup:rotate",
            Self::PowerupBonus {} => "powerup:bonus",
            Self::PowerupBonusUsed {} => "powerup:bonusUsed",
            Self::PowerupSteal { .. } => "powerup:steal",
            Self::PowerupDrain { .. } => "powerup:drain",
            Self::GameEnd { .. } => "game:end",
            Self::GameState(_) => "game:state",
            Self::PlayerDisconnected { .. } => "player:disconnected",
            Self::PlayerReconnected { .. } => "player:reconnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "room:create",
            "data": { "playerName": "Ann", "category": "animals", "seriesLength": 3 }
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::RoomCreate { series_length: 3, .. }));

        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "room:create",
            "data": { "playerName": "Ann", "category": "animals" }
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::RoomCreate { series_length: 1, .. }));

        let msg: ClientMessage = serde_json::from_value(json!({ "event": "player:ready" })).unwrap();
        assert!(matches!(msg, ClientMessage::PlayerReady));

        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "word:submit",
            "data": { "startRow": 1, "startCol": 2, "endRow": 1, "endCol": 6 }
        }))
        .unwrap();
        match msg {
            ClientMessage::WordSubmit(claim) => assert_eq!(claim, WordClaim::new(1, 2, 1, 6)),
            other => panic!("unexpected message {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_value(json!({
            "event": "powerup:use",
            "data": { "type": "freeze" }
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::PowerupUse { ref kind } if kind == "freeze"));
    }

    #[test]
    fn test_unknown_event_is_an_error() {
        let result = serde_json::from_value::<ClientMessage>(json!({ "event": "chat:send" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_envelope() {
        let msg = ServerMessage::FinalCountdown { seconds: 42, points: 5 };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({ "event": "game:finalCountdown", "data": { "seconds": 42, "points": 5 } })
        );
        assert_eq!(value["event"], msg.event_name());

        let msg = ServerMessage::PowerupFreeze {
            frozen_player_id: "p2".to_string(),
            duration: 5000,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["frozenPlayerId"], "p2");

        let msg = ServerMessage::PowerupBonus {};
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "powerup:bonus");
    }

    #[test]
    fn test_game_end_omits_missing_reason() {
        let msg = ServerMessage::GameEnd {
            winner: None,
            scores: BTreeMap::new(),
            series_wins: BTreeMap::new(),
            series_length: 3,
            series_over: false,
            series_winner: None,
            reason: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["winner"], Value::Null);
        assert_eq!(value["data"]["seriesOver"], false);
        assert!(value["data"].get("reason").is_none());
    }
}
