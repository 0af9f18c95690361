//! Best-of-N series bookkeeping

use std::collections::BTreeMap;

use crate::core::room::PlayerId;
use crate::error::{Result, WordRushError};

/// Allowed series lengths
pub const SERIES_LENGTHS: [u8; 4] = [1, 3, 5, 7];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesState {
    length: u8,
    wins: BTreeMap<PlayerId, u32>,
    games_played: u32,
}

impl SeriesState {
    pub fn new(length: u8) -> Result<Self> {
        if !SERIES_LENGTHS.contains(&length) {
            return Err(WordRushError::InvalidSeriesLength(length));
        }
        Ok(Self {
            length,
            wins: BTreeMap::new(),
            games_played: 0,
        })
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn wins_needed(&self) -> u32 {
        (self.length as u32 + 1) / 2
    }

    pub fn wins(&self) -> &BTreeMap<PlayerId, u32> {
        &self.wins
    }

    pub fn wins_of(&self, player_id: &str) -> u32 {
        self.wins.get(player_id).copied().unwrap_or(0)
    }

    /// Make sure a player shows up in the tally, even at zero
    pub fn enroll(&mut self, player_id: &str) {
        self.wins.entry(player_id.to_string()).or_insert(0);
    }

    /// Count a finished game; `None` is a tie
    pub fn record_game_result(&mut self, winner: Option<&str>) {
        self.games_played += 1;
        if let Some(winner) = winner {
            *self.wins.entry(winner.to_string()).or_insert(0) += 1;
        }
    }

    pub fn is_over(&self) -> bool {
        if self.length == 1 {
            return self.games_played > 0;
        }
        self.wins.values().any(|&wins| wins >= self.wins_needed())
    }

    pub fn winner(&self) -> Option<PlayerId> {
        let needed = self.wins_needed();
        self.wins
            .iter()
            .find(|(_, &wins)| wins >= needed)
            .map(|(id, _)| id.clone())
    }

    /// Start a fresh series with the same length
    pub fn reset(&mut self) {
        for wins in self.wins.values_mut() {
            *wins = 0;
        }
        self.games_played = 0;
    }

    /// A player left the room for good. The roster changed, so the series
    /// starts over for whoever remains.
    pub fn withdraw(&mut self, player_id: &str) {
        self.wins.remove(player_id);
        self.reset();
    }
}
