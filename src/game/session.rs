//! State of one game: the letter grid, the hidden words and each player's
//! power-up bookkeeping

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::time::Instant;

use crate::core::room::PlayerId;
use crate::game::powerup::PowerupKind;
use crate::game::puzzle::Puzzle;

/// A grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Compare against client supplied coordinates, which may be negative
    pub fn matches(&self, row: i64, col: i64) -> bool {
        self.row as i64 == row && self.col as i64 == col
    }
}

/// A hidden word and where it lies on the grid
#[derive(Debug, Clone)]
pub struct WordEntry {
    pub word: String,
    /// Ordered from the first letter to the last
    pub cells: Vec<Cell>,
    pub found: bool,
    pub found_by: Option<PlayerId>,
}

impl WordEntry {
    pub fn new(word: String, cells: Vec<Cell>) -> Self {
        Self {
            word,
            cells,
            found: false,
            found_by: None,
        }
    }

    pub fn start(&self) -> Cell {
        self.cells[0]
    }

    pub fn end(&self) -> Cell {
        self.cells[self.cells.len() - 1]
    }

    /// True when the line spans this word in either reading direction
    pub fn spans(&self, start_row: i64, start_col: i64, end_row: i64, end_col: i64) -> bool {
        let (start, end) = (self.start(), self.end());
        let forward = start.matches(start_row, start_col) && end.matches(end_row, end_col);
        let reverse = start.matches(end_row, end_col) && end.matches(start_row, start_col);
        forward || reverse
    }

    /// Record the finder. Returns false if the word was already taken.
    pub fn mark_found(&mut self, player_id: &str) -> bool {
        if self.found {
            return false;
        }
        self.found = true;
        self.found_by = Some(player_id.to_string());
        true
    }
}

/// Per-player power-up bookkeeping, fresh for every game
#[derive(Debug, Clone, Default)]
pub struct PowerupState {
    pub charges: BTreeMap<PowerupKind, u32>,
    pub words_found: u32,
    pub last_used: HashMap<PowerupKind, Instant>,
    pub frozen_until: Option<Instant>,
    pub bonus_active: bool,
}

impl PowerupState {
    /// Zeroed charges for every kind in play
    pub fn with_kinds(kinds: impl IntoIterator<Item = PowerupKind>) -> Self {
        Self {
            charges: kinds.into_iter().map(|kind| (kind, 0)).collect(),
            ..Self::default()
        }
    }

    pub fn charges_of(&self, kind: PowerupKind) -> u32 {
        self.charges.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_frozen(&self, now: Instant) -> bool {
        self.frozen_until.map(|until| now < until).unwrap_or(false)
    }
}

/// Drain phase once only one word is left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalCountdown {
    pub remaining_seconds: u32,
}

/// What the clients are told about a word: positions stay hidden until found
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStatus {
    pub word: String,
    pub found: bool,
    pub found_by: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Cell>>,
}

/// A running game
#[derive(Debug, Clone)]
pub struct GameSession {
    grid: Vec<Vec<char>>,
    pub words: Vec<WordEntry>,
    pub powerups: HashMap<PlayerId, PowerupState>,
    pub final_countdown: Option<FinalCountdown>,
    /// Escalation multiplier the next claim will earn
    pub multiplier: u32,
}

impl GameSession {
    pub fn new<'a>(
        puzzle: Puzzle,
        players: impl IntoIterator<Item = &'a PlayerId>,
        kinds: &[PowerupKind],
    ) -> Self {
        let words = puzzle
            .placements
            .into_iter()
            .map(|placement| WordEntry::new(placement.word, placement.cells))
            .collect();
        let powerups = players
            .into_iter()
            .map(|id| (id.clone(), PowerupState::with_kinds(kinds.iter().copied())))
            .collect();

        Self {
            grid: puzzle.grid,
            words,
            powerups,
            final_countdown: None,
            multiplier: 1,
        }
    }

    pub fn grid(&self) -> &[Vec<char>] {
        &self.grid
    }

    pub fn grid_size(&self) -> usize {
        self.grid.len()
    }

    pub fn found_count(&self) -> usize {
        self.words.iter().filter(|w| w.found).count()
    }

    pub fn unfound_count(&self) -> usize {
        self.words.len() - self.found_count()
    }

    pub fn all_found(&self) -> bool {
        self.words.iter().all(|w| w.found)
    }

    pub fn is_frozen(&self, player_id: &str, now: Instant) -> bool {
        self.powerups
            .get(player_id)
            .map(|state| state.is_frozen(now))
            .unwrap_or(false)
    }

    /// Word list as shown to clients
    pub fn word_statuses(&self) -> Vec<WordStatus> {
        self.words
            .iter()
            .map(|w| WordStatus {
                word: w.word.clone(),
                found: w.found,
                found_by: w.found_by.clone(),
                cells: w.found.then(|| w.cells.clone()),
            })
            .collect()
    }

    /// Word list for the opening broadcast: nothing found yet
    pub fn initial_word_statuses(&self) -> Vec<WordStatus> {
        self.words
            .iter()
            .map(|w| WordStatus {
                word: w.word.clone(),
                found: false,
                found_by: None,
                cells: None,
            })
            .collect()
    }
}
