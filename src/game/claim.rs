//! Word claim arbitration
//!
//! The first claim the room sequences for a word takes it; every later claim
//! for the same line is rejected.

use serde::Deserialize;
use std::fmt;
use tokio::time::Instant;

use crate::game::session::{Cell, GameSession};

/// A line dragged by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordClaim {
    pub start_row: i64,
    pub start_col: i64,
    pub end_row: i64,
    pub end_col: i64,
}

impl WordClaim {
    pub fn new(start_row: i64, start_col: i64, end_row: i64, end_col: i64) -> Self {
        Self {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    /// The same line dragged the other way
    pub fn reversed(&self) -> Self {
        Self::new(self.end_row, self.end_col, self.start_row, self.start_col)
    }
}

/// An accepted claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedWord {
    pub word: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    Frozen,
    AlreadyFound,
    NotAWord,
}

impl fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen => write!(f, "You are frozen!"),
            Self::AlreadyFound => write!(f, "That word was already found"),
            Self::NotAWord => write!(f, "Not a valid word"),
        }
    }
}

/// Check a claim and, if it names an unfound word, mark that word found
pub fn validate_claim(
    session: &mut GameSession,
    claimant: &str,
    claim: &WordClaim,
    now: Instant,
) -> Result<ClaimedWord, ClaimRejection> {
    if session.is_frozen(claimant, now) {
        return Err(ClaimRejection::Frozen);
    }

    let mut taken = false;
    for entry in session.words.iter_mut() {
        if !entry.spans(claim.start_row, claim.start_col, claim.end_row, claim.end_col) {
            continue;
        }
        if entry.mark_found(claimant) {
            return Ok(ClaimedWord {
                word: entry.word.clone(),
                cells: entry.cells.clone(),
            });
        }
        // Two words can share both endpoints only if one is the other reversed
        taken = true;
    }

    if taken {
        Err(ClaimRejection::AlreadyFound)
    } else {
        Err(ClaimRejection::NotAWord)
    }
}
