//! Point values: escalation by words found, the final-countdown drain, and
//! the bonus multiplier

use serde::Serialize;

use crate::game::session::{GameSession, PowerupState};

/// From `threshold` words found onward, each word is worth `multiplier`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EscalationTier {
    pub threshold: u32,
    pub multiplier: u32,
}

impl EscalationTier {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self { threshold: 0, multiplier: 1 },
            Self { threshold: 6, multiplier: 2 },
            Self { threshold: 9, multiplier: 3 },
        ]
    }
}

/// With at least `seconds` left on the final countdown, the last word is
/// worth `points`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalTier {
    pub seconds: u32,
    pub points: u32,
}

impl FinalTier {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self { seconds: 40, points: 5 },
            Self { seconds: 30, points: 4 },
            Self { seconds: 20, points: 3 },
            Self { seconds: 10, points: 2 },
            Self { seconds: 0, points: 1 },
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    escalation: Vec<EscalationTier>,
    final_tiers: Vec<FinalTier>,
    bonus_multiplier: u32,
    final_countdown_seconds: u32,
}

impl ScoringEngine {
    pub fn new(
        mut escalation: Vec<EscalationTier>,
        mut final_tiers: Vec<FinalTier>,
        bonus_multiplier: u32,
        final_countdown_seconds: u32,
    ) -> Self {
        escalation.sort_by_key(|tier| tier.threshold);
        final_tiers.sort_by(|a, b| b.seconds.cmp(&a.seconds));
        Self {
            escalation,
            final_tiers,
            bonus_multiplier,
            final_countdown_seconds,
        }
    }

    /// Multiplier of the highest tier whose threshold is at most `words_found`
    pub fn multiplier_for(&self, words_found: usize) -> u32 {
        self.escalation
            .iter()
            .rev()
            .find(|tier| tier.threshold as usize <= words_found)
            .map(|tier| tier.multiplier)
            .unwrap_or(1)
    }

    /// Points for the last word with `remaining` seconds on the clock
    pub fn final_points(&self, remaining: u32) -> u32 {
        self.final_tiers
            .iter()
            .find(|tier| remaining >= tier.seconds)
            .map(|tier| tier.points)
            .unwrap_or(1)
    }

    /// Base value of a claim made after `words_found_before` words were taken
    pub fn points_for(&self, session: &GameSession, words_found_before: usize) -> u32 {
        let unfound_before = session.words.len().saturating_sub(words_found_before);
        if unfound_before == 1 {
            let remaining = session
                .final_countdown
                .map(|countdown| countdown.remaining_seconds)
                .unwrap_or(self.final_countdown_seconds);
            return self.final_points(remaining);
        }
        self.multiplier_for(words_found_before)
    }

    /// Double an armed bonus into the claim and disarm it
    pub fn apply_bonus(&self, base: u32, state: &mut PowerupState) -> (u32, bool) {
        if state.bonus_active {
            state.bonus_active = false;
            (base * self.bonus_multiplier, true)
        } else {
            (base, false)
        }
    }
}
