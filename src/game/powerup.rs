//! Power-ups: earning charges and applying effects
//!
//! Each power-up type is a [`PowerupHandler`] registered by kind. A
//! deployment picks one rule set (see `GameConfig::powerups`) and the
//! registry only knows the handlers of that set. Handlers check their own
//! preconditions before touching state, so a rejected use changes nothing.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::GameConfig;
use crate::core::room::{Player, PlayerId};
use crate::game::session::{Cell, GameSession, PowerupState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerupKind {
    Freeze,
    Hint,
    Fog,
    Scramble,
    Bonus,
    Steal,
    Drain,
    Rotate,
}

impl PowerupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::Hint => "hint",
            Self::Fog => "fog",
            Self::Scramble => "scramble",
            Self::Bonus => "bonus",
            Self::Steal => "steal",
            Self::Drain => "drain",
            Self::Rotate => "rotate",
        }
    }
}

impl fmt::Display for PowerupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerupKind {
    type Err = PowerupRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "freeze" => Ok(Self::Freeze),
            "hint" => Ok(Self::Hint),
            "fog" => Ok(Self::Fog),
            "scramble" => Ok(Self::Scramble),
            "bonus" => Ok(Self::Bonus),
            "steal" => Ok(Self::Steal),
            "drain" => Ok(Self::Drain),
            "rotate" => Ok(Self::Rotate),
            _ => Err(PowerupRejection::UnknownType),
        }
    }
}

/// Who an effect lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTarget {
    User,
    Opponent,
    Room,
}

/// A square of the opponent's grid to cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FogPatch {
    pub row: usize,
    pub col: usize,
    pub size: usize,
}

/// What a successful use did, for the caller to announce
#[derive(Debug, Clone, PartialEq)]
pub enum PowerupOutcome {
    Freeze {
        frozen_player_id: PlayerId,
        duration: Duration,
    },
    Hint {
        cells: Vec<Cell>,
        word: String,
        duration: Duration,
    },
    Fog {
        patches: Vec<FogPatch>,
        duration: Duration,
    },
    Scramble {
        duration: Duration,
    },
    Rotate {
        duration: Duration,
    },
    Bonus,
    Steal {
        thief_id: PlayerId,
    },
    Drain {
        drainer_id: PlayerId,
    },
}

impl PowerupOutcome {
    pub fn kind(&self) -> PowerupKind {
        match self {
            Self::Freeze { .. } => PowerupKind::Freeze,
            Self::Hint { .. } => PowerupKind::Hint,
            Self::Fog { .. } => PowerupKind::Fog,
            Self::Scramble { .. } => PowerupKind::Scramble,
            Self::Rotate { .. } => PowerupKind::Rotate,
            Self::Bonus => PowerupKind::Bonus,
            Self::Steal { .. } => PowerupKind::Steal,
            Self::Drain { .. } => PowerupKind::Drain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerupRejection {
    UnknownType,
    InvalidState,
    NoCharges(PowerupKind),
    Cooldown(PowerupKind),
    NoOpponent,
    NoWordsLeft,
    NothingToSteal,
    NothingToDrain,
}

impl fmt::Display for PowerupRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType => write!(f, "Unknown powerup type"),
            Self::InvalidState => write!(f, "Invalid state"),
            Self::NoCharges(kind) => write!(f, "No {} charges", kind),
            Self::Cooldown(kind) => write!(f, "{} on cooldown", capitalize(kind.as_str())),
            Self::NoOpponent => write!(f, "No opponent to target"),
            Self::NoWordsLeft => write!(f, "No words left"),
            Self::NothingToSteal => write!(f, "Nothing to steal"),
            Self::NothingToDrain => write!(f, "Nothing to drain"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Everything an effect may read or change
pub struct EffectContext<'a> {
    pub now: Instant,
    pub user: &'a str,
    pub opponent: Option<&'a str>,
    pub session: &'a mut GameSession,
    pub players: &'a mut [Player],
    pub rng: &'a mut dyn RngCore,
}

pub trait PowerupHandler: Send + Sync {
    fn kind(&self) -> PowerupKind;

    /// Charges spent per use
    fn cost(&self) -> u32 {
        1
    }

    /// Minimum time between two uses by the same player
    fn cooldown(&self) -> Option<Duration> {
        None
    }

    fn target(&self) -> EffectTarget;

    /// Apply the effect. Must leave state untouched when returning `Err`.
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection>;
}

pub struct Freeze {
    pub duration: Duration,
    pub cooldown: Duration,
}

impl PowerupHandler for Freeze {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Freeze
    }

    fn cooldown(&self) -> Option<Duration> {
        Some(self.cooldown)
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Opponent
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        let opponent = ctx.opponent.ok_or(PowerupRejection::NoOpponent)?;
        let state = ctx
            .session
            .powerups
            .get_mut(opponent)
            .ok_or(PowerupRejection::NoOpponent)?;
        state.frozen_until = Some(ctx.now + self.duration);
        Ok(PowerupOutcome::Freeze {
            frozen_player_id: opponent.to_string(),
            duration: self.duration,
        })
    }
}

pub struct Hint {
    pub duration: Duration,
}

impl PowerupHandler for Hint {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Hint
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::User
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        let unfound: Vec<_> = ctx.session.words.iter().filter(|w| !w.found).collect();
        let word = unfound.choose(ctx.rng).ok_or(PowerupRejection::NoWordsLeft)?;
        Ok(PowerupOutcome::Hint {
            cells: vec![word.start()],
            word: word.word.clone(),
            duration: self.duration,
        })
    }
}

pub struct Fog {
    pub duration: Duration,
    pub size: usize,
    pub patches: usize,
}

impl PowerupHandler for Fog {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Fog
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Opponent
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        if ctx.opponent.is_none() {
            return Err(PowerupRejection::NoOpponent);
        }
        let size = self.size.min(ctx.session.grid_size());
        let max_start = ctx.session.grid_size() - size;
        let patches = (0..self.patches)
            .map(|_| FogPatch {
                row: ctx.rng.gen_range(0..=max_start),
                col: ctx.rng.gen_range(0..=max_start),
                size,
            })
            .collect();
        Ok(PowerupOutcome::Fog {
            patches,
            duration: self.duration,
        })
    }
}

pub struct Scramble {
    pub duration: Duration,
}

impl PowerupHandler for Scramble {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Scramble
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Opponent
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        if ctx.opponent.is_none() {
            return Err(PowerupRejection::NoOpponent);
        }
        Ok(PowerupOutcome::Scramble {
            duration: self.duration,
        })
    }
}

pub struct Rotate {
    pub duration: Duration,
}

impl PowerupHandler for Rotate {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Rotate
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Opponent
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        if ctx.opponent.is_none() {
            return Err(PowerupRejection::NoOpponent);
        }
        Ok(PowerupOutcome::Rotate {
            duration: self.duration,
        })
    }
}

pub struct Bonus;

impl PowerupHandler for Bonus {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Bonus
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::User
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        let state = ctx
            .session
            .powerups
            .get_mut(ctx.user)
            .ok_or(PowerupRejection::InvalidState)?;
        state.bonus_active = true;
        Ok(PowerupOutcome::Bonus)
    }
}

/// Moves one point from the opponent to the user
pub struct Steal;

impl PowerupHandler for Steal {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Steal
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Room
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        let opponent = ctx.opponent.ok_or(PowerupRejection::NoOpponent)?;
        let victim = ctx
            .players
            .iter()
            .position(|p| p.id == opponent)
            .ok_or(PowerupRejection::NoOpponent)?;
        let thief = ctx
            .players
            .iter()
            .position(|p| p.id == ctx.user)
            .ok_or(PowerupRejection::InvalidState)?;
        if ctx.players[victim].score == 0 {
            return Err(PowerupRejection::NothingToSteal);
        }
        ctx.players[victim].score -= 1;
        ctx.players[thief].score += 1;
        Ok(PowerupOutcome::Steal {
            thief_id: ctx.user.to_string(),
        })
    }
}

/// Removes one point from the opponent
pub struct Drain;

impl PowerupHandler for Drain {
    fn kind(&self) -> PowerupKind {
        PowerupKind::Drain
    }

    fn target(&self) -> EffectTarget {
        EffectTarget::Room
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<PowerupOutcome, PowerupRejection> {
        let opponent = ctx.opponent.ok_or(PowerupRejection::NoOpponent)?;
        let victim = ctx
            .players
            .iter_mut()
            .find(|p| p.id == opponent)
            .ok_or(PowerupRejection::NoOpponent)?;
        if victim.score == 0 {
            return Err(PowerupRejection::NothingToDrain);
        }
        victim.score -= 1;
        Ok(PowerupOutcome::Drain {
            drainer_id: ctx.user.to_string(),
        })
    }
}

/// Handlers of the power-ups in play, keyed by kind
#[derive(Default)]
pub struct PowerupRegistry {
    handlers: BTreeMap<PowerupKind, Box<dyn PowerupHandler>>,
}

impl PowerupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding exactly the configured rule set
    pub fn from_config(config: &GameConfig) -> Self {
        let mut registry = Self::new();
        for kind in &config.powerups {
            let handler: Box<dyn PowerupHandler> = match kind {
                PowerupKind::Freeze => Box::new(Freeze {
                    duration: config.freeze_duration,
                    cooldown: config.freeze_cooldown,
                }),
                PowerupKind::Hint => Box::new(Hint {
                    duration: config.hint_duration,
                }),
                PowerupKind::Fog => Box::new(Fog {
                    duration: config.fog_duration,
                    size: config.fog_size,
                    patches: config.fog_patches,
                }),
                PowerupKind::Scramble => Box::new(Scramble {
                    duration: config.scramble_duration,
                }),
                PowerupKind::Rotate => Box::new(Rotate {
                    duration: config.rotate_duration,
                }),
                PowerupKind::Bonus => Box::new(Bonus),
                PowerupKind::Steal => Box::new(Steal),
                PowerupKind::Drain => Box::new(Drain),
            };
            registry.register(handler);
        }
        registry
    }

    pub fn register(&mut self, handler: Box<dyn PowerupHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn kinds(&self) -> Vec<PowerupKind> {
        self.handlers.keys().copied().collect()
    }

    pub fn target_of(&self, kind: PowerupKind) -> Option<EffectTarget> {
        self.handlers.get(&kind).map(|handler| handler.target())
    }

    /// Count a found word and award a charge every `cadence` words.
    /// Returns the new charge totals when a charge was awarded.
    pub fn earn<R: Rng + ?Sized>(
        &self,
        state: &mut PowerupState,
        cadence: u32,
        cap: u32,
        rng: &mut R,
    ) -> Option<BTreeMap<PowerupKind, u32>> {
        state.words_found += 1;
        if cadence == 0 || state.words_found % cadence != 0 {
            return None;
        }

        let eligible: Vec<PowerupKind> = self
            .handlers
            .keys()
            .copied()
            .filter(|kind| state.charges_of(*kind) < cap)
            .collect();
        let kind = eligible.choose(rng)?;
        *state.charges.entry(*kind).or_insert(0) += 1;
        Some(state.charges.clone())
    }

    /// Spend a charge of `kind` and apply its effect
    pub fn use_powerup(
        &self,
        kind: &str,
        ctx: &mut EffectContext<'_>,
    ) -> Result<PowerupOutcome, PowerupRejection> {
        let kind: PowerupKind = kind.parse()?;
        let handler = self.handlers.get(&kind).ok_or(PowerupRejection::UnknownType)?;

        let state = ctx
            .session
            .powerups
            .get(ctx.user)
            .ok_or(PowerupRejection::InvalidState)?;
        if state.charges_of(kind) < handler.cost() {
            return Err(PowerupRejection::NoCharges(kind));
        }
        if let (Some(cooldown), Some(last)) = (handler.cooldown(), state.last_used.get(&kind)) {
            if ctx.now < *last + cooldown {
                return Err(PowerupRejection::Cooldown(kind));
            }
        }

        let outcome = handler.apply(ctx)?;

        let state = ctx
            .session
            .powerups
            .get_mut(ctx.user)
            .ok_or(PowerupRejection::InvalidState)?;
        if let Some(charges) = state.charges.get_mut(&kind) {
            *charges -= handler.cost();
        }
        state.last_used.insert(kind, ctx.now);
        Ok(outcome)
    }
}
