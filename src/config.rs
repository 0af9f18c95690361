//! Server and game configuration
//! Every tunable is read from `WORDRUSH_*` environment variables with a
//! sensible default

use crate::constants::*;
use crate::error::{Result, WordRushError};
use crate::game::powerup::PowerupKind;
use crate::game::scoring::{EscalationTier, FinalTier};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Optional JSON file of `{category: [words]}`; built-in lists otherwise
    pub word_list_path: Option<String>,
    /// Rate limit: messages per minute per connection
    pub rate_limit_messages_per_minute: u32,
    /// Largest inbound text frame accepted, in bytes
    pub max_message_size: usize,
    pub game: GameConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("WORDRUSH_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env_parse("WORDRUSH_PORT", DEFAULT_PORT)?;
        let word_list_path = env::var("WORDRUSH_WORD_LIST").ok();
        let rate_limit_messages_per_minute =
            env_parse("WORDRUSH_RATE_LIMIT_MSG_PER_MIN", DEFAULT_RATE_LIMIT_MSG_PER_MIN)?;
        let max_message_size = env_parse("WORDRUSH_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE)?;

        Ok(Self {
            host,
            port,
            word_list_path,
            rate_limit_messages_per_minute,
            max_message_size,
            game: GameConfig::from_env()?,
        })
    }
}

/// Rules and timings of a single game
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub grid_size: usize,
    pub words_per_game: usize,
    pub generation_attempts: usize,
    pub countdown_seconds: u32,
    /// Period of the lobby countdown and final-countdown tickers
    pub tick_interval: Duration,
    pub final_countdown_seconds: u32,
    pub escalation_tiers: Vec<EscalationTier>,
    pub final_countdown_tiers: Vec<FinalTier>,
    pub bonus_multiplier: u32,
    pub words_per_powerup: u32,
    pub max_powerup_charges: u32,
    pub powerups: Vec<PowerupKind>,
    pub freeze_duration: Duration,
    pub freeze_cooldown: Duration,
    pub hint_duration: Duration,
    pub fog_duration: Duration,
    pub fog_size: usize,
    pub fog_patches: usize,
    pub scramble_duration: Duration,
    pub rotate_duration: Duration,
    pub disconnect_grace: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            words_per_game: DEFAULT_WORDS_PER_GAME,
            generation_attempts: DEFAULT_GENERATION_ATTEMPTS,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            tick_interval: Duration::from_secs(1),
            final_countdown_seconds: DEFAULT_FINAL_COUNTDOWN_SECONDS,
            escalation_tiers: EscalationTier::defaults(),
            final_countdown_tiers: FinalTier::defaults(),
            bonus_multiplier: DEFAULT_BONUS_MULTIPLIER,
            words_per_powerup: DEFAULT_WORDS_PER_POWERUP,
            max_powerup_charges: DEFAULT_MAX_POWERUP_CHARGES,
            powerups: vec![
                PowerupKind::Freeze,
                PowerupKind::Hint,
                PowerupKind::Fog,
                PowerupKind::Bonus,
                PowerupKind::Steal,
            ],
            freeze_duration: Duration::from_millis(DEFAULT_FREEZE_DURATION_MS),
            freeze_cooldown: Duration::from_millis(DEFAULT_FREEZE_COOLDOWN_MS),
            hint_duration: Duration::from_millis(DEFAULT_HINT_DURATION_MS),
            fog_duration: Duration::from_millis(DEFAULT_FOG_DURATION_MS),
            fog_size: DEFAULT_FOG_SIZE,
            fog_patches: DEFAULT_FOG_PATCHES,
            scramble_duration: Duration::from_millis(DEFAULT_SCRAMBLE_DURATION_MS),
            rotate_duration: Duration::from_millis(DEFAULT_ROTATE_DURATION_MS),
            disconnect_grace: Duration::from_millis(DEFAULT_DISCONNECT_GRACE_MS),
        }
    }
}

impl GameConfig {
    /// Load game rules from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let escalation_tiers = match env::var("WORDRUSH_ESCALATION_TIERS") {
            Ok(raw) => parse_escalation_tiers(&raw)?,
            Err(_) => defaults.escalation_tiers.clone(),
        };
        let final_countdown_tiers = match env::var("WORDRUSH_FINAL_TIERS") {
            Ok(raw) => parse_final_tiers(&raw)?,
            Err(_) => defaults.final_countdown_tiers.clone(),
        };
        let powerups = match env::var("WORDRUSH_POWERUPS") {
            Ok(raw) => parse_powerup_set(&raw)?,
            Err(_) => defaults.powerups.clone(),
        };

        let config = Self {
            grid_size: env_parse("WORDRUSH_GRID_SIZE", defaults.grid_size)?,
            words_per_game: env_parse("WORDRUSH_WORDS_PER_GAME", defaults.words_per_game)?,
            generation_attempts: env_parse(
                "WORDRUSH_GENERATION_ATTEMPTS",
                defaults.generation_attempts,
            )?,
            countdown_seconds: env_parse("WORDRUSH_COUNTDOWN_SECONDS", defaults.countdown_seconds)?,
            tick_interval: env_millis("WORDRUSH_TICK_MS", defaults.tick_interval)?,
            final_countdown_seconds: env_parse(
                "WORDRUSH_FINAL_COUNTDOWN_SECONDS",
                defaults.final_countdown_seconds,
            )?,
            escalation_tiers,
            final_countdown_tiers,
            bonus_multiplier: env_parse("WORDRUSH_BONUS_MULTIPLIER", defaults.bonus_multiplier)?,
            words_per_powerup: env_parse("WORDRUSH_WORDS_PER_POWERUP", defaults.words_per_powerup)?,
            max_powerup_charges: env_parse(
                "WORDRUSH_MAX_POWERUP_CHARGES",
                defaults.max_powerup_charges,
            )?,
            powerups,
            freeze_duration: env_millis("WORDRUSH_FREEZE_MS", defaults.freeze_duration)?,
            freeze_cooldown: env_millis("WORDRUSH_FREEZE_COOLDOWN_MS", defaults.freeze_cooldown)?,
            hint_duration: env_millis("WORDRUSH_HINT_MS", defaults.hint_duration)?,
            fog_duration: env_millis("WORDRUSH_FOG_MS", defaults.fog_duration)?,
            fog_size: env_parse("WORDRUSH_FOG_SIZE", defaults.fog_size)?,
            fog_patches: env_parse("WORDRUSH_FOG_PATCHES", defaults.fog_patches)?,
            scramble_duration: env_millis("WORDRUSH_SCRAMBLE_MS", defaults.scramble_duration)?,
            rotate_duration: env_millis("WORDRUSH_ROTATE_MS", defaults.rotate_duration)?,
            disconnect_grace: env_millis("WORDRUSH_DISCONNECT_GRACE_MS", defaults.disconnect_grace)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject rule combinations the engine cannot run
    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            return Err(WordRushError::ConfigError("grid size must be at least 2".to_string()));
        }
        if self.words_per_game == 0 {
            return Err(WordRushError::ConfigError(
                "words per game must be at least 1".to_string(),
            ));
        }
        if self.words_per_powerup == 0 {
            return Err(WordRushError::ConfigError(
                "words per power-up must be at least 1".to_string(),
            ));
        }
        if self.fog_size > self.grid_size {
            return Err(WordRushError::ConfigError(
                "fog patch cannot be larger than the grid".to_string(),
            ));
        }
        if self.escalation_tiers.is_empty() || self.final_countdown_tiers.is_empty() {
            return Err(WordRushError::ConfigError("tier tables cannot be empty".to_string()));
        }
        validate_powerup_set(&self.powerups)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WordRushError::ConfigError(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    env_parse(key, default.as_millis() as u64).map(Duration::from_millis)
}

fn parse_pairs(raw: &str, what: &str) -> Result<Vec<(u32, u32)>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (left, right) = part.trim().split_once(':').ok_or_else(|| {
                WordRushError::ConfigError(format!("{} entry '{}' is not of the form a:b", what, part))
            })?;
            let left = left.trim().parse().map_err(|_| {
                WordRushError::ConfigError(format!("{} entry '{}' is not numeric", what, part))
            })?;
            let right = right.trim().parse().map_err(|_| {
                WordRushError::ConfigError(format!("{} entry '{}' is not numeric", what, part))
            })?;
            Ok((left, right))
        })
        .collect()
}

/// Parse `threshold:multiplier` pairs, e.g. `0:1,6:2,9:3`
pub fn parse_escalation_tiers(raw: &str) -> Result<Vec<EscalationTier>> {
    let mut tiers: Vec<EscalationTier> = parse_pairs(raw, "escalation tier")?
        .into_iter()
        .map(|(threshold, multiplier)| EscalationTier { threshold, multiplier })
        .collect();
    tiers.sort_by_key(|tier| tier.threshold);
    if tiers.first().map(|tier| tier.threshold) != Some(0) {
        return Err(WordRushError::ConfigError(
            "escalation tiers must include a threshold of 0".to_string(),
        ));
    }
    Ok(tiers)
}

/// Parse `seconds:points` pairs, e.g. `40:5,30:4,20:3,10:2,0:1`
pub fn parse_final_tiers(raw: &str) -> Result<Vec<FinalTier>> {
    let mut tiers: Vec<FinalTier> = parse_pairs(raw, "final countdown tier")?
        .into_iter()
        .map(|(seconds, points)| FinalTier { seconds, points })
        .collect();
    tiers.sort_by(|a, b| b.seconds.cmp(&a.seconds));
    if tiers.last().map(|tier| tier.seconds) != Some(0) {
        return Err(WordRushError::ConfigError(
            "final countdown tiers must include a floor at 0 seconds".to_string(),
        ));
    }
    Ok(tiers)
}

/// Parse a comma separated power-up set, e.g. `freeze,hint,fog,bonus,steal`
pub fn parse_powerup_set(raw: &str) -> Result<Vec<PowerupKind>> {
    let mut kinds = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let kind: PowerupKind = name
            .parse()
            .map_err(|_| WordRushError::ConfigError(format!("unknown power-up '{}'", name)))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    validate_powerup_set(&kinds)?;
    Ok(kinds)
}

fn validate_powerup_set(kinds: &[PowerupKind]) -> Result<()> {
    if kinds.is_empty() {
        return Err(WordRushError::ConfigError("power-up set cannot be empty".to_string()));
    }
    let has = |kind| kinds.contains(&kind);
    if has(PowerupKind::Steal) && has(PowerupKind::Drain) {
        return Err(WordRushError::ConfigError(
            "steal and drain are alternative rule sets; enable only one".to_string(),
        ));
    }
    // Fog, scramble and rotate all disturb the opponent's view of the board
    let board_effects: Vec<&str> = [PowerupKind::Fog, PowerupKind::Scramble, PowerupKind::Rotate]
        .iter()
        .filter(|kind| has(**kind))
        .map(|kind| kind.as_str())
        .collect();
    if board_effects.len() > 1 {
        return Err(WordRushError::ConfigError(format!(
            "{} are alternative rule sets; enable only one",
            board_effects.join(" and ")
        )));
    }
    Ok(())
}
