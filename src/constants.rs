// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const WS_PATH: &str = "ws";

// Inbound message limits
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 2048;
pub const DEFAULT_RATE_LIMIT_MSG_PER_MIN: u32 = 240;

// Room codes
pub const ROOM_CODE_LENGTH: usize = 6;
/// No 0/O or 1/I so codes survive being read aloud
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const MAX_PLAYERS_PER_ROOM: usize = 2;
pub const MAX_PLAYER_NAME_LENGTH: usize = 20;

// Game defaults
pub const DEFAULT_GRID_SIZE: usize = 12;
pub const DEFAULT_WORDS_PER_GAME: usize = 12;
pub const DEFAULT_GENERATION_ATTEMPTS: usize = 50;
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 3;
pub const DEFAULT_FINAL_COUNTDOWN_SECONDS: u32 = 50;
pub const DEFAULT_FREEZE_DURATION_MS: u64 = 5_000;
pub const DEFAULT_FREEZE_COOLDOWN_MS: u64 = 10_000;
pub const DEFAULT_HINT_DURATION_MS: u64 = 3_000;
pub const DEFAULT_FOG_DURATION_MS: u64 = 5_000;
pub const DEFAULT_FOG_SIZE: usize = 3;
pub const DEFAULT_FOG_PATCHES: usize = 3;
pub const DEFAULT_SCRAMBLE_DURATION_MS: u64 = 5_000;
pub const DEFAULT_ROTATE_DURATION_MS: u64 = 5_000;
pub const DEFAULT_BONUS_MULTIPLIER: u32 = 2;
pub const DEFAULT_WORDS_PER_POWERUP: u32 = 2;
pub const DEFAULT_MAX_POWERUP_CHARGES: u32 = 99;
pub const DEFAULT_DISCONNECT_GRACE_MS: u64 = 30_000;
