use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordRushError {
    // Session errors
    SessionNotFound(String),

    // Connection errors
    ConnectionError(String),

    // Message errors
    MessageParseError(String),
    MessageTooLarge(usize),
    RateLimited,

    // Room errors
    RoomNotFound,
    RoomFull,
    GameInProgress,
    PlayerNotFound,
    NameTaken,

    // Input validation errors
    InvalidInput(String),
    UnknownCategory(String),
    InvalidSeriesLength(u8),

    // Game errors
    PuzzleGeneration { attempts: usize },

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for WordRushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::RateLimited => write!(f, "Too many messages, slow down"),
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::RoomFull => write!(f, "Room is full"),
            Self::GameInProgress => write!(f, "Game already in progress"),
            Self::PlayerNotFound => write!(f, "Player not found in room"),
            Self::NameTaken => write!(f, "That name is already taken in this room"),
            Self::InvalidInput(msg) => write!(f, "{}", msg),
            Self::UnknownCategory(category) => write!(f, "Unknown category: {}", category),
            Self::InvalidSeriesLength(len) => {
                write!(f, "Invalid series length {} (expected 1, 3, 5 or 7)", len)
            }
            Self::PuzzleGeneration { attempts } => {
                write!(f, "Failed to generate puzzle after {} attempts", attempts)
            }
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for WordRushError {}

// Generic result type for WordRush
pub type Result<T> = std::result::Result<T, WordRushError>;
