//! Live rooms, by code, and which room each connection is speaking to

use rand::Rng;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::constants::{ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};
use crate::core::connection::ConnectionId;
use crate::core::room_actor::RoomCommand;
use crate::error::{Result, WordRushError};

/// Give up on finding a free code after this many draws
const MAX_CODE_DRAWS: usize = 1000;

/// Address of a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub code: String,
    pub sender: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Queue a command. False if the room has already shut down.
    pub fn send(&self, command: RoomCommand) -> bool {
        self.sender.send(command).is_ok()
    }
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomHandle>,
    connection_rooms: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a code no live room is using
    pub fn allocate_code<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        for _ in 0..MAX_CODE_DRAWS {
            let code: String = (0..ROOM_CODE_LENGTH)
                .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(WordRushError::InvalidInput(
            "No room codes available, try again later".to_string(),
        ))
    }

    pub fn insert(&mut self, handle: RoomHandle) -> Result<()> {
        if self.rooms.contains_key(&handle.code) {
            return Err(WordRushError::InvalidInput(format!(
                "room code {} is already in use",
                handle.code
            )));
        }
        self.rooms.insert(handle.code.clone(), handle);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&RoomHandle> {
        self.rooms.get(code)
    }

    pub fn room_for_connection(&self, connection: &str) -> Option<&RoomHandle> {
        self.connection_rooms
            .get(connection)
            .and_then(|code| self.rooms.get(code))
    }

    /// Point `connection` at `code`. Returns the room it was bound to before,
    /// if that was a different live room.
    pub fn bind(&mut self, connection: ConnectionId, code: &str) -> Option<RoomHandle> {
        let previous = self.connection_rooms.insert(connection, code.to_string())?;
        if previous == code {
            return None;
        }
        self.rooms.get(&previous).cloned()
    }

    /// Forget the binding, but only if it still points at `code`; the
    /// connection may already have moved on to another room.
    pub fn unbind(&mut self, connection: &str, code: &str) -> bool {
        if self.connection_rooms.get(connection).map(String::as_str) == Some(code) {
            self.connection_rooms.remove(connection);
            true
        } else {
            false
        }
    }

    /// Drop a room and every binding into it
    pub fn remove(&mut self, code: &str) -> Option<RoomHandle> {
        self.connection_rooms.retain(|_, bound| bound != code);
        self.rooms.remove(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn handle(code: &str) -> (RoomHandle, mpsc::UnboundedReceiver<RoomCommand>) {
        let (sender, rx) = mpsc::unbounded_channel();
        (
            RoomHandle {
                code: code.to_string(),
                sender,
            },
            rx,
        )
    }

    #[test]
    fn test_allocated_codes_use_alphabet() {
        let registry = RoomRegistry::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let code = registry.allocate_code(&mut rng).unwrap();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_allocate_skips_live_codes() {
        let mut registry = RoomRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);
        let taken = registry.allocate_code(&mut StdRng::seed_from_u64(3)).unwrap();
        let (h, _rx) = handle(&taken);
        registry.insert(h).unwrap();
        assert_ne!(registry.allocate_code(&mut rng).unwrap(), taken);
    }

    #[test]
    fn test_unbind_only_matching_room() {
        let mut registry = RoomRegistry::new();
        let (a, _ra) = handle("AAAAAA");
        let (b, _rb) = handle("BBBBBB");
        registry.insert(a).unwrap();
        registry.insert(b).unwrap();

        assert!(registry.bind("c1".to_string(), "AAAAAA").is_none());
        let left = registry.bind("c1".to_string(), "BBBBBB");
        assert_eq!(left.map(|h| h.code), Some("AAAAAA".to_string()));
        assert!(registry.bind("c1".to_string(), "BBBBBB").is_none());
        assert!(!registry.unbind("c1", "AAAAAA"));
        assert_eq!(registry.room_for_connection("c1").unwrap().code, "BBBBBB");
        assert!(registry.unbind("c1", "BBBBBB"));
        assert!(registry.room_for_connection("c1").is_none());
    }

    #[test]
    fn test_remove_drops_bindings() {
        let mut registry = RoomRegistry::new();
        let (a, _ra) = handle("AAAAAA");
        registry.insert(a).unwrap();
        registry.bind("c1".to_string(), "AAAAAA");

        assert!(registry.remove("AAAAAA").is_some());
        assert!(registry.room_for_connection("c1").is_none());
        assert_eq!(registry.room_count(), 0);
    }
}
