//! Per-room game flow
//!
//! A [`SessionOrchestrator`] owns one room and its running game. It is fed
//! client events and timer firings one at a time and answers each with the
//! [`Effect`]s the caller has to carry out: messages to send, timers to arm or
//! cancel, connection bindings to update. It never touches sockets or clocks
//! itself; the room actor in `core::room_actor` does that.

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::core::connection::ConnectionId;
use crate::core::message_types::{GameSnapshot, ServerMessage, WinnerInfo};
use crate::core::room::{validate_player_name, Phase, Player, PlayerId, Room};
use crate::error::{Result, WordRushError};
use crate::game::claim::{validate_claim, WordClaim};
use crate::game::powerup::{EffectContext, EffectTarget, PowerupOutcome, PowerupRegistry};
use crate::game::puzzle::PuzzleGenerator;
use crate::game::reconnect::ReconnectionManager;
use crate::game::scoring::ScoringEngine;
use crate::game::series::SeriesState;
use crate::game::session::{FinalCountdown, GameSession};
use crate::storage::WordSource;

pub const REASON_OPPONENT_DISCONNECTED: &str = "opponent_disconnected";
pub const REASON_OPPONENT_LEFT: &str = "opponent_left";

/// Timers a room can have armed. At most one of each kind is live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    FinalCountdown,
    DisconnectGrace(PlayerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Vec<ConnectionId>,
    pub message: ServerMessage,
}

/// Side effects requested by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Outbound),
    /// Arm `timer`, replacing any live timer of the same kind
    Schedule { timer: TimerKind, after: Duration },
    Cancel(TimerKind),
    /// Route this connection's future events to the room
    Bind { connection: ConnectionId },
    /// Stop routing this connection to the room
    Unbind { connection: ConnectionId },
    /// The room is empty and should be dropped
    Close,
}

/// Client events routed to a room
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Join {
        connection: ConnectionId,
        player_name: String,
    },
    Ready {
        connection: ConnectionId,
    },
    SubmitWord {
        connection: ConnectionId,
        claim: WordClaim,
    },
    UsePowerup {
        connection: ConnectionId,
        kind: String,
    },
    PlayAgain {
        connection: ConnectionId,
    },
    Leave {
        connection: ConnectionId,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Reconnect {
        connection: ConnectionId,
        player_name: String,
    },
}

/// Shared, read-only collaborators of every room
#[derive(Clone)]
pub struct GameServices {
    pub config: Arc<GameConfig>,
    pub words: Arc<dyn WordSource>,
    pub powerups: Arc<PowerupRegistry>,
}

impl GameServices {
    pub fn new(config: GameConfig, words: Arc<dyn WordSource>) -> Self {
        let powerups = Arc::new(PowerupRegistry::from_config(&config));
        Self {
            config: Arc::new(config),
            words,
            powerups,
        }
    }
}

#[derive(Default)]
struct Effects(Vec<Effect>);

impl Effects {
    fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    fn send(&mut self, to: Vec<ConnectionId>, message: ServerMessage) {
        if !to.is_empty() {
            self.0.push(Effect::Send(Outbound { to, message }));
        }
    }

    fn send_one(&mut self, to: &str, message: ServerMessage) {
        self.send(vec![to.to_string()], message);
    }

    fn schedule(&mut self, timer: TimerKind, after: Duration) {
        self.0.push(Effect::Schedule { timer, after });
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

pub struct SessionOrchestrator {
    room: Room,
    session: Option<GameSession>,
    services: GameServices,
    scoring: ScoringEngine,
    generator: PuzzleGenerator,
    reconnects: ReconnectionManager,
    /// Next value the lobby countdown will announce
    countdown: u32,
    rng: StdRng,
    closed: bool,
}

impl SessionOrchestrator {
    /// Open a room with its creator seated
    pub fn create(
        code: String,
        category: &str,
        series_length: u8,
        connection: ConnectionId,
        player_name: &str,
        services: GameServices,
        rng: StdRng,
    ) -> Result<(Self, Vec<Effect>)> {
        let name = validate_player_name(player_name)?;
        let category = category.trim();
        if !services.words.has_category(category) {
            return Err(WordRushError::UnknownCategory(category.to_string()));
        }
        let series = SeriesState::new(series_length)?;

        let config = &services.config;
        let scoring = ScoringEngine::new(
            config.escalation_tiers.clone(),
            config.final_countdown_tiers.clone(),
            config.bonus_multiplier,
            config.final_countdown_seconds,
        );
        let generator = PuzzleGenerator::new(config.grid_size, config.generation_attempts);

        let mut room = Room::new(code, category.to_string(), series);
        let player_id = Uuid::new_v4().to_string();
        room.add_player(Player::new(player_id.clone(), connection.clone(), name))?;
        info!(
            "Room {} created ({}, best of {}) by player {}",
            room.code, room.category, series_length, player_id
        );

        let mut effects = Effects::default();
        effects.push(Effect::Bind {
            connection: connection.clone(),
        });
        effects.send_one(
            &connection,
            ServerMessage::RoomCreated {
                room_code: room.code.clone(),
                players: room.players_info(),
                category: room.category.clone(),
                player_id,
                series_length,
            },
        );

        let orchestrator = Self {
            room,
            session: None,
            services,
            scoring,
            generator,
            reconnects: ReconnectionManager::new(),
            countdown: 0,
            rng,
            closed: false,
        };
        Ok((orchestrator, effects.0))
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Apply one client event
    pub fn handle(&mut self, event: RoomEvent, now: Instant) -> Vec<Effect> {
        let mut effects = Effects::default();
        if self.closed {
            return effects.0;
        }

        match event {
            RoomEvent::Join {
                connection,
                player_name,
            } => self.on_join(connection, &player_name, &mut effects),
            RoomEvent::Ready { connection } => self.on_ready(&connection, &mut effects),
            RoomEvent::SubmitWord { connection, claim } => {
                self.on_submit(&connection, &claim, now, &mut effects)
            }
            RoomEvent::UsePowerup { connection, kind } => {
                self.on_powerup(&connection, &kind, now, &mut effects)
            }
            RoomEvent::PlayAgain { connection } => self.on_play_again(&connection, &mut effects),
            RoomEvent::Leave { connection } => self.on_leave(&connection, &mut effects),
            RoomEvent::Disconnect { connection } => {
                self.on_disconnect(&connection, now, &mut effects)
            }
            RoomEvent::Reconnect {
                connection,
                player_name,
            } => self.on_reconnect(connection, &player_name, now, &mut effects),
        }
        effects.0
    }

    /// Apply a timer firing. Firings that no longer fit the phase are dropped.
    pub fn on_timer(&mut self, timer: TimerKind) -> Vec<Effect> {
        let mut effects = Effects::default();
        if self.closed {
            return effects.0;
        }

        match timer {
            TimerKind::Countdown => self.countdown_tick(&mut effects),
            TimerKind::FinalCountdown => self.final_countdown_tick(&mut effects),
            TimerKind::DisconnectGrace(player_id) => self.grace_expired(&player_id, &mut effects),
        }
        effects.0
    }

    /// Everything `player_id` needs to rebuild their view of the room
    pub fn snapshot(&self, player_id: &str) -> GameSnapshot {
        let series = &self.room.series;
        let session = self.session.as_ref();
        GameSnapshot {
            version: self.room.version,
            phase: self.room.phase,
            room_code: self.room.code.clone(),
            category: self.room.category.clone(),
            series_length: series.length(),
            series_wins: series.wins().clone(),
            players: self.room.players_info(),
            player_id: player_id.to_string(),
            scores: self.room.scores(),
            grid: session.map(|s| s.grid().to_vec()),
            words: session.map(GameSession::word_statuses),
            powerups: session
                .and_then(|s| s.powerups.get(player_id))
                .map(|state| state.charges.clone()),
            multiplier: session.map(|s| s.multiplier),
            final_countdown: session
                .and_then(|s| s.final_countdown)
                .map(|countdown| countdown.remaining_seconds),
        }
    }

    fn player_id_for(&self, connection: &str) -> Option<PlayerId> {
        self.room
            .players
            .iter()
            .find(|p| p.connected && p.connection == connection)
            .map(|p| p.id.clone())
    }

    fn connections_except(&self, connection: &str) -> Vec<ConnectionId> {
        self.room
            .connections()
            .into_iter()
            .filter(|c| c != connection)
            .collect()
    }

    fn room_update(&self) -> ServerMessage {
        ServerMessage::RoomUpdate {
            players: self.room.players_info(),
        }
    }

    fn close(&mut self, effects: &mut Effects) {
        info!("Room {} is empty, closing", self.room.code);
        self.closed = true;
        effects.push(Effect::Close);
    }

    fn on_join(&mut self, connection: ConnectionId, player_name: &str, effects: &mut Effects) {
        let joined = validate_player_name(player_name).and_then(|name| {
            let player_id = Uuid::new_v4().to_string();
            self.room
                .add_player(Player::new(player_id.clone(), connection.clone(), name))?;
            Ok(player_id)
        });

        let player_id = match joined {
            Ok(player_id) => player_id,
            Err(e) => {
                warn!("Join to room {} rejected: {}", self.room.code, e);
                effects.send_one(&connection, ServerMessage::error(e.to_string()));
                return;
            }
        };

        info!("Player {} joined room {}", player_id, self.room.code);
        effects.push(Effect::Bind {
            connection: connection.clone(),
        });
        effects.send_one(
            &connection,
            ServerMessage::RoomJoined {
                room_code: self.room.code.clone(),
                players: self.room.players_info(),
                category: self.room.category.clone(),
                player_id,
                series_length: self.room.series.length(),
            },
        );
        effects.send(self.connections_except(&connection), self.room_update());
    }

    fn on_ready(&mut self, connection: &str, effects: &mut Effects) {
        if self.room.phase != Phase::Lobby {
            debug!("Ignoring ready in room {} during {:?}", self.room.code, self.room.phase);
            return;
        }
        let player = match self
            .room
            .players
            .iter_mut()
            .find(|p| p.connected && p.connection == connection)
        {
            Some(player) => player,
            None => return,
        };
        player.ready = !player.ready;
        self.room.touch();

        effects.send(self.room.connections(), self.room_update());
        if self.room.all_ready() {
            self.start_countdown(effects);
        }
    }

    fn start_countdown(&mut self, effects: &mut Effects) {
        info!("Room {}: all players ready, counting down", self.room.code);
        self.room.phase = Phase::Countdown;
        self.room.touch();
        self.countdown = self.services.config.countdown_seconds;
        effects.schedule(TimerKind::Countdown, self.services.config.tick_interval);
    }

    fn countdown_tick(&mut self, effects: &mut Effects) {
        if self.room.phase != Phase::Countdown {
            return;
        }
        effects.send(
            self.room.connections(),
            ServerMessage::Countdown {
                count: self.countdown,
            },
        );
        if self.countdown == 0 {
            self.start_game(effects);
        } else {
            self.countdown -= 1;
            effects.schedule(TimerKind::Countdown, self.services.config.tick_interval);
        }
    }

    fn build_session(&mut self) -> Result<GameSession> {
        let mut words = self
            .services
            .words
            .words(&self.room.category)
            .ok_or_else(|| WordRushError::UnknownCategory(self.room.category.clone()))?;
        words.shuffle(&mut self.rng);
        words.truncate(self.services.config.words_per_game);

        let puzzle = self.generator.generate(&words, &mut self.rng)?;
        let players: Vec<PlayerId> = self.room.players.iter().map(|p| p.id.clone()).collect();
        Ok(GameSession::new(
            puzzle,
            players.iter(),
            &self.services.powerups.kinds(),
        ))
    }

    fn start_game(&mut self, effects: &mut Effects) {
        let session = match self.build_session() {
            Ok(session) => session,
            Err(e) => {
                error!("Room {} could not start a game: {}", self.room.code, e);
                self.room.reset_to_lobby();
                effects.send(self.room.connections(), ServerMessage::error(e.to_string()));
                effects.send(self.room.connections(), self.room_update());
                return;
            }
        };

        for player in &mut self.room.players {
            player.score = 0;
        }
        self.room.phase = Phase::Playing;
        self.room.touch();
        info!(
            "Room {}: game started with {} words",
            self.room.code,
            session.words.len()
        );

        effects.send(
            self.room.connections(),
            ServerMessage::GameStart {
                grid: session.grid().to_vec(),
                words: session.initial_word_statuses(),
                scores: self.room.scores(),
            },
        );
        self.session = Some(session);
        self.maybe_start_final_countdown(effects);
    }

    /// Start the drain once a single word is left
    fn maybe_start_final_countdown(&mut self, effects: &mut Effects) {
        let seconds = self.services.config.final_countdown_seconds;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return,
        };
        if session.unfound_count() != 1 || session.final_countdown.is_some() {
            return;
        }

        debug!("Room {}: final countdown from {}s", self.room.code, seconds);
        session.final_countdown = Some(FinalCountdown {
            remaining_seconds: seconds,
        });
        effects.send(
            self.room.connections(),
            ServerMessage::FinalCountdown {
                seconds,
                points: self.scoring.final_points(seconds),
            },
        );
        if seconds > 0 {
            effects.schedule(TimerKind::FinalCountdown, self.services.config.tick_interval);
        }
    }

    fn final_countdown_tick(&mut self, effects: &mut Effects) {
        if self.room.phase != Phase::Playing {
            return;
        }
        let countdown = match self
            .session
            .as_mut()
            .and_then(|session| session.final_countdown.as_mut())
        {
            Some(countdown) if countdown.remaining_seconds > 0 => countdown,
            _ => return,
        };

        countdown.remaining_seconds -= 1;
        let seconds = countdown.remaining_seconds;
        effects.send(
            self.room.connections(),
            ServerMessage::FinalCountdown {
                seconds,
                points: self.scoring.final_points(seconds),
            },
        );
        if seconds > 0 {
            effects.schedule(TimerKind::FinalCountdown, self.services.config.tick_interval);
        }
    }

    fn on_submit(&mut self, connection: &str, claim: &WordClaim, now: Instant, effects: &mut Effects) {
        if self.room.phase != Phase::Playing {
            debug!("Ignoring word claim in room {} during {:?}", self.room.code, self.room.phase);
            return;
        }
        let player_id = match self.player_id_for(connection) {
            Some(id) => id,
            None => return,
        };
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return,
        };

        let found_before = session.found_count();
        let claimed = match validate_claim(session, &player_id, claim, now) {
            Ok(claimed) => claimed,
            Err(rejection) => {
                debug!("Room {}: claim by {} rejected: {}", self.room.code, player_id, rejection);
                effects.send_one(
                    connection,
                    ServerMessage::WordRejected {
                        message: rejection.to_string(),
                    },
                );
                return;
            }
        };

        let base = self.scoring.points_for(session, found_before);
        let (points, bonus_used) = match session.powerups.get_mut(&player_id) {
            Some(state) => self.scoring.apply_bonus(base, state),
            None => (base, false),
        };
        if let Some(player) = self.room.player_mut(&player_id) {
            player.score += points;
        }
        self.room.touch();
        info!(
            "Room {}: {} found {} for {} points",
            self.room.code, player_id, claimed.word, points
        );

        effects.send(
            self.room.connections(),
            ServerMessage::WordConfirmed {
                word: claimed.word,
                found_by: player_id.clone(),
                cells: claimed.cells,
                points,
                scores: self.room.scores(),
                words: session.word_statuses(),
            },
        );
        if bonus_used {
            effects.send_one(connection, ServerMessage::PowerupBonusUsed {});
        }

        if let Some(state) = session.powerups.get_mut(&player_id) {
            let config = &self.services.config;
            let earned = self.services.powerups.earn(
                state,
                config.words_per_powerup,
                config.max_powerup_charges,
                &mut self.rng,
            );
            if let Some(powerups) = earned {
                effects.send_one(connection, ServerMessage::PowerupEarned { powerups });
            }
        }

        let all_found = session.all_found();
        let multiplier = self.scoring.multiplier_for(session.found_count());
        session.multiplier = multiplier;
        if all_found {
            self.finish_game(None, None, effects);
            return;
        }

        effects.send(
            self.room.connections(),
            ServerMessage::MultiplierUpdate { multiplier },
        );
        self.maybe_start_final_countdown(effects);
    }

    fn on_powerup(&mut self, connection: &str, kind: &str, now: Instant, effects: &mut Effects) {
        if self.room.phase != Phase::Playing {
            debug!("Ignoring power-up in room {} during {:?}", self.room.code, self.room.phase);
            return;
        }
        let player_id = match self.player_id_for(connection) {
            Some(id) => id,
            None => return,
        };
        let opponent = self.room.opponent_of(&player_id).map(|p| p.id.clone());
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return,
        };

        let mut ctx = EffectContext {
            now,
            user: &player_id,
            opponent: opponent.as_deref(),
            session,
            players: &mut self.room.players,
            rng: &mut self.rng,
        };
        let outcome = match self.services.powerups.use_powerup(kind, &mut ctx) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                debug!("Room {}: {} power-up by {} rejected: {}", self.room.code, kind, player_id, rejection);
                effects.send_one(connection, ServerMessage::error(rejection.to_string()));
                return;
            }
        };
        let charges = ctx
            .session
            .powerups
            .get(&player_id)
            .map(|state| state.charges.clone())
            .unwrap_or_default();
        self.room.touch();

        let kind = outcome.kind();
        info!("Room {}: {} used {}", self.room.code, player_id, kind);
        let recipients = match self.services.powerups.target_of(kind) {
            Some(EffectTarget::Room) => self.room.connections(),
            Some(EffectTarget::Opponent) => opponent
                .as_deref()
                .and_then(|id| self.room.player(id))
                .filter(|p| p.connected)
                .map(|p| vec![p.connection.clone()])
                .unwrap_or_default(),
            Some(EffectTarget::User) | None => vec![connection.to_string()],
        };
        effects.send(recipients, outcome_message(outcome, self.room.scores()));
        effects.send_one(connection, ServerMessage::PowerupEarned { powerups: charges });
    }

    fn on_play_again(&mut self, connection: &str, effects: &mut Effects) {
        if self.room.phase != Phase::Results {
            debug!("Ignoring play again in room {} during {:?}", self.room.code, self.room.phase);
            return;
        }
        if self.player_id_for(connection).is_none() {
            return;
        }

        if self.room.series.is_over() {
            self.room.series.reset();
        }
        self.room.reset_to_lobby();
        self.session = None;
        info!("Room {} back in the lobby", self.room.code);

        effects.send(self.room.connections(), self.room_update());
        for player in self.room.players.iter().filter(|p| p.connected) {
            effects.send_one(
                &player.connection,
                ServerMessage::GameState(Box::new(self.snapshot(&player.id))),
            );
        }
    }

    fn on_leave(&mut self, connection: &str, effects: &mut Effects) {
        let player_id = match self.player_id_for(connection) {
            Some(id) => id,
            None => return,
        };
        info!("Player {} left room {}", player_id, self.room.code);
        effects.push(Effect::Unbind {
            connection: connection.to_string(),
        });

        if self.room.phase == Phase::Playing {
            if let Some(player) = self.room.player_mut(&player_id) {
                player.connected = false;
            }
            let winner = self.room.opponent_of(&player_id).map(|p| p.id.clone());
            self.finish_game(winner, Some(REASON_OPPONENT_LEFT), effects);
        } else {
            self.remove_player(&player_id, effects);
        }
    }

    fn on_disconnect(&mut self, connection: &str, now: Instant, effects: &mut Effects) {
        let player_id = match self.player_id_for(connection) {
            Some(id) => id,
            None => return,
        };
        effects.push(Effect::Unbind {
            connection: connection.to_string(),
        });

        if self.room.phase != Phase::Playing {
            info!("Player {} disconnected from room {}", player_id, self.room.code);
            self.remove_player(&player_id, effects);
            return;
        }

        if let Some(player) = self.room.player_mut(&player_id) {
            player.connected = false;
        }
        self.room.touch();
        let grace = self.services.config.disconnect_grace;
        self.reconnects.begin_grace(&player_id, now + grace);
        info!(
            "Player {} dropped from room {} mid-game, holding their seat for {:?}",
            player_id, self.room.code, grace
        );

        effects.send(
            self.room.connections(),
            ServerMessage::PlayerDisconnected {
                player_id: player_id.clone(),
            },
        );
        effects.schedule(TimerKind::DisconnectGrace(player_id), grace);
    }

    fn grace_expired(&mut self, player_id: &str, effects: &mut Effects) {
        if !self.reconnects.expire(player_id) {
            return;
        }
        info!("Player {} did not return to room {}", player_id, self.room.code);

        if self.room.phase == Phase::Playing {
            let winner = self.room.opponent_of(player_id).map(|p| p.id.clone());
            self.finish_game(winner, Some(REASON_OPPONENT_DISCONNECTED), effects);
        } else if self.room.player(player_id).map_or(false, |p| !p.connected) {
            self.remove_player(player_id, effects);
        }
    }

    fn on_reconnect(
        &mut self,
        connection: ConnectionId,
        player_name: &str,
        now: Instant,
        effects: &mut Effects,
    ) {
        // A socket speaks for at most one seat
        if let Some(seated) = self.player_id_for(&connection) {
            warn!(
                "Connection {} already holds seat {} in room {}, refusing reconnect",
                connection, seated, self.room.code
            );
            effects.send_one(
                &connection,
                ServerMessage::error("You are already in this room"),
            );
            return;
        }

        let player_id = match self.reconnects.resolve(&self.room, player_name.trim(), now) {
            Ok(id) => id,
            Err(e) => {
                warn!("Reconnect to room {} as '{}' failed: {}", self.room.code, player_name, e);
                effects.send_one(&connection, ServerMessage::error(e.to_string()));
                return;
            }
        };
        effects.push(Effect::Cancel(TimerKind::DisconnectGrace(player_id.clone())));

        let player = match self.room.player_mut(&player_id) {
            Some(player) => player,
            None => return,
        };
        let previous = std::mem::replace(&mut player.connection, connection.clone());
        player.connected = true;
        self.room.touch();
        info!("Player {} reconnected to room {}", player_id, self.room.code);

        if previous != connection {
            effects.push(Effect::Unbind {
                connection: previous,
            });
        }
        effects.push(Effect::Bind {
            connection: connection.clone(),
        });
        effects.send_one(
            &connection,
            ServerMessage::GameState(Box::new(self.snapshot(&player_id))),
        );
        effects.send(
            self.connections_except(&connection),
            ServerMessage::PlayerReconnected { player_id },
        );
    }

    /// Drop a player outside of play
    fn remove_player(&mut self, player_id: &str, effects: &mut Effects) {
        if self.room.remove_player(player_id).is_none() {
            return;
        }
        self.room.series.withdraw(player_id);
        self.reconnects.expire(player_id);

        if self.room.is_empty() {
            self.close(effects);
            return;
        }
        if self.room.phase == Phase::Countdown {
            effects.push(Effect::Cancel(TimerKind::Countdown));
            self.room.reset_to_lobby();
        }
        effects.send(self.room.connections(), self.room_update());
    }

    /// Sole top scorer, or `None` on a tie
    fn leader(&self) -> Option<PlayerId> {
        let top = self.room.players.iter().map(|p| p.score).max()?;
        let mut leaders = self.room.players.iter().filter(|p| p.score == top);
        let first = leaders.next()?;
        match leaders.next() {
            Some(_) => None,
            None => Some(first.id.clone()),
        }
    }

    /// End the game. `winner` overrides the score comparison for forfeits.
    fn finish_game(&mut self, winner: Option<PlayerId>, reason: Option<&str>, effects: &mut Effects) {
        let winner_id = winner.or_else(|| self.leader());
        self.room.series.record_game_result(winner_id.as_deref());
        self.room.phase = Phase::Results;
        self.room.touch();
        if let Some(session) = self.session.as_mut() {
            session.final_countdown = None;
        }

        effects.push(Effect::Cancel(TimerKind::FinalCountdown));
        for player_id in self.reconnects.clear() {
            effects.push(Effect::Cancel(TimerKind::DisconnectGrace(player_id)));
        }

        let winner = winner_id
            .as_deref()
            .and_then(|id| self.room.player(id))
            .map(|p| WinnerInfo {
                id: p.id.clone(),
                name: p.name.clone(),
            });
        let series = &self.room.series;
        info!(
            "Room {}: game over, winner {:?}, series {:?}",
            self.room.code,
            winner_id,
            series.wins()
        );
        effects.send(
            self.room.connections(),
            ServerMessage::GameEnd {
                winner,
                scores: self.room.scores(),
                series_wins: series.wins().clone(),
                series_length: series.length(),
                series_over: series.is_over(),
                series_winner: series.winner(),
                reason: reason.map(str::to_string),
            },
        );

        // Anyone still away will not get their seat back
        let departed: Vec<PlayerId> = self
            .room
            .players
            .iter()
            .filter(|p| !p.connected)
            .map(|p| p.id.clone())
            .collect();
        if departed.is_empty() {
            return;
        }
        for player_id in &departed {
            self.room.remove_player(player_id);
            self.room.series.withdraw(player_id);
        }
        if self.room.is_empty() {
            self.close(effects);
        } else {
            effects.send(self.room.connections(), self.room_update());
        }
    }
}

fn outcome_message(outcome: PowerupOutcome, scores: BTreeMap<PlayerId, u32>) -> ServerMessage {
    match outcome {
        PowerupOutcome::Freeze {
            frozen_player_id,
            duration,
        } => ServerMessage::PowerupFreeze {
            frozen_player_id,
            duration: millis(duration),
        },
        PowerupOutcome::Hint {
            cells,
            word,
            duration,
        } => ServerMessage::PowerupHint {
            cells,
            word,
            duration: millis(duration),
        },
        PowerupOutcome::Fog { patches, duration } => ServerMessage::PowerupFog {
            patches,
            duration: millis(duration),
        },
        PowerupOutcome::Scramble { duration } => ServerMessage::PowerupScramble {
            duration: millis(duration),
        },
        PowerupOutcome::Rotate { duration } => ServerMessage::PowerupRotate {
            duration: millis(duration),
        },
        PowerupOutcome::Bonus => ServerMessage::PowerupBonus {},
        PowerupOutcome::Steal { thief_id } => ServerMessage::PowerupSteal { scores, thief_id },
        PowerupOutcome::Drain { drainer_id } => ServerMessage::PowerupDrain { scores, drainer_id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryWordSource;
    use rand::SeedableRng;

    fn services() -> GameServices {
        let mut words = MemoryWordSource::new();
        words.insert(
            "Pets",
            ["CAT", "DOG", "FISH", "BIRD"].iter().map(|w| w.to_string()),
        );
        let config = GameConfig {
            grid_size: 6,
            words_per_game: 3,
            ..GameConfig::default()
        };
        GameServices::new(config, Arc::new(words))
    }

    fn create() -> SessionOrchestrator {
        let (orchestrator, _) = SessionOrchestrator::create(
            "ABCDEF".to_string(),
            "Pets",
            1,
            "c1".to_string(),
            "Ann",
            services(),
            StdRng::seed_from_u64(7),
        )
        .unwrap();
        orchestrator
    }

    fn sent(effects: &[Effect]) -> Vec<&'static str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(out) => Some(out.message.event_name()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_create_validates_input() {
        let bad_category = SessionOrchestrator::create(
            "ABCDEF".to_string(),
            "Music",
            1,
            "c1".to_string(),
            "Ann",
            services(),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(bad_category, Err(WordRushError::UnknownCategory(_))));

        let bad_series = SessionOrchestrator::create(
            "ABCDEF".to_string(),
            "Pets",
            4,
            "c1".to_string(),
            "Ann",
            services(),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(bad_series, Err(WordRushError::InvalidSeriesLength(4))));
    }

    #[test]
    fn test_create_binds_and_announces() {
        let (orchestrator, effects) = SessionOrchestrator::create(
            "ABCDEF".to_string(),
            "pets",
            3,
            "c1".to_string(),
            " Ann ",
            services(),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(
            effects[0],
            Effect::Bind {
                connection: "c1".to_string()
            }
        );
        assert_eq!(sent(&effects), vec!["room:created"]);
        assert_eq!(orchestrator.room().players[0].name, "Ann");
        assert_eq!(orchestrator.room().series.length(), 3);
    }

    #[test]
    fn test_join_notifies_the_other_player() {
        let mut orchestrator = create();
        let effects = orchestrator.handle(
            RoomEvent::Join {
                connection: "c2".to_string(),
                player_name: "Bob".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(sent(&effects), vec!["room:joined", "room:update"]);
        match &effects[2] {
            Effect::Send(out) => assert_eq!(out.to, vec!["c1".to_string()]),
            other => panic!("unexpected effect {:?}", other),
        }

        let effects = orchestrator.handle(
            RoomEvent::Join {
                connection: "c3".to_string(),
                player_name: "Cat".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(
            effects,
            vec![Effect::Send(Outbound {
                to: vec!["c3".to_string()],
                message: ServerMessage::error("Room is full"),
            })]
        );
    }

    #[test]
    fn test_claim_out_of_phase_is_ignored() {
        let mut orchestrator = create();
        let effects = orchestrator.handle(
            RoomEvent::SubmitWord {
                connection: "c1".to_string(),
                claim: WordClaim::new(0, 0, 0, 2),
            },
            Instant::now(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_ready_toggles() {
        let mut orchestrator = create();
        let ready = RoomEvent::Ready {
            connection: "c1".to_string(),
        };
        orchestrator.handle(ready.clone(), Instant::now());
        assert!(orchestrator.room().players[0].ready);
        orchestrator.handle(ready, Instant::now());
        assert!(!orchestrator.room().players[0].ready);
    }

    #[test]
    fn test_last_player_leaving_closes_room() {
        let mut orchestrator = create();
        let effects = orchestrator.handle(
            RoomEvent::Leave {
                connection: "c1".to_string(),
            },
            Instant::now(),
        );
        assert!(effects.contains(&Effect::Close));
        assert!(orchestrator.is_closed());
        assert!(orchestrator
            .handle(
                RoomEvent::Ready {
                    connection: "c1".to_string()
                },
                Instant::now()
            )
            .is_empty());
    }
}
