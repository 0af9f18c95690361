use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use wordrush::config::GameConfig;
use wordrush::core::message_types::ServerMessage;
use wordrush::core::room::Phase;
use wordrush::game::claim::WordClaim;
use wordrush::game::scoring::{EscalationTier, FinalTier};
use wordrush::game::{Effect, GameServices, PowerupKind, RoomEvent, SessionOrchestrator, TimerKind};
use wordrush::storage::MemoryWordSource;

struct Table {
    room: SessionOrchestrator,
    ann: String,
    bob: String,
    now: Instant,
}

impl Table {
    /// Two seated players, both ready, countdown run out
    fn playing(config: GameConfig, series_length: u8) -> Self {
        let mut words = MemoryWordSource::new();
        words.insert(
            "Pets",
            ["CAT", "DOG", "FISH", "BIRD", "HORSE", "MOUSE"]
                .iter()
                .map(|w| w.to_string()),
        );
        let services = GameServices::new(config, Arc::new(words));
        let (mut room, _) = SessionOrchestrator::create(
            "ROOM22".to_string(),
            "Pets",
            series_length,
            "c1".to_string(),
            "Ann",
            services,
            StdRng::seed_from_u64(42),
        )
        .unwrap();

        let now = Instant::now();
        room.handle(join("c2", "Bob"), now);
        room.handle(ready("c1"), now);
        room.handle(ready("c2"), now);
        assert_eq!(room.room().phase, Phase::Countdown);

        let mut ticks = 0;
        while room.room().phase == Phase::Countdown {
            room.on_timer(TimerKind::Countdown);
            ticks += 1;
            assert!(ticks < 10, "countdown never finished");
        }
        assert_eq!(room.room().phase, Phase::Playing);

        let ann = room.room().players[0].id.clone();
        let bob = room.room().players[1].id.clone();
        Self { room, ann, bob, now }
    }

    fn claim_of(&self, index: usize) -> WordClaim {
        let entry = &self.room.session().unwrap().words[index];
        let (start, end) = (entry.start(), entry.end());
        WordClaim::new(start.row as i64, start.col as i64, end.row as i64, end.col as i64)
    }

    fn submit(&mut self, connection: &str, index: usize) -> Vec<Effect> {
        let claim = self.claim_of(index);
        self.room.handle(
            RoomEvent::SubmitWord {
                connection: connection.to_string(),
                claim,
            },
            self.now,
        )
    }

    fn use_powerup(&mut self, connection: &str, kind: &str, at: Instant) -> Vec<Effect> {
        self.room.handle(
            RoomEvent::UsePowerup {
                connection: connection.to_string(),
                kind: kind.to_string(),
            },
            at,
        )
    }

    fn score(&self, player_id: &str) -> u32 {
        self.room.room().player(player_id).unwrap().score
    }
}

fn join(connection: &str, name: &str) -> RoomEvent {
    RoomEvent::Join {
        connection: connection.to_string(),
        player_name: name.to_string(),
    }
}

fn ready(connection: &str) -> RoomEvent {
    RoomEvent::Ready {
        connection: connection.to_string(),
    }
}

fn small_game() -> GameConfig {
    GameConfig {
        grid_size: 8,
        words_per_game: 2,
        ..GameConfig::default()
    }
}

/// Messages in `effects` with the given event name, with their recipients
fn sent<'a>(effects: &'a [Effect], event: &str) -> Vec<(&'a [String], &'a ServerMessage)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(out) if out.message.event_name() == event => {
                Some((out.to.as_slice(), &out.message))
            }
            _ => None,
        })
        .collect()
}

fn only<'a>(effects: &'a [Effect], event: &str) -> &'a ServerMessage {
    let found = sent(effects, event);
    assert_eq!(found.len(), 1, "expected one {} in {:?}", event, effects);
    found[0].1
}

#[test]
fn test_tie_in_best_of_three_has_no_winner() {
    let config = GameConfig {
        escalation_tiers: vec![EscalationTier {
            threshold: 0,
            multiplier: 5,
        }],
        final_countdown_tiers: vec![FinalTier {
            seconds: 0,
            points: 5,
        }],
        ..small_game()
    };
    let mut table = Table::playing(config, 3);

    table.submit("c1", 0);
    let effects = table.submit("c2", 1);

    assert!(effects.contains(&Effect::Cancel(TimerKind::FinalCountdown)));
    match only(&effects, "game:end") {
        ServerMessage::GameEnd {
            winner,
            scores,
            series_wins,
            series_over,
            series_winner,
            reason,
            ..
        } => {
            assert!(winner.is_none());
            assert_eq!(scores[&table.ann], 5);
            assert_eq!(scores[&table.bob], 5);
            assert_eq!(series_wins[&table.ann], 0);
            assert_eq!(series_wins[&table.bob], 0);
            assert!(!series_over);
            assert!(series_winner.is_none());
            assert!(reason.is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(table.room.room().phase, Phase::Results);
}

#[test]
fn test_losing_a_claim_race_is_rejected() {
    let mut table = Table::playing(small_game(), 1);

    let first = table.submit("c1", 0);
    assert_eq!(sent(&first, "word:confirmed").len(), 1);

    let claim = table.claim_of(0).reversed();
    let second = table.room.handle(
        RoomEvent::SubmitWord {
            connection: "c2".to_string(),
            claim,
        },
        table.now,
    );
    let rejected = sent(&second, "word:rejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, ["c2".to_string()]);
    assert_eq!(
        rejected[0].1,
        &ServerMessage::WordRejected {
            message: "That word was already found".to_string()
        }
    );
    assert_eq!(table.score(&table.ann), 1);
    assert_eq!(table.score(&table.bob), 0);
}

#[test]
fn test_nonsense_claim_changes_nothing() {
    let mut table = Table::playing(small_game(), 1);
    let version = table.room.room().version;

    let effects = table.room.handle(
        RoomEvent::SubmitWord {
            connection: "c1".to_string(),
            claim: WordClaim::new(0, 0, 40, 40),
        },
        table.now,
    );
    assert_eq!(
        only(&effects, "word:rejected"),
        &ServerMessage::WordRejected {
            message: "Not a valid word".to_string()
        }
    );
    assert_eq!(table.room.room().version, version);
    assert_eq!(table.room.session().unwrap().found_count(), 0);
}

#[test]
fn test_final_countdown_drains_to_one_point() {
    let config = GameConfig {
        final_countdown_seconds: 12,
        ..small_game()
    };
    let mut table = Table::playing(config, 1);

    let effects = table.submit("c1", 0);
    assert_eq!(
        only(&effects, "game:finalCountdown"),
        &ServerMessage::FinalCountdown {
            seconds: 12,
            points: 2
        }
    );
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Schedule {
            timer: TimerKind::FinalCountdown,
            ..
        }
    )));

    let mut last = Vec::new();
    for _ in 0..12 {
        last = table.room.on_timer(TimerKind::FinalCountdown);
    }
    assert_eq!(
        only(&last, "game:finalCountdown"),
        &ServerMessage::FinalCountdown {
            seconds: 0,
            points: 1
        }
    );
    assert!(!last.iter().any(|e| matches!(e, Effect::Schedule { .. })));
    assert!(table.room.on_timer(TimerKind::FinalCountdown).is_empty());

    let effects = table.submit("c2", 1);
    match only(&effects, "word:confirmed") {
        ServerMessage::WordConfirmed { points, .. } => assert_eq!(*points, 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_freeze_blocks_claims_and_respects_cooldown() {
    let config = GameConfig {
        words_per_game: 4,
        words_per_powerup: 1,
        powerups: vec![PowerupKind::Freeze],
        freeze_duration: Duration::from_secs(5),
        freeze_cooldown: Duration::from_secs(10),
        ..small_game()
    };
    let mut table = Table::playing(config, 1);
    let start = table.now;

    let effects = table.submit("c1", 0);
    let earned = sent(&effects, "powerup:earned");
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].0, ["c1".to_string()]);
    table.submit("c1", 1);

    let effects = table.use_powerup("c1", "freeze", start);
    let freeze = sent(&effects, "powerup:freeze");
    assert_eq!(freeze.len(), 1);
    assert_eq!(freeze[0].0, ["c2".to_string()]);
    assert_eq!(
        freeze[0].1,
        &ServerMessage::PowerupFreeze {
            frozen_player_id: table.bob.clone(),
            duration: 5_000
        }
    );

    // Bob cannot claim while frozen
    table.now = start + Duration::from_secs(1);
    let effects = table.submit("c2", 2);
    assert_eq!(
        only(&effects, "word:rejected"),
        &ServerMessage::WordRejected {
            message: "You are frozen!".to_string()
        }
    );

    let effects = table.use_powerup("c1", "freeze", start + Duration::from_secs(2));
    assert_eq!(
        only(&effects, "room:error"),
        &ServerMessage::error("Freeze on cooldown")
    );
    let charges = table.room.session().unwrap().powerups[&table.ann].charges_of(PowerupKind::Freeze);
    assert_eq!(charges, 1);

    // Thawed once the freeze runs out
    table.now = start + Duration::from_secs(6);
    let effects = table.submit("c2", 2);
    assert_eq!(sent(&effects, "word:confirmed").len(), 1);

    let effects = table.use_powerup("c1", "freeze", start + Duration::from_secs(11));
    assert_eq!(sent(&effects, "powerup:freeze").len(), 1);
}

#[test]
fn test_steal_needs_points_and_moves_one() {
    let config = GameConfig {
        words_per_game: 4,
        words_per_powerup: 1,
        powerups: vec![PowerupKind::Steal],
        ..small_game()
    };
    let mut table = Table::playing(config, 1);
    table.submit("c1", 0);

    let effects = table.use_powerup("c1", "steal", table.now);
    assert_eq!(only(&effects, "room:error"), &ServerMessage::error("Nothing to steal"));
    let state = &table.room.session().unwrap().powerups[&table.ann];
    assert_eq!(state.charges_of(PowerupKind::Steal), 1);

    table.submit("c2", 1);
    let effects = table.use_powerup("c1", "steal", table.now);
    let steal = sent(&effects, "powerup:steal");
    assert_eq!(steal.len(), 1);
    assert_eq!(steal[0].0.len(), 2);

    let mut expected = BTreeMap::new();
    expected.insert(table.ann.clone(), 2);
    expected.insert(table.bob.clone(), 0);
    assert_eq!(
        steal[0].1,
        &ServerMessage::PowerupSteal {
            scores: expected,
            thief_id: table.ann.clone()
        }
    );
}

#[test]
fn test_drain_only_lowers_the_opponent() {
    let config = GameConfig {
        words_per_game: 4,
        words_per_powerup: 1,
        powerups: vec![PowerupKind::Drain],
        ..small_game()
    };
    let mut table = Table::playing(config, 1);
    table.submit("c1", 0);
    table.submit("c2", 1);

    let effects = table.use_powerup("c1", "drain", table.now);
    assert_eq!(sent(&effects, "powerup:drain").len(), 1);
    assert_eq!(table.score(&table.ann), 1);
    assert_eq!(table.score(&table.bob), 0);

    // Disabled kinds are unknown
    let effects = table.use_powerup("c2", "steal", table.now);
    assert_eq!(only(&effects, "room:error"), &ServerMessage::error("Unknown powerup type"));
}

#[test]
fn test_reconnect_within_grace_keeps_everything() {
    let mut table = Table::playing(small_game(), 1);
    table.submit("c1", 0);

    let effects = table.room.handle(
        RoomEvent::Disconnect {
            connection: "c1".to_string(),
        },
        table.now,
    );
    let notice = sent(&effects, "player:disconnected");
    assert_eq!(notice[0].0, ["c2".to_string()]);
    assert!(effects.contains(&Effect::Schedule {
        timer: TimerKind::DisconnectGrace(table.ann.clone()),
        after: Duration::from_secs(30),
    }));
    assert_eq!(table.room.room().phase, Phase::Playing);

    let effects = table.room.handle(
        RoomEvent::Reconnect {
            connection: "c1-again".to_string(),
            player_name: "Ann".to_string(),
        },
        table.now + Duration::from_secs(10),
    );
    assert!(effects.contains(&Effect::Cancel(TimerKind::DisconnectGrace(table.ann.clone()))));
    assert!(effects.contains(&Effect::Bind {
        connection: "c1-again".to_string()
    }));
    match only(&effects, "game:state") {
        ServerMessage::GameState(snapshot) => {
            assert_eq!(snapshot.player_id, table.ann);
            assert_eq!(snapshot.scores[&table.ann], 1);
            let words = snapshot.words.as_ref().unwrap();
            assert_eq!(words.iter().filter(|w| w.found).count(), 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sent(&effects, "player:reconnected")[0].0, ["c2".to_string()]);

    let ann = table.room.room().player(&table.ann).unwrap();
    assert!(ann.connected);
    assert_eq!(ann.connection, "c1-again");

    // The grace timer may still be in flight; it must not forfeit anyone
    let effects = table.room.on_timer(TimerKind::DisconnectGrace(table.ann.clone()));
    assert!(effects.is_empty());
    assert_eq!(table.room.room().phase, Phase::Playing);
}

#[test]
fn test_grace_expiry_forfeits_and_blocks_reconnect() {
    let mut table = Table::playing(small_game(), 3);
    table.room.handle(
        RoomEvent::Disconnect {
            connection: "c1".to_string(),
        },
        table.now,
    );

    let effects = table.room.on_timer(TimerKind::DisconnectGrace(table.ann.clone()));
    match only(&effects, "game:end") {
        ServerMessage::GameEnd {
            winner,
            series_wins,
            reason,
            ..
        } => {
            assert_eq!(winner.as_ref().map(|w| w.id.as_str()), Some(table.bob.as_str()));
            assert_eq!(series_wins[&table.bob], 1);
            assert_eq!(reason.as_deref(), Some("opponent_disconnected"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(table.room.room().player(&table.ann).is_none());
    assert!(!table.room.is_closed());

    let effects = table.room.handle(
        RoomEvent::Reconnect {
            connection: "c1-again".to_string(),
            player_name: "Ann".to_string(),
        },
        table.now + Duration::from_secs(31),
    );
    assert_eq!(
        effects,
        vec![Effect::Send(wordrush::game::Outbound {
            to: vec!["c1-again".to_string()],
            message: ServerMessage::error("Player not found in room"),
        })]
    );
}

#[test]
fn test_seated_socket_cannot_take_over_dropped_seat() {
    let mut table = Table::playing(small_game(), 1);
    table.room.handle(
        RoomEvent::Disconnect {
            connection: "c1".to_string(),
        },
        table.now,
    );

    // Bob, still on c2, claims to be Ann
    let effects = table.room.handle(
        RoomEvent::Reconnect {
            connection: "c2".to_string(),
            player_name: "Ann".to_string(),
        },
        table.now + Duration::from_secs(1),
    );
    assert_eq!(
        effects,
        vec![Effect::Send(wordrush::game::Outbound {
            to: vec!["c2".to_string()],
            message: ServerMessage::error("You are already in this room"),
        })]
    );
    let ann = table.room.room().player(&table.ann).unwrap();
    assert!(!ann.connected);
    assert_eq!(ann.connection, "c1");

    // Bob's claims stay his
    table.submit("c2", 0);
    assert_eq!(table.score(&table.ann), 0);
    assert!(table.score(&table.bob) > 0);

    // Ann's window is untouched, so the forfeit still lands
    let effects = table.room.on_timer(TimerKind::DisconnectGrace(table.ann.clone()));
    match only(&effects, "game:end") {
        ServerMessage::GameEnd { winner, .. } => {
            assert_eq!(winner.as_ref().map(|w| w.id.as_str()), Some(table.bob.as_str()));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_reconnect_after_deadline_is_refused() {
    let mut table = Table::playing(small_game(), 1);
    table.room.handle(
        RoomEvent::Disconnect {
            connection: "c1".to_string(),
        },
        table.now,
    );

    // Deadline passed, grace timer not yet delivered
    let effects = table.room.handle(
        RoomEvent::Reconnect {
            connection: "c1-late".to_string(),
            player_name: "Ann".to_string(),
        },
        table.now + Duration::from_secs(31),
    );
    assert_eq!(
        only(&effects, "room:error"),
        &ServerMessage::error("Reconnect window has closed")
    );
    assert!(!effects.contains(&Effect::Cancel(TimerKind::DisconnectGrace(table.ann.clone()))));

    let effects = table.room.on_timer(TimerKind::DisconnectGrace(table.ann.clone()));
    assert_eq!(sent(&effects, "game:end").len(), 1);
}

#[test]
fn test_leaving_mid_game_forfeits() {
    let mut table = Table::playing(small_game(), 1);
    let effects = table.room.handle(
        RoomEvent::Leave {
            connection: "c2".to_string(),
        },
        table.now,
    );
    assert!(effects.contains(&Effect::Unbind {
        connection: "c2".to_string()
    }));
    match only(&effects, "game:end") {
        ServerMessage::GameEnd { winner, reason, .. } => {
            assert_eq!(winner.as_ref().map(|w| w.name.as_str()), Some("Ann"));
            assert_eq!(reason.as_deref(), Some("opponent_left"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(table.room.room().players.len(), 1);
}

#[test]
fn test_play_again_after_series_resets_to_lobby() {
    let mut table = Table::playing(small_game(), 1);
    table.submit("c1", 0);
    let effects = table.submit("c1", 1);
    match only(&effects, "game:end") {
        ServerMessage::GameEnd {
            series_over,
            series_winner,
            ..
        } => {
            assert!(series_over);
            assert_eq!(series_winner.as_deref(), Some(table.ann.as_str()));
        }
        other => panic!("unexpected {:?}", other),
    }

    let effects = table.room.handle(
        RoomEvent::PlayAgain {
            connection: "c2".to_string(),
        },
        table.now,
    );
    assert_eq!(sent(&effects, "game:state").len(), 2);
    let room = table.room.room();
    assert_eq!(room.phase, Phase::Lobby);
    assert_eq!(room.series.wins_of(&table.ann), 0);
    assert!(room.players.iter().all(|p| !p.ready && p.score == 0));
    assert!(table.room.session().is_none());
}

#[test]
fn test_leaving_during_countdown_returns_to_lobby() {
    let mut words = MemoryWordSource::new();
    words.insert("Pets", ["CAT", "DOG"].iter().map(|w| w.to_string()));
    let services = GameServices::new(small_game(), Arc::new(words));
    let (mut room, _) = SessionOrchestrator::create(
        "ROOM33".to_string(),
        "Pets",
        1,
        "c1".to_string(),
        "Ann",
        services,
        StdRng::seed_from_u64(1),
    )
    .unwrap();
    let now = Instant::now();
    room.handle(join("c2", "Bob"), now);
    room.handle(ready("c1"), now);
    room.handle(ready("c2"), now);

    let effects = room.handle(
        RoomEvent::Leave {
            connection: "c2".to_string(),
        },
        now,
    );
    assert!(effects.contains(&Effect::Cancel(TimerKind::Countdown)));
    assert_eq!(room.room().phase, Phase::Lobby);
    assert!(room.on_timer(TimerKind::Countdown).is_empty());
}

#[test]
fn test_unbuildable_puzzle_aborts_the_start() {
    let mut words = MemoryWordSource::new();
    words.insert("Long", ["ELEPHANT", "CROCODILE"].iter().map(|w| w.to_string()));
    let config = GameConfig {
        grid_size: 4,
        fog_size: 2,
        generation_attempts: 3,
        ..GameConfig::default()
    };
    let services = GameServices::new(config, Arc::new(words));
    let (mut room, _) = SessionOrchestrator::create(
        "ROOM44".to_string(),
        "Long",
        1,
        "c1".to_string(),
        "Ann",
        services,
        StdRng::seed_from_u64(5),
    )
    .unwrap();
    let now = Instant::now();
    room.handle(join("c2", "Bob"), now);
    room.handle(ready("c1"), now);
    room.handle(ready("c2"), now);

    let mut last = Vec::new();
    for _ in 0..4 {
        last = room.on_timer(TimerKind::Countdown);
    }
    assert_eq!(sent(&last, "room:error").len(), 1);
    assert!(sent(&last, "game:start").is_empty());
    assert_eq!(room.room().phase, Phase::Lobby);
    assert!(room.session().is_none());
}

#[test]
fn test_every_placed_word_is_claimable_both_ways() {
    use wordrush::game::claim::validate_claim;
    use wordrush::game::puzzle::PuzzleGenerator;
    use wordrush::game::session::GameSession;
    use wordrush::storage::WordSource;

    let source = MemoryWordSource::builtin();
    let generator = PuzzleGenerator::new(12, 50);
    let players = ["p1".to_string(), "p2".to_string()];
    let now = Instant::now();

    for category in source.categories() {
        let words: Vec<String> = source.words(&category).unwrap().into_iter().take(12).collect();
        for seed in 0..8 {
            let puzzle = generator
                .generate(&words, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(puzzle.placements.len(), words.len());

            for placement in &puzzle.placements {
                let spelled: String = placement
                    .cells
                    .iter()
                    .map(|cell| puzzle.grid[cell.row][cell.col])
                    .collect();
                assert_eq!(spelled, placement.word);

                let first = placement.cells[0];
                let last = placement.cells[placement.cells.len() - 1];
                let forward = WordClaim::new(
                    first.row as i64,
                    first.col as i64,
                    last.row as i64,
                    last.col as i64,
                );
                for claim in [forward, forward.reversed()] {
                    let mut session = GameSession::new(puzzle.clone(), players.iter(), &[]);
                    let claimed = validate_claim(&mut session, "p1", &claim, now).unwrap();
                    assert_eq!(claimed.cells, placement.cells);
                    assert_eq!(claimed.word, placement.word);
                }
            }
        }
    }
}
