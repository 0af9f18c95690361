//! Room timers
//!
//! A timer is a spawned sleep that posts its kind and generation back to the
//! room queue. Re-arming or cancelling bumps the generation, so a firing that
//! was already queued when its timer got replaced is recognised as stale.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::room_actor::RoomCommand;
use crate::game::TimerKind;

#[derive(Default)]
pub struct TimerSet {
    next_generation: u64,
    live: HashMap<TimerKind, (u64, JoinHandle<()>)>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `timer`, replacing a live one of the same kind
    pub fn schedule(&mut self, timer: TimerKind, after: Duration, queue: mpsc::UnboundedSender<RoomCommand>) {
        self.cancel(&timer);
        self.next_generation += 1;
        let generation = self.next_generation;

        let kind = timer.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The room may be gone by now
            let _ = queue.send(RoomCommand::Timer {
                timer: kind,
                generation,
            });
        });
        self.live.insert(timer, (generation, handle));
    }

    pub fn cancel(&mut self, timer: &TimerKind) {
        if let Some((_, handle)) = self.live.remove(timer) {
            handle.abort();
        }
    }

    /// Claim a firing. True only for the current generation of a live timer.
    pub fn accept(&mut self, timer: &TimerKind, generation: u64) -> bool {
        match self.live.get(timer) {
            Some((current, _)) if *current == generation => {
                self.live.remove(timer);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.live.drain() {
            handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
