//! One task per room
//!
//! Every client event and timer firing for a room goes through the room's
//! queue, so the orchestrator sees them strictly one after another. Two
//! claims for the same word are decided by queue order and nothing else.

use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;

use crate::core::registry::{RoomHandle, RoomRegistry};
use crate::core::session::SessionManager;
use crate::core::timers::TimerSet;
use crate::game::{Effect, RoomEvent, SessionOrchestrator, TimerKind};

/// Work items on a room queue
#[derive(Debug)]
pub enum RoomCommand {
    Event(RoomEvent),
    Timer { timer: TimerKind, generation: u64 },
}

pub struct RoomActor {
    code: String,
    orchestrator: SessionOrchestrator,
    timers: TimerSet,
    queue: mpsc::UnboundedSender<RoomCommand>,
    inbox: mpsc::UnboundedReceiver<RoomCommand>,
    sessions: Arc<RwLock<SessionManager>>,
    registry: Arc<RwLock<RoomRegistry>>,
}

impl RoomActor {
    /// Queue and handle for a room that is about to start
    pub fn channel(code: &str) -> (RoomHandle, mpsc::UnboundedReceiver<RoomCommand>) {
        let (sender, inbox) = mpsc::unbounded_channel();
        let handle = RoomHandle {
            code: code.to_string(),
            sender,
        };
        (handle, inbox)
    }

    pub fn new(
        orchestrator: SessionOrchestrator,
        handle: &RoomHandle,
        inbox: mpsc::UnboundedReceiver<RoomCommand>,
        sessions: Arc<RwLock<SessionManager>>,
        registry: Arc<RwLock<RoomRegistry>>,
    ) -> Self {
        Self {
            code: handle.code.clone(),
            orchestrator,
            timers: TimerSet::new(),
            queue: handle.sender.clone(),
            inbox,
            sessions,
            registry,
        }
    }

    /// Run the room on its own task, starting with the effects of its creation
    pub fn spawn(self, initial: Vec<Effect>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(initial))
    }

    async fn run(mut self, initial: Vec<Effect>) {
        self.apply(initial).await;

        while !self.orchestrator.is_closed() {
            let command = match self.inbox.recv().await {
                Some(command) => command,
                None => break,
            };
            let effects = match command {
                RoomCommand::Event(event) => self.orchestrator.handle(event, Instant::now()),
                RoomCommand::Timer { timer, generation } => {
                    if !self.timers.accept(&timer, generation) {
                        debug!("Room {}: dropping stale {:?} timer", self.code, timer);
                        continue;
                    }
                    self.orchestrator.on_timer(timer)
                }
            };
            self.apply(effects).await;
        }

        self.timers.cancel_all();
        self.registry.write().await.remove(&self.code);
        info!("Room {} closed", self.code);
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(out) => {
                    let sessions = self.sessions.read().await;
                    let delivered = sessions.send_many(&out.to, &out.message);
                    debug!(
                        "Room {}: {} delivered to {}/{} connections",
                        self.code,
                        out.message.event_name(),
                        delivered,
                        out.to.len()
                    );
                }
                Effect::Schedule { timer, after } => {
                    self.timers.schedule(timer, after, self.queue.clone());
                }
                Effect::Cancel(timer) => self.timers.cancel(&timer),
                Effect::Bind { connection } => {
                    // Only a room that has accepted the connection binds it, so
                    // this is where it leaves the room it was in before
                    let previous = self.registry.write().await.bind(connection.clone(), &self.code);
                    if let Some(previous) = previous {
                        info!(
                            "Connection {} moved from room {} to {}",
                            connection, previous.code, self.code
                        );
                        previous.send(RoomCommand::Event(RoomEvent::Leave { connection }));
                    }
                }
                Effect::Unbind { connection } => {
                    self.registry.write().await.unbind(&connection, &self.code);
                }
                // Acted on once the batch is out, see `run`
                Effect::Close => {}
            }
        }
    }
}
