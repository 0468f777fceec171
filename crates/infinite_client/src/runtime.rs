//! Event loop that drives a [`GameSession`].
//!
//! A single task owns the session. It waits on user commands, transport
//! events and the session's next timer deadline, applies the resulting
//! effects, and publishes a fresh [`SessionSnapshot`] after every step.

use crate::error::{ClientError, ClientErrorKind};
use crate::session::{GameSession, SessionEffect};
use crate::snapshot::SessionSnapshot;
use crate::transport::{TransportEvent, TransportFactory, TransportHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Sleep used when no timer is pending; the branch is disabled anyway.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

/// Request from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Opt into networked play.
    Start,
    /// Play a cell (0-8).
    Move(usize),
    /// Ask for another round.
    Rematch,
    /// Leave the session and return to the menu.
    Quit,
    /// Quit and stop the runtime.
    Shutdown,
}

/// Cloneable handle for presentation layers.
#[derive(Debug, Clone)]
pub struct SessionClient {
    commands: mpsc::UnboundedSender<UserCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionClient {
    fn send(&self, command: UserCommand) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| {
            ClientError::new(ClientErrorKind::ChannelClosed, "Session runtime has stopped")
        })
    }

    /// Opts into networked play.
    pub fn start(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Start)
    }

    /// Plays a cell. Invalid moves are ignored by the session.
    pub fn attempt_move(&self, index: usize) -> Result<(), ClientError> {
        self.send(UserCommand::Move(index))
    }

    /// Asks for another round.
    pub fn request_rematch(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Rematch)
    }

    /// Leaves the session.
    pub fn quit(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Quit)
    }

    /// Stops the runtime.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.send(UserCommand::Shutdown)
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

/// Owns a session and its transport.
pub struct SessionRuntime {
    session: GameSession,
    factory: Arc<dyn TransportFactory>,
    transport: Option<TransportHandle>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionRuntime {
    /// Spawns the runtime task and returns its handle.
    pub fn spawn(
        session: GameSession,
        factory: Arc<dyn TransportFactory>,
    ) -> (SessionClient, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

        let runtime = Self {
            session,
            factory,
            transport: None,
            events: None,
            snapshots: snapshots_tx,
        };
        let task = tokio::spawn(runtime.run(commands_rx));

        let client = SessionClient {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (client, task)
    }

    #[instrument(skip_all)]
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<UserCommand>) {
        info!("Session runtime started");

        loop {
            let deadline = self.session.next_deadline();
            let wake = deadline.unwrap_or_else(|| Instant::now() + IDLE_SLEEP);

            let effects = tokio::select! {
                command = commands.recv() => match command {
                    Some(UserCommand::Shutdown) | None => {
                        let effects = self.session.quit();
                        self.apply(effects);
                        self.publish();
                        break;
                    }
                    Some(command) => self.on_command(command),
                },
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.session.handle_transport(event, Instant::now()),
                    None => {
                        debug!("Transport channel closed");
                        self.events = None;
                        Vec::new()
                    }
                },
                () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    self.session.on_timer(Instant::now())
                }
            };

            self.apply(effects);
            self.publish();
        }

        info!("Session runtime stopped");
    }

    fn on_command(&mut self, command: UserCommand) -> Vec<SessionEffect> {
        let now = Instant::now();
        match command {
            UserCommand::Start => self.session.start(now),
            UserCommand::Move(index) => self.session.attempt_move(index, now),
            UserCommand::Rematch => self.session.request_rematch(),
            UserCommand::Quit => self.session.quit(),
            UserCommand::Shutdown => Vec::new(),
        }
    }

    fn apply(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::OpenTransport => {
                    self.close_transport();
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.transport = Some(self.factory.open(tx));
                    self.events = Some(rx);
                }
                SessionEffect::CloseTransport => self.close_transport(),
                SessionEffect::Emit(event) => match &self.transport {
                    Some(transport) => {
                        if let Err(e) = transport.emit(event) {
                            warn!(error = %e, event = event.name(), "Emit failed");
                        }
                    }
                    None => debug!(event = event.name(), "No transport, dropping event"),
                },
            }
        }
    }

    fn close_transport(&mut self) {
        // Dropping the receiver discards anything the old transport still
        // had in flight.
        self.events = None;
        if let Some(transport) = self.transport.take() {
            transport.shutdown();
        }
    }

    fn publish(&self) {
        let next = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
