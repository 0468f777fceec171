//! Game session: the composition root of the client engine.
//!
//! [`GameSession`] wires connection signals into [`GameState`] and the
//! liveness policy. It is sans-io: every operation takes the current
//! instant and returns the [`SessionEffect`]s the runtime must carry out.
//! The runtime sleeps until [`GameSession::next_deadline`] and then calls
//! [`GameSession::on_timer`].

use crate::config::{ClientConfig, LivenessConfig};
use crate::controller::{ConnectionState, ConnectionTransition, SessionController};
use crate::liveness::{Countdowns, LivenessPolicy, policy_from_config};
use crate::snapshot::{SessionSnapshot, ViewPhase};
use crate::timer::{IntervalTimer, OneShotTimer};
use crate::transport::TransportEvent;
use infinite_tictactoe::{Board, ClientEvent, GameState, ServerEvent, WINDOW};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Shown when the server drops us mid-round.
pub const CONNECTION_LOST: &str =
    "The other player has disconnected or the connection was lost.";

/// Side effect requested by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Open a transport to the server.
    OpenTransport,
    /// Tear the transport down.
    CloseTransport,
    /// Send an event over the open transport.
    Emit(ClientEvent),
}

/// One networked play session, from menu to menu.
#[derive(Debug)]
pub struct GameSession {
    liveness_config: LivenessConfig,
    controller: SessionController,
    game: Option<GameState>,
    liveness: Option<Box<dyn LivenessPolicy>>,
    poll: IntervalTimer,
    grace: OneShotTimer,
    disconnect_notice: bool,
    notice: Option<String>,
}

impl GameSession {
    /// Creates an idle session.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_parts(config.connect_deadline(), config.liveness().clone())
    }

    /// Creates an idle session from its individual settings.
    pub fn with_parts(connect_deadline: Duration, liveness_config: LivenessConfig) -> Self {
        Self {
            poll: IntervalTimer::new(liveness_config.poll_interval()),
            liveness_config,
            controller: SessionController::new(connect_deadline),
            game: None,
            liveness: None,
            grace: OneShotTimer::new(),
            disconnect_notice: false,
            notice: None,
        }
    }

    /// Current connection state.
    pub fn connection(&self) -> ConnectionState {
        *self.controller.state()
    }

    /// The running round, if any.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Opts into networked play.
    #[instrument(skip(self, now))]
    pub fn start(&mut self, now: Instant) -> Vec<SessionEffect> {
        let transition = self.controller.request_connect(now);
        if transition == ConnectionTransition::Open {
            self.notice = None;
        }
        Self::effects_for(transition)
    }

    /// Feeds a transport signal into the session.
    #[instrument(skip(self, now))]
    pub fn handle_transport(&mut self, event: TransportEvent, now: Instant) -> Vec<SessionEffect> {
        match event {
            TransportEvent::Connected => Self::effects_for(self.controller.on_connected()),
            TransportEvent::ConnectError { message } => {
                Self::effects_for(self.controller.on_connect_error(&message))
            }
            TransportEvent::Disconnected { reason } => {
                self.on_disconnected(&reason, now);
                Vec::new()
            }
            TransportEvent::Message(event) => self.handle_server_event(event, now),
        }
    }

    fn on_disconnected(&mut self, reason: &str, now: Instant) {
        if self.connection() != ConnectionState::Connected {
            debug!(reason, "Disconnect outside a live connection, ignoring");
            return;
        }

        warn!(reason, "Transport disconnected");
        self.notice = Some(CONNECTION_LOST.to_string());
        let stalled_now = match self.liveness.as_mut() {
            Some(policy) => policy.force_stall(),
            None => false,
        };
        if stalled_now {
            self.begin_termination(now);
        }
    }

    #[instrument(skip(self, now))]
    fn handle_server_event(&mut self, event: ServerEvent, now: Instant) -> Vec<SessionEffect> {
        if self.connection() != ConnectionState::Connected {
            debug!("Server event outside a live connection, ignoring");
            return Vec::new();
        }
        let progress = event.is_game_progress();

        match event {
            ServerEvent::RoomJoined { players } => {
                self.controller.on_room_joined(players);
            }
            ServerEvent::GameStart => {
                if self.game.is_some() {
                    debug!("Round already running");
                } else if let Some(assignment) = self.controller.on_game_start() {
                    self.game = Some(GameState::new(assignment));
                    self.arm_liveness(now);
                }
            }
            ServerEvent::Turn { state, turn } => match (self.game.as_mut(), state.into_history()) {
                (Some(game), Ok(history)) => game.apply_turn(history, turn),
                (None, _) => debug!("Turn before game start, ignoring"),
                (_, Err(e)) => warn!(error = %e, "Skipping turn with bad snapshot"),
            },
            ServerEvent::Rematch { state } => match (self.game.as_mut(), state.into_history()) {
                (Some(game), Ok(history)) => {
                    game.apply_rematch(history);
                    let assignment = game.assignment();
                    self.controller.reassign(assignment);
                    self.arm_liveness(now);
                }
                (None, _) => debug!("Rematch before game start, ignoring"),
                (_, Err(e)) => warn!(error = %e, "Skipping rematch with bad snapshot"),
            },
            ServerEvent::GameEnd { state, winner } => {
                match (self.game.as_mut(), state.into_history()) {
                    (Some(game), Ok(history)) => {
                        game.apply_game_end(history, winner);
                        self.poll.stop();
                    }
                    (None, _) => debug!("game_end before game start, ignoring"),
                    (_, Err(e)) => warn!(error = %e, "Skipping game_end with bad snapshot"),
                }
            }
            ServerEvent::Pong => {
                if let Some(policy) = self.liveness.as_mut() {
                    policy.on_pong(now);
                }
            }
        }

        if progress && let Some(policy) = self.liveness.as_mut() {
            policy.on_activity_observed(now);
        }
        Vec::new()
    }

    /// Plays a local move. Invalid moves are silently dropped.
    #[instrument(skip(self, now))]
    pub fn attempt_move(&mut self, index: usize, now: Instant) -> Vec<SessionEffect> {
        if self.is_terminating() {
            debug!("Round is terminating, move ignored");
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            debug!("No round, move ignored");
            return Vec::new();
        };

        match game.local_move(index) {
            Ok(played) => {
                if let Some(policy) = self.liveness.as_mut() {
                    policy.on_activity_observed(now);
                }
                vec![SessionEffect::Emit(ClientEvent::Turn {
                    coord: played.index,
                    turn: played.player,
                })]
            }
            Err(reason) => {
                debug!(%reason, "Move ignored");
                Vec::new()
            }
        }
    }

    /// Asks for another round once the current one is over.
    #[instrument(skip(self))]
    pub fn request_rematch(&mut self) -> Vec<SessionEffect> {
        let concluded = self.game.as_ref().is_some_and(|g| g.winner().is_some());
        if !concluded || self.is_terminating() {
            debug!("Rematch only after a concluded round, ignoring");
            return Vec::new();
        }
        info!("Requesting rematch");
        vec![SessionEffect::Emit(ClientEvent::Rematch)]
    }

    /// Leaves the session and returns to the menu.
    #[instrument(skip(self))]
    pub fn quit(&mut self) -> Vec<SessionEffect> {
        let transition = self.controller.quit();
        self.game = None;
        self.liveness = None;
        self.poll.stop();
        self.grace.cancel();
        self.disconnect_notice = false;
        self.notice = None;
        Self::effects_for(transition)
    }

    /// Runs every timer that is due at `now`.
    pub fn on_timer(&mut self, now: Instant) -> Vec<SessionEffect> {
        let mut effects = Self::effects_for(self.controller.on_deadline(now));

        if self.poll.tick_if_due(now) {
            let local_turn = self.game.as_ref().is_some_and(GameState::is_local_turn);
            if let Some(policy) = self.liveness.as_mut() {
                let tick = policy.tick(now, local_turn);
                if tick.ping {
                    effects.push(SessionEffect::Emit(ClientEvent::Ping));
                }
                if tick.stalled {
                    self.begin_termination(now);
                }
            }
        }

        if self.grace.fire_if_due(now) {
            info!("Grace period over, returning to menu");
            let notice = self.notice.take();
            effects.extend(self.quit());
            self.notice = notice;
        }

        effects
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.controller.next_deadline(),
            self.poll.deadline(),
            self.grace.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// View of the session for presentation.
    pub fn snapshot(&self) -> SessionSnapshot {
        let phase = match (self.connection(), &self.game) {
            (ConnectionState::Connected, Some(_)) => ViewPhase::Playing,
            (ConnectionState::Connecting | ConnectionState::Connected, _) => {
                ViewPhase::WaitingForOpponent
            }
            _ => ViewPhase::Menu,
        };

        SessionSnapshot {
            phase,
            connection: self.connection(),
            board: self.game.as_ref().map(GameState::board).unwrap_or_else(Board::empty),
            fading: self.game.as_ref().and_then(fading_mark),
            turn: self.game.as_ref().map(GameState::turn),
            winner: self.game.as_ref().and_then(GameState::winner),
            assignment: *self.controller.assignment(),
            countdowns: self
                .liveness
                .as_ref()
                .map(|p| p.countdowns())
                .unwrap_or(Countdowns::CLEAR),
            disconnect_notice: self.disconnect_notice,
            notice: self.notice.clone(),
            error: self.controller.error().clone(),
        }
    }

    fn arm_liveness(&mut self, now: Instant) {
        let policy = policy_from_config(&self.liveness_config, now);
        self.poll = IntervalTimer::new(policy.poll_interval());
        self.poll.start(now);
        self.liveness = Some(policy);
    }

    fn is_terminating(&self) -> bool {
        self.grace.is_armed() || self.disconnect_notice
    }

    fn begin_termination(&mut self, now: Instant) {
        if self.grace.is_armed() {
            return;
        }
        info!(
            grace_ms = self.liveness_config.termination_grace().as_millis() as u64,
            "Round stalled, showing disconnect notice"
        );
        self.poll.stop();
        self.disconnect_notice = true;
        self.notice.get_or_insert_with(|| CONNECTION_LOST.to_string());
        self.grace.arm(now, self.liveness_config.termination_grace());
    }

    fn effects_for(transition: ConnectionTransition) -> Vec<SessionEffect> {
        match transition {
            ConnectionTransition::Stay => Vec::new(),
            ConnectionTransition::Open => vec![SessionEffect::OpenTransport],
            ConnectionTransition::TearDown => vec![SessionEffect::CloseTransport],
        }
    }
}

/// The turn holder's oldest mark, once their next move would remove it.
fn fading_mark(game: &GameState) -> Option<usize> {
    let full = game.history().window(game.turn()).len() == WINDOW;
    game.fading_cell().filter(|_| full)
}
