//! Connection lifecycle state machine.
//!
//! The controller owns the connect deadline and the room/match gate. It does
//! no I/O: each operation returns a [`ConnectionTransition`] telling the
//! session whether the transport must be opened or torn down.

use crate::timer::OneShotTimer;
use derive_getters::Getters;
use infinite_tictactoe::Player;
use serde::Serialize;
use std::time::Duration;
use strum::Display;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Stored when the connect deadline fires.
pub const DEADLINE_MESSAGE: &str = "The server did not respond in time. Please try again.";

/// Transport connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected,
    /// Transport opening, deadline armed.
    Connecting,
    /// Namespace connected.
    Connected,
    /// All connection attempts failed.
    Errored,
    /// The connect deadline fired first.
    TimedOut,
}

/// What the session must do with the transport after a controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTransition {
    /// Nothing.
    Stay,
    /// Open a new transport.
    Open,
    /// Tear the transport down.
    TearDown,
}

/// Category of a failed connection, picked by message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectFailure {
    /// DNS failure or HTTP 404.
    NotFound,
    /// The transport gave up waiting.
    Timeout,
    /// Anything else.
    Generic,
}

impl ConnectFailure {
    const NOT_FOUND_PATTERNS: &'static [&'static str] = &[
        "404",
        "not found",
        "enotfound",
        "dns",
        "failed to lookup address",
    ];
    const TIMEOUT_PATTERNS: &'static [&'static str] = &["timeout", "timed out"];

    /// Classifies a transport error message, ignoring case.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if Self::NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::NotFound
        } else if Self::TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::Timeout
        } else {
            Self::Generic
        }
    }

    /// User-facing text for this failure.
    pub fn user_message(self, raw: &str) -> String {
        match self {
            Self::NotFound => "Server not found. Check the server address and try again.".to_string(),
            Self::Timeout => {
                "Connection timed out. The server may be busy, please try again.".to_string()
            }
            Self::Generic => format!("Could not connect to the server: {}", raw),
        }
    }
}

/// Drives [`ConnectionState`] and gates round creation.
#[derive(Debug, Getters)]
pub struct SessionController {
    /// Current connection state.
    state: ConnectionState,
    /// Local seat from `room_joined`.
    assignment: Option<Player>,
    /// User-facing error for `Errored` and `TimedOut`.
    error: Option<String>,
    #[getter(skip)]
    deadline: OneShotTimer,
    #[getter(skip)]
    connect_deadline: Duration,
}

impl SessionController {
    /// Creates a disconnected controller.
    pub fn new(connect_deadline: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            assignment: None,
            error: None,
            deadline: OneShotTimer::new(),
            connect_deadline,
        }
    }

    /// Starts networked play. Ignored while a session is already live.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn request_connect(&mut self, now: Instant) -> ConnectionTransition {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!("Connect requested while a session is live, ignoring");
            return ConnectionTransition::Stay;
        }

        info!("Connecting");
        self.state = ConnectionState::Connecting;
        self.assignment = None;
        self.error = None;
        self.deadline.arm(now, self.connect_deadline);
        ConnectionTransition::Open
    }

    /// The transport joined the namespace.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn on_connected(&mut self) -> ConnectionTransition {
        if self.state != ConnectionState::Connecting {
            debug!("Late connected signal, ignoring");
            return ConnectionTransition::Stay;
        }

        self.deadline.cancel();
        self.state = ConnectionState::Connected;
        info!("Connected");
        ConnectionTransition::Stay
    }

    /// The transport gave up connecting.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn on_connect_error(&mut self, message: &str) -> ConnectionTransition {
        match self.state {
            ConnectionState::Connecting => {
                self.deadline.cancel();
                let failure = ConnectFailure::classify(message);
                warn!(%failure, message, "Connection failed");
                self.error = Some(failure.user_message(message));
                self.state = ConnectionState::Errored;
                ConnectionTransition::TearDown
            }
            ConnectionState::Connected => {
                warn!(message, "Connect error after connecting, ignoring");
                ConnectionTransition::Stay
            }
            _ => {
                debug!(message, "Stray connect error");
                ConnectionTransition::Stay
            }
        }
    }

    /// Checks the connect deadline.
    pub fn on_deadline(&mut self, now: Instant) -> ConnectionTransition {
        if !self.deadline.fire_if_due(now) || self.state != ConnectionState::Connecting {
            return ConnectionTransition::Stay;
        }

        warn!("Connect deadline exceeded");
        self.state = ConnectionState::TimedOut;
        self.error = Some(DEADLINE_MESSAGE.to_string());
        ConnectionTransition::TearDown
    }

    /// Records the local seat from a 1-indexed player slot.
    #[instrument(skip(self))]
    pub fn on_room_joined(&mut self, slot: u8) -> Option<Player> {
        if self.state != ConnectionState::Connected {
            debug!("room_joined outside a connection, ignoring");
            return None;
        }

        match Player::from_slot(slot) {
            Some(player) => {
                info!(%player, "Joined room");
                self.assignment = Some(player);
                Some(player)
            }
            None => {
                warn!(slot, "Invalid player slot");
                None
            }
        }
    }

    /// Returns the seat a new round should be created with, if the match
    /// can start.
    #[instrument(skip(self))]
    pub fn on_game_start(&self) -> Option<Player> {
        if self.state != ConnectionState::Connected {
            debug!(state = %self.state, "game_start outside a connection, ignoring");
            return None;
        }
        if self.assignment.is_none() {
            warn!("game_start before room_joined, ignoring");
        }
        self.assignment
    }

    /// Adopts a new seat after a rematch swapped sides.
    pub fn reassign(&mut self, player: Player) {
        self.assignment = Some(player);
    }

    /// Ends the session from any state.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn quit(&mut self) -> ConnectionTransition {
        let was = std::mem::take(&mut self.state);
        self.deadline.cancel();
        self.assignment = None;
        self.error = None;

        match was {
            ConnectionState::Connecting | ConnectionState::Connected => {
                info!("Session quit");
                ConnectionTransition::TearDown
            }
            _ => ConnectionTransition::Stay,
        }
    }

    /// Pending connect deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline.deadline()
    }
}
