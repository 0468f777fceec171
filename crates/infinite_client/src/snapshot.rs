//! Read-only view of a session for presentation layers.

use crate::controller::ConnectionState;
use crate::liveness::Countdowns;
use derive_getters::Getters;
use infinite_tictactoe::{Board, Player};
use serde::Serialize;
use strum::Display;

/// Coarse screen a front end should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize)]
pub enum ViewPhase {
    /// No session; offer to play.
    #[default]
    Menu,
    /// Connecting or waiting for a second player.
    WaitingForOpponent,
    /// A round exists (running or concluded).
    Playing,
}

/// Everything a presentation layer needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Getters)]
pub struct SessionSnapshot {
    pub(crate) phase: ViewPhase,
    pub(crate) connection: ConnectionState,
    pub(crate) board: Board,
    /// Mark removed by the turn holder's next move. Only set once their
    /// window is full.
    pub(crate) fading: Option<usize>,
    pub(crate) turn: Option<Player>,
    pub(crate) winner: Option<Player>,
    pub(crate) assignment: Option<Player>,
    pub(crate) countdowns: Countdowns,
    pub(crate) disconnect_notice: bool,
    pub(crate) notice: Option<String>,
    pub(crate) error: Option<String>,
}

impl SessionSnapshot {
    /// Whether the local player may move now.
    pub fn is_local_turn(&self) -> bool {
        self.winner.is_none() && self.turn.is_some() && self.turn == self.assignment
    }

    /// Whether a rematch can be requested.
    pub fn can_rematch(&self) -> bool {
        self.phase == ViewPhase::Playing && self.winner.is_some() && !self.disconnect_notice
    }
}
