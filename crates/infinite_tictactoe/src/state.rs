//! Round state: turn, winner and local assignment over a move history.
//!
//! Authoritative updates replace the history wholesale. Local moves are
//! applied optimistically and are expected to be confirmed (or overwritten)
//! by the next authoritative update.

use crate::history::MoveHistory;
use crate::types::{BOARD_CELLS, Board, Player};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No winner yet; the turn holder may move.
    InProgress,
    /// The authority declared a winner; no more local moves.
    Concluded(Player),
}

/// Why a local move was not applied.
///
/// Rejections are silent at the session level; the reason exists for
/// logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MoveRejected {
    /// The round already has a winner.
    #[display("round already concluded")]
    RoundConcluded,
    /// It is the opponent's turn.
    #[display("not the local player's turn")]
    NotYourTurn,
    /// The index is outside 0..=8.
    #[display("cell {} is off the board", _0)]
    OutOfRange(#[error(not(source))] usize),
    /// Someone already holds the cell.
    #[display("cell {} is occupied", _0)]
    Occupied(#[error(not(source))] usize),
}

/// A local move that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalMove {
    /// Board index played.
    pub index: usize,
    /// Player who played it.
    pub player: Player,
}

/// State of one round as seen by the local client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    assignment: Player,
    turn: Player,
    winner: Option<Player>,
    history: MoveHistory,
}

impl GameState {
    /// Starts a round for the given local assignment. Minus moves first.
    #[instrument]
    pub fn new(assignment: Player) -> Self {
        info!(?assignment, "Starting round");
        Self {
            assignment,
            turn: Player::Minus,
            winner: None,
            history: MoveHistory::new(),
        }
    }

    /// Identity the local participant plays as.
    pub fn assignment(&self) -> Player {
        self.assignment
    }

    /// Player whose move it is (the winner once concluded).
    pub fn turn(&self) -> Player {
        self.turn
    }

    /// Winner declared by the authority.
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    /// Current move history.
    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// Current round phase.
    pub fn phase(&self) -> RoundPhase {
        match self.winner {
            None => RoundPhase::InProgress,
            Some(winner) => RoundPhase::Concluded(winner),
        }
    }

    /// Whether the local participant may move now.
    pub fn is_local_turn(&self) -> bool {
        self.winner.is_none() && self.turn == self.assignment
    }

    /// Derived board.
    pub fn board(&self) -> Board {
        self.history.board()
    }

    /// Cell that fades if the turn holder moves again. Hidden once the round
    /// is concluded.
    pub fn fading_cell(&self) -> Option<usize> {
        match self.winner {
            None => self.history.oldest_of(self.turn),
            Some(_) => None,
        }
    }

    /// Applies an authoritative turn update.
    #[instrument(skip(self, history))]
    pub fn apply_turn(&mut self, history: MoveHistory, turn: Player) {
        debug!(?turn, "Applying authoritative turn");
        self.history.replace(history);
        self.turn = turn;
    }

    /// Applies the authoritative end of round.
    #[instrument(skip(self, history))]
    pub fn apply_game_end(&mut self, history: MoveHistory, winner: Player) {
        info!(?winner, "Round concluded");
        self.history.replace(history);
        self.turn = winner;
        self.winner = Some(winner);
    }

    /// Applies an authoritative rematch: flips the local assignment and
    /// reopens the round. The turn is left for the authority to set.
    #[instrument(skip(self, history))]
    pub fn apply_rematch(&mut self, history: MoveHistory) {
        self.history.replace(history);
        self.assignment = self.assignment.opponent();
        self.winner = None;
        info!(assignment = ?self.assignment, "Rematch started");
    }

    /// Applies a local move optimistically and passes the turn.
    ///
    /// # Errors
    ///
    /// Returns the reason the move was ignored. State is unchanged on error.
    #[instrument(skip(self), fields(turn = ?self.turn, assignment = ?self.assignment))]
    pub fn local_move(&mut self, index: usize) -> Result<LocalMove, MoveRejected> {
        if self.winner.is_some() {
            return Err(MoveRejected::RoundConcluded);
        }
        if self.turn != self.assignment {
            return Err(MoveRejected::NotYourTurn);
        }
        if index >= BOARD_CELLS {
            return Err(MoveRejected::OutOfRange(index));
        }
        if self.history.is_occupied(index) {
            return Err(MoveRejected::Occupied(index));
        }

        let player = self.turn;
        self.history.append(player, index);
        self.turn = player.opponent();
        debug!(index, ?player, "Local move applied optimistically");
        Ok(LocalMove { index, player })
    }
}
