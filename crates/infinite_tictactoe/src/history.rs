//! Per-player sliding move windows and board derivation.

use crate::types::{BOARD_CELLS, Board, Player};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{instrument, trace};

/// Maximum number of marks a player keeps on the board.
pub const WINDOW: usize = 3;

/// One player's marks, oldest first, capped at [`WINDOW`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveWindow {
    moves: VecDeque<usize>,
}

impl MoveWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a window from an ordered sequence, keeping only the newest
    /// [`WINDOW`] entries.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut window = Self::new();
        for index in indices {
            window.push(index);
        }
        window
    }

    /// Pushes a mark, evicting and returning the oldest one once the window
    /// is over capacity.
    pub fn push(&mut self, index: usize) -> Option<usize> {
        self.moves.push_back(index);
        if self.moves.len() > WINDOW {
            self.moves.pop_front()
        } else {
            None
        }
    }

    /// Oldest mark still on the board.
    pub fn oldest(&self) -> Option<usize> {
        self.moves.front().copied()
    }

    /// Whether the window holds the given index.
    pub fn contains(&self, index: usize) -> bool {
        self.moves.contains(&index)
    }

    /// Number of marks held.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Whether the window holds no marks.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Iterates marks oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.moves.iter().copied()
    }

    /// Copies the marks out, oldest first.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

/// Both players' move windows. The board is always derived from these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveHistory {
    minus: MoveWindow,
    plus: MoveWindow,
}

impl MoveHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from both players' sequences.
    pub fn from_windows(minus: MoveWindow, plus: MoveWindow) -> Self {
        Self { minus, plus }
    }

    /// Returns one player's window.
    pub fn window(&self, player: Player) -> &MoveWindow {
        match player {
            Player::Minus => &self.minus,
            Player::Plus => &self.plus,
        }
    }

    /// Appends a mark for `player`, dropping that player's oldest mark when
    /// the window overflows.
    #[instrument(skip(self))]
    pub fn append(&mut self, player: Player, index: usize) {
        let window = match player {
            Player::Minus => &mut self.minus,
            Player::Plus => &mut self.plus,
        };
        if let Some(evicted) = window.push(index) {
            trace!(evicted, "Oldest mark faded");
        }
    }

    /// Overwrites both windows at once.
    pub fn replace(&mut self, other: MoveHistory) {
        *self = other;
    }

    /// Derives the 9-cell board.
    pub fn board(&self) -> Board {
        let mut board = Board::empty();
        for index in self.minus.iter().filter(|i| *i < BOARD_CELLS) {
            board.mark(index, Player::Minus);
        }
        for index in self.plus.iter().filter(|i| *i < BOARD_CELLS) {
            board.mark(index, Player::Plus);
        }
        board
    }

    /// The mark that would fade if `player` moved again.
    pub fn oldest_of(&self, player: Player) -> Option<usize> {
        self.window(player).oldest()
    }

    /// Whether either player holds the index.
    pub fn is_occupied(&self, index: usize) -> bool {
        self.minus.contains(index) || self.plus.contains(index)
    }
}
