//! Core domain types for infinite tic-tac-toe.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// Player identity.
///
/// On the wire the two identities are the signed codes `-1` and `1`; the
/// neutral `0` is reserved for an empty cell and never names a player.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(try_from = "i8", into = "i8")]
pub enum Player {
    /// The first player (wire code `-1`, player slot 1).
    Minus,
    /// The second player (wire code `1`, player slot 2).
    Plus,
}

impl Player {
    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::Minus => Player::Plus,
            Player::Plus => Player::Minus,
        }
    }

    /// Returns the signed wire code for this player.
    pub fn code(self) -> i8 {
        match self {
            Player::Minus => -1,
            Player::Plus => 1,
        }
    }

    /// Maps a 1-indexed room slot to a player identity.
    ///
    /// Slot 1 plays Minus, slot 2 plays Plus.
    pub fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(Player::Minus),
            2 => Some(Player::Plus),
            _ => None,
        }
    }

    /// Board symbol used by text front ends.
    pub fn symbol(self) -> char {
        match self {
            Player::Minus => 'X',
            Player::Plus => 'O',
        }
    }
}

/// Returned when a wire code does not name a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("{} is not a player code (expected -1 or 1)", code)]
pub struct InvalidPlayerCode {
    /// The rejected code.
    pub code: i8,
}

impl TryFrom<i8> for Player {
    type Error = InvalidPlayerCode;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Player::Minus),
            1 => Ok(Player::Plus),
            code => Err(InvalidPlayerCode { code }),
        }
    }
}

impl From<Player> for i8 {
    fn from(player: Player) -> Self {
        player.code()
    }
}

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square occupied by a player.
    Occupied(Player),
}

impl Square {
    /// Returns the occupying player, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            Square::Empty => None,
            Square::Occupied(player) => Some(player),
        }
    }
}

/// 3x3 board derived from the two move windows.
///
/// There is no way to set a square from outside the crate: boards only
/// come out of [`crate::MoveHistory::board`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; BOARD_CELLS],
}

impl Board {
    /// Creates an empty board.
    pub fn empty() -> Self {
        Self {
            squares: [Square::Empty; BOARD_CELLS],
        }
    }

    pub(crate) fn mark(&mut self, pos: usize, player: Player) {
        if let Some(square) = self.squares.get_mut(pos) {
            *square = Square::Occupied(player);
        }
    }

    /// Gets the square at the given position (0-8).
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// Checks if a square is empty. Out-of-range positions are never empty.
    pub fn is_empty(&self, pos: usize) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Returns all squares.
    pub fn squares(&self) -> &[Square; BOARD_CELLS] {
        &self.squares
    }

    /// Formats the board as a human-readable grid.
    ///
    /// Empty squares show their 1-based key. The square in `fading`, if
    /// occupied, is drawn in lower case.
    pub fn display(&self, fading: Option<usize>) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                let symbol = match self.squares[pos] {
                    Square::Empty => char::from(b'1' + pos as u8),
                    Square::Occupied(player) if fading == Some(pos) => {
                        player.symbol().to_ascii_lowercase()
                    }
                    Square::Occupied(player) => player.symbol(),
                };
                result.push(symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}
