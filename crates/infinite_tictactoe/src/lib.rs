//! Infinite tic-tac-toe game logic.
//!
//! Each player keeps at most three marks on the board; a fourth mark makes
//! that player's oldest one fade. The board is never stored, only derived
//! from the two players' move windows.
//!
//! This crate is pure: no I/O and no clocks. The networked session engine
//! lives in `infinite_client`.
//!
//! # Example
//!
//! ```
//! use infinite_tictactoe::{GameState, Player};
//!
//! let mut game = GameState::new(Player::Minus);
//! let played = game.local_move(4).expect("Minus moves first");
//! assert_eq!(played.index, 4);
//! assert_eq!(game.turn(), Player::Plus);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod history;
mod protocol;
mod state;
mod types;

pub use history::{MoveHistory, MoveWindow, WINDOW};
pub use protocol::{BoardSnapshot, ClientEvent, ProtocolError, ServerEvent};
pub use state::{GameState, LocalMove, MoveRejected, RoundPhase};
pub use types::{BOARD_CELLS, Board, InvalidPlayerCode, Player, Square};
