//! Messages exchanged with the authoritative game server.
//!
//! Events travel as `(name, data)` pairs. This module owns the JSON shape of
//! each payload; framing belongs to the transport.

use crate::history::{MoveHistory, MoveWindow};
use crate::types::{BOARD_CELLS, Player};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

/// Protocol error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Protocol error: {} at {}:{}", message, file, line)]
pub struct ProtocolError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProtocolError {
    /// Creates a new protocol error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Malformed payload: {}", err))
    }
}

/// Player-indexed board snapshot, `{"-1": [..], "1": [..]}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Minus's marks, oldest first.
    #[serde(rename = "-1", default)]
    pub minus: Vec<usize>,
    /// Plus's marks, oldest first.
    #[serde(rename = "1", default)]
    pub plus: Vec<usize>,
}

impl BoardSnapshot {
    /// Converts the snapshot into a move history.
    ///
    /// # Errors
    ///
    /// Fails when an index lies off the board.
    pub fn into_history(self) -> Result<MoveHistory, ProtocolError> {
        if let Some(bad) = self
            .minus
            .iter()
            .chain(self.plus.iter())
            .find(|i| **i >= BOARD_CELLS)
        {
            return Err(ProtocolError::new(format!(
                "Snapshot index {} is off the board",
                bad
            )));
        }
        Ok(MoveHistory::from_windows(
            MoveWindow::from_indices(self.minus),
            MoveWindow::from_indices(self.plus),
        ))
    }
}

impl From<&MoveHistory> for BoardSnapshot {
    fn from(history: &MoveHistory) -> Self {
        Self {
            minus: history.window(Player::Minus).to_vec(),
            plus: history.window(Player::Plus).to_vec(),
        }
    }
}

#[derive(Deserialize)]
struct RoomJoinedPayload {
    players: u8,
}

#[derive(Deserialize)]
struct TurnPayload {
    state: BoardSnapshot,
    turn: Player,
}

#[derive(Deserialize)]
struct RematchPayload {
    state: BoardSnapshot,
}

#[derive(Deserialize)]
struct GameEndPayload {
    state: BoardSnapshot,
    winner: Player,
}

/// Event emitted by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Joined a room in the given 1-indexed slot.
    RoomJoined {
        /// Player slot (1 or 2).
        players: u8,
    },
    /// Both players are present; the round begins.
    GameStart,
    /// Authoritative board after a move, with the next turn.
    Turn {
        /// Board snapshot.
        state: BoardSnapshot,
        /// Player to move next.
        turn: Player,
    },
    /// Both players agreed to play again.
    Rematch {
        /// Board snapshot for the new round.
        state: BoardSnapshot,
    },
    /// The round is over.
    GameEnd {
        /// Final board snapshot.
        state: BoardSnapshot,
        /// Winning player.
        winner: Player,
    },
    /// Heartbeat reply.
    Pong,
}

impl ServerEvent {
    /// Decodes an event from its name and JSON payload.
    ///
    /// # Errors
    ///
    /// Fails for unknown names and malformed payloads.
    #[instrument(skip(data))]
    pub fn decode(name: &str, data: Value) -> Result<Self, ProtocolError> {
        match name {
            "room_joined" => {
                let payload: RoomJoinedPayload = serde_json::from_value(data)?;
                Ok(Self::RoomJoined {
                    players: payload.players,
                })
            }
            "game_start" => Ok(Self::GameStart),
            "turn" => {
                let payload: TurnPayload = serde_json::from_value(data)?;
                Ok(Self::Turn {
                    state: payload.state,
                    turn: payload.turn,
                })
            }
            "rematch" => {
                let payload: RematchPayload = serde_json::from_value(data)?;
                Ok(Self::Rematch {
                    state: payload.state,
                })
            }
            "game_end" => {
                let payload: GameEndPayload = serde_json::from_value(data)?;
                Ok(Self::GameEnd {
                    state: payload.state,
                    winner: payload.winner,
                })
            }
            "pong" => Ok(Self::Pong),
            other => Err(ProtocolError::new(format!("Unknown event '{}'", other))),
        }
    }

    /// Whether this event counts as game progress for liveness purposes.
    pub fn is_game_progress(&self) -> bool {
        matches!(
            self,
            Self::GameStart | Self::Turn { .. } | Self::Rematch { .. } | Self::GameEnd { .. }
        )
    }
}

/// Event sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Local move.
    Turn {
        /// Board index played.
        coord: usize,
        /// Player who played it.
        turn: Player,
    },
    /// Ask for another round.
    Rematch,
    /// Heartbeat probe.
    Ping,
}

impl ClientEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Turn { .. } => "turn",
            Self::Rematch => "rematch",
            Self::Ping => "ping",
        }
    }

    /// JSON payload, if the event carries one.
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::Turn { coord, turn } => Some(serde_json::json!({
                "coord": coord,
                "turn": turn.code(),
            })),
            Self::Rematch | Self::Ping => None,
        }
    }
}
