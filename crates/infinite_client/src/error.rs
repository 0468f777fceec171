//! Client error types.

use derive_more::{Display, Error};
use infinite_tictactoe::ProtocolError;
use tracing::instrument;

/// Broad category of a client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ClientErrorKind {
    /// Configuration could not be read or parsed.
    #[display("Config")]
    Config,
    /// Local I/O failure.
    #[display("I/O")]
    Io,
    /// Network transport failure.
    #[display("Transport")]
    Transport,
    /// Malformed Engine.IO or Socket.IO frame.
    #[display("Codec")]
    Codec,
    /// Well-formed frame carrying an unexpected event or payload.
    #[display("Protocol")]
    Protocol,
    /// An internal channel closed underneath us.
    #[display("Channel closed")]
    ChannelClosed,
}

/// Client error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} error: {} at {}:{}", kind, message, file, line)]
pub struct ClientError {
    /// Error category.
    pub kind: ClientErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ClientError {
    /// Creates a new client error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for a transport error.
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, message)
    }

    /// Shorthand for a codec error.
    #[track_caller]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Codec, message)
    }
}

impl From<std::io::Error> for ClientError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(ClientErrorKind::Io, err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(ClientErrorKind::Codec, format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ClientError {
    #[track_caller]
    fn from(err: toml::de::Error) -> Self {
        Self::new(ClientErrorKind::Config, format!("Failed to parse config: {}", err))
    }
}

impl From<reqwest::Error> for ClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        Self::new(ClientErrorKind::Transport, err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    #[track_caller]
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::new(ClientErrorKind::Transport, err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    #[track_caller]
    fn from(err: url::ParseError) -> Self {
        Self::new(ClientErrorKind::Config, format!("Invalid server URL: {}", err))
    }
}

impl From<ProtocolError> for ClientError {
    #[track_caller]
    fn from(err: ProtocolError) -> Self {
        Self::new(ClientErrorKind::Protocol, err.message)
    }
}
