//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Engine packets carry a one-digit type followed by an optional payload.
//! Socket packets ride inside engine `message` packets:
//!
//! ```text
//! 42["turn",{"coord":4,"turn":-1}]
//! │└ socket EVENT
//! └ engine MESSAGE
//! ```

use crate::error::ClientError;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Separator between packets in one polling payload.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Default namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Session parameters sent in the engine `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine session id.
    pub sid: String,
    /// Transports the session may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping period in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// Server ping timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
    /// Maximum payload size in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Session opened.
    Open(Handshake),
    /// Session closed.
    Close,
    /// Liveness probe, answered with a pong carrying the same data.
    Ping(String),
    /// Liveness reply.
    Pong(String),
    /// Socket.IO payload.
    Message(String),
    /// Transport upgrade.
    Upgrade,
    /// No-op.
    Noop,
}

impl EnginePacket {
    /// Encodes the packet as text. `Open` is server-only and encodes to its
    /// type digit alone.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{}", data),
            Self::Pong(data) => format!("3{}", data),
            Self::Message(data) => format!("4{}", data),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }

    /// Decodes one text packet.
    ///
    /// # Errors
    ///
    /// Fails on empty input, unknown type digits and bad handshakes.
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ClientError::codec("Empty engine packet"))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(rest.to_string())),
            '3' => Ok(Self::Pong(rest.to_string())),
            '4' => Ok(Self::Message(rest.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ClientError::codec(format!(
                "Unknown engine packet type '{}'",
                other
            ))),
        }
    }
}

/// Splits a polling payload into packets, skipping malformed records.
pub fn decode_payload(payload: &str) -> Vec<EnginePacket> {
    payload
        .split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| match EnginePacket::decode(chunk) {
            Ok(packet) => Some(packet),
            Err(e) => {
                warn!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

/// Joins packets into one polling payload.
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Socket.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPacket {
    /// Namespace connect (request from client, ack from server).
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth payload (client) or session data (server).
        data: Option<Value>,
    },
    /// Namespace disconnect.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// Named event.
    Event {
        /// Namespace.
        namespace: String,
        /// Ack id requested by the sender.
        id: Option<u64>,
        /// Event name.
        name: String,
        /// First argument, `null` when absent.
        data: Value,
    },
    /// Acknowledgement of an event.
    Ack {
        /// Namespace.
        namespace: String,
        /// Acknowledged id.
        id: u64,
        /// Ack arguments.
        data: Value,
    },
    /// Namespace connection refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Reason given by the server.
        message: String,
    },
}

impl SocketPacket {
    /// Connect request for the default namespace.
    pub fn connect() -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    /// Event on the default namespace without an ack.
    pub fn event(name: impl Into<String>, data: Option<Value>) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            name: name.into(),
            data: data.unwrap_or(Value::Null),
        }
    }

    /// Encodes the packet as the body of an engine `message`.
    pub fn encode(&self) -> String {
        fn prefix(kind: char, namespace: &str) -> String {
            if namespace == DEFAULT_NAMESPACE {
                kind.to_string()
            } else {
                format!("{}{},", kind, namespace)
            }
        }

        match self {
            Self::Connect { namespace, data } => {
                let mut out = prefix('0', namespace);
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
                out
            }
            Self::Disconnect { namespace } => prefix('1', namespace),
            Self::Event {
                namespace,
                id,
                name,
                data,
            } => {
                let mut out = prefix('2', namespace);
                if let Some(id) = id {
                    out.push_str(&id.to_string());
                }
                let args = match data {
                    Value::Null => Value::Array(vec![Value::String(name.clone())]),
                    data => Value::Array(vec![Value::String(name.clone()), data.clone()]),
                };
                out.push_str(&args.to_string());
                out
            }
            Self::Ack {
                namespace,
                id,
                data,
            } => {
                let mut out = prefix('3', namespace);
                out.push_str(&id.to_string());
                out.push_str(&data.to_string());
                out
            }
            Self::ConnectError { namespace, message } => {
                let mut out = prefix('4', namespace);
                out.push_str(&serde_json::json!({ "message": message }).to_string());
                out
            }
        }
    }

    /// Decodes the body of an engine `message`.
    ///
    /// # Errors
    ///
    /// Fails on unknown or binary packet types and malformed JSON.
    pub fn decode(text: &str) -> Result<Self, ClientError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ClientError::codec("Empty socket packet"))?;
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
            namespace
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| ClientError::codec(format!("Bad ack id: {}", e)))?,
            )
        } else {
            None
        };
        let body = &rest[digits..];

        let json = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(body)?)
        };

        match kind {
            '0' => Ok(Self::Connect {
                namespace,
                data: json,
            }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut args = match json {
                    Some(Value::Array(args)) => args.into_iter(),
                    _ => return Err(ClientError::codec("Event payload is not an array")),
                };
                let name = match args.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(ClientError::codec("Event without a name")),
                };
                Ok(Self::Event {
                    namespace,
                    id,
                    name,
                    data: args.next().unwrap_or(Value::Null),
                })
            }
            '3' => Ok(Self::Ack {
                namespace,
                id: id.ok_or_else(|| ClientError::codec("Ack without id"))?,
                data: json.unwrap_or(Value::Null),
            }),
            '4' => {
                let message = match json {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connect error")
                        .to_string(),
                    Some(Value::String(message)) => message,
                    _ => "connect error".to_string(),
                };
                Ok(Self::ConnectError { namespace, message })
            }
            '5' | '6' => Err(ClientError::codec("Binary packets are not supported")),
            other => Err(ClientError::codec(format!(
                "Unknown socket packet type '{}'",
                other
            ))),
        }
    }
}
