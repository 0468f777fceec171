//! Realtime session engine for infinite tic-tac-toe.
//!
//! The engine connects to an authoritative game server over Socket.IO,
//! mirrors the round in a [`infinite_tictactoe::GameState`], and ends
//! stalled rounds on its own.
//!
//! # Architecture
//!
//! - [`GameSession`] is the sans-io composition root. It takes the current
//!   instant on every call and answers with [`SessionEffect`]s.
//! - [`SessionController`] owns the connection lifecycle and the connect
//!   deadline.
//! - [`LivenessPolicy`] implementations decide when a round has stalled.
//! - [`SessionRuntime`] runs a session on tokio against a
//!   [`TransportFactory`] and publishes [`SessionSnapshot`]s.
//!
//! # Example
//!
//! ```no_run
//! use infinite_client::{
//!     ClientConfig, GameSession, NetworkConnector, SessionRuntime, SocketIoFactory,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let factory = SocketIoFactory::new(
//!     url::Url::parse(config.server_url())?,
//!     config.transport().clone(),
//!     Arc::new(NetworkConnector),
//! );
//! let (client, _task) = SessionRuntime::spawn(GameSession::new(&config), Arc::new(factory));
//! client.start()?;
//! client.attempt_move(4)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod controller;
mod error;
pub mod liveness;
mod runtime;
mod session;
mod snapshot;
mod timer;
pub mod transport;

pub use config::{
    ClientConfig, LivenessConfig, LivenessStrategy, SERVER_URL_ENV, TransportConfig,
    TransportKind,
};
pub use controller::{
    ConnectFailure, ConnectionState, ConnectionTransition, DEADLINE_MESSAGE, SessionController,
};
pub use error::{ClientError, ClientErrorKind};
pub use liveness::{
    Countdowns, HeartbeatMonitor, InactivityMonitor, LivenessPolicy, LivenessTick,
    policy_from_config,
};
pub use runtime::{SessionClient, SessionRuntime, UserCommand};
pub use session::{CONNECTION_LOST, GameSession, SessionEffect};
pub use snapshot::{SessionSnapshot, ViewPhase};
pub use timer::{IntervalTimer, OneShotTimer};
pub use transport::{
    Connector, Link, NetworkConnector, PacketSink, PacketStream, SocketIoFactory,
    TransportCommand, TransportEvent, TransportFactory, TransportHandle,
};
