//! Client configuration.
//!
//! Every key has a default, so an empty (or missing) TOML file yields a
//! working configuration pointed at a local server.

use crate::error::{ClientError, ClientErrorKind};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable that overrides [`ClientConfig::server_url`].
pub const SERVER_URL_ENV: &str = "INFINITE_SERVER_URL";

/// Network transports, in the order the client may try them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    /// Streaming transport over a websocket.
    Websocket,
    /// HTTP long-polling fallback.
    Polling,
}

/// Which liveness policy watches a running round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStrategy {
    /// Countdown since the last observed game activity.
    #[default]
    Inactivity,
    /// Fixed-interval ping, stalled when pongs stop.
    Heartbeat,
}

/// Transport options handed to the connector.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct TransportConfig {
    /// Extra connection rounds after the first one fails.
    #[serde(default = "default_reconnection_attempts")]
    reconnection_attempts: u32,

    /// Per-attempt connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    connect_timeout_ms: u64,

    /// Transports to try, preferred first.
    #[serde(default = "default_transports")]
    transports: Vec<TransportKind>,
}

impl TransportConfig {
    /// Per-attempt connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            reconnection_attempts: default_reconnection_attempts(),
            connect_timeout_ms: default_connect_timeout_ms(),
            transports: default_transports(),
        }
    }
}

/// Liveness timing.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct LivenessConfig {
    /// Policy to run.
    #[serde(default)]
    strategy: LivenessStrategy,

    /// Silence before the countdown is shown.
    #[serde(default = "default_warning_start_ms")]
    warning_start_ms: u64,

    /// Silence before the round is declared stalled.
    #[serde(default = "default_total_timeout_ms")]
    total_timeout_ms: u64,

    /// Inactivity poll period.
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    /// How long the disconnect notice stays up before quitting.
    #[serde(default = "default_termination_grace_ms")]
    termination_grace_ms: u64,

    /// Heartbeat ping period.
    #[serde(default = "default_heartbeat_interval_ms")]
    heartbeat_interval_ms: u64,

    /// Heartbeat silence before the round is declared stalled.
    #[serde(default = "default_heartbeat_timeout_ms")]
    heartbeat_timeout_ms: u64,
}

impl LivenessConfig {
    /// Silence before the countdown is shown.
    pub fn warning_start(&self) -> Duration {
        Duration::from_millis(self.warning_start_ms)
    }

    /// Silence before the round is declared stalled.
    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }

    /// Inactivity poll period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Disconnect notice duration.
    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }

    /// Heartbeat ping period.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Heartbeat silence limit.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    /// Checks that the timings describe a usable schedule.
    ///
    /// # Errors
    ///
    /// Fails for a zero poll or heartbeat period, or when the warning does
    /// not start before the total timeout.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.poll_interval_ms == 0 {
            return Err(ClientError::new(
                ClientErrorKind::Config,
                "liveness.poll_interval_ms must be greater than zero",
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ClientError::new(
                ClientErrorKind::Config,
                "liveness.heartbeat_interval_ms must be greater than zero",
            ));
        }
        if self.warning_start_ms >= self.total_timeout_ms {
            return Err(ClientError::new(
                ClientErrorKind::Config,
                format!(
                    "liveness.warning_start_ms ({}) must be less than liveness.total_timeout_ms ({})",
                    self.warning_start_ms, self.total_timeout_ms
                ),
            ));
        }
        Ok(())
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            strategy: LivenessStrategy::default(),
            warning_start_ms: default_warning_start_ms(),
            total_timeout_ms: default_total_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            termination_grace_ms: default_termination_grace_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ClientConfig {
    /// Game server base URL (`http(s)://` or `ws(s)://`).
    #[serde(default = "default_server_url")]
    server_url: String,

    /// One-shot deadline for the whole connect phase, in milliseconds.
    #[serde(default = "default_connect_deadline_ms")]
    connect_deadline_ms: u64,

    /// Transport options.
    #[serde(default)]
    transport: TransportConfig,

    /// Liveness options.
    #[serde(default)]
    liveness: LivenessConfig,
}

#[instrument]
fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

#[instrument]
fn default_connect_deadline_ms() -> u64 {
    15_000
}

#[instrument]
fn default_reconnection_attempts() -> u32 {
    3
}

#[instrument]
fn default_connect_timeout_ms() -> u64 {
    10_000
}

#[instrument]
fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}

#[instrument]
fn default_warning_start_ms() -> u64 {
    10_000
}

#[instrument]
fn default_total_timeout_ms() -> u64 {
    25_000
}

#[instrument]
fn default_poll_interval_ms() -> u64 {
    500
}

#[instrument]
fn default_termination_grace_ms() -> u64 {
    3_000
}

#[instrument]
fn default_heartbeat_interval_ms() -> u64 {
    1_000
}

#[instrument]
fn default_heartbeat_timeout_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            connect_deadline_ms: default_connect_deadline_ms(),
            transport: TransportConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Connect-phase deadline.
    pub fn connect_deadline(&self) -> Duration {
        Duration::from_millis(self.connect_deadline_ms)
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ClientError::new(
                ClientErrorKind::Config,
                format!("Failed to read config file: {}", e),
            )
        })?;

        let config: Self = toml::from_str(&content)?;
        config.liveness.validate()?;
        info!(server_url = %config.server_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies the server URL from the environment, if set.
    #[instrument(skip(self))]
    pub fn apply_env(self) -> Self {
        match std::env::var(SERVER_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                info!(url = %url, "Server URL overridden from environment");
                self.with_server_url(url)
            }
            _ => self,
        }
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ClientError> {
        toml::to_string_pretty(self).map_err(|e| {
            ClientError::new(
                ClientErrorKind::Config,
                format!("Failed to render config: {}", e),
            )
        })
    }
}
