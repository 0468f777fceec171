//! Liveness policies for a running round.
//!
//! A policy watches for a stalled round without any help from the server.
//! The session only talks to the [`LivenessPolicy`] trait, so the inactivity
//! countdown and the ping/pong heartbeat are interchangeable.

mod heartbeat;
mod inactivity;

pub use heartbeat::HeartbeatMonitor;
pub use inactivity::InactivityMonitor;

use crate::config::{LivenessConfig, LivenessStrategy};
use derive_new::new;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// Seconds left before an automatic disconnect, per side. Zero means no
/// warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, new)]
pub struct Countdowns {
    /// Shown to the local player while it is their turn.
    pub own: u32,
    /// Shown while waiting on the opponent.
    pub opponent: u32,
}

impl Countdowns {
    /// No warning on either side.
    pub const CLEAR: Self = Self { own: 0, opponent: 0 };
}

/// Result of one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessTick {
    /// Countdowns after this tick.
    pub countdowns: Countdowns,
    /// Set only on the tick that detected the stall.
    pub stalled: bool,
    /// The policy wants a heartbeat probe sent.
    pub ping: bool,
}

/// A strategy that decides when a round has stalled.
pub trait LivenessPolicy: Send + std::fmt::Debug {
    /// Records game activity (an inbound progress message or a local move).
    fn on_activity_observed(&mut self, now: Instant);

    /// Records a heartbeat reply.
    fn on_pong(&mut self, _now: Instant) {}

    /// Advances the policy. After the stall fires, ticks are inert.
    fn tick(&mut self, now: Instant, local_turn: bool) -> LivenessTick;

    /// Whether the round has been declared stalled.
    fn is_stalled(&self) -> bool;

    /// Declares the round stalled without consulting the clock. Returns
    /// `true` only for the call that made the transition.
    fn force_stall(&mut self) -> bool;

    /// How often [`LivenessPolicy::tick`] should run.
    fn poll_interval(&self) -> Duration;

    /// Latest countdowns.
    fn countdowns(&self) -> Countdowns;
}

/// Builds the configured policy, with its clock seeded at `now`.
#[instrument(skip(config), fields(strategy = ?config.strategy()))]
pub fn policy_from_config(config: &LivenessConfig, now: Instant) -> Box<dyn LivenessPolicy> {
    match config.strategy() {
        LivenessStrategy::Inactivity => Box::new(InactivityMonitor::new(
            config.warning_start(),
            config.total_timeout(),
            config.poll_interval(),
            now,
        )),
        LivenessStrategy::Heartbeat => Box::new(HeartbeatMonitor::new(
            config.heartbeat_interval(),
            config.heartbeat_timeout(),
            now,
        )),
    }
}
