use super::{Countdowns, LivenessPolicy, LivenessTick};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Countdown since the last observed game activity.
///
/// After `warning_start` of silence the side whose turn it is gets a
/// countdown to `total_timeout`; at `total_timeout` the round is stalled.
/// Each client runs its own clock from the messages it saw, so two clients
/// may stall a few hundred milliseconds apart.
#[derive(Debug, Clone)]
pub struct InactivityMonitor {
    warning_start: Duration,
    total_timeout: Duration,
    poll_interval: Duration,
    last_activity: Instant,
    countdowns: Countdowns,
    stalled: bool,
}

impl InactivityMonitor {
    /// Creates a monitor whose clock starts at `now`.
    pub fn new(
        warning_start: Duration,
        total_timeout: Duration,
        poll_interval: Duration,
        now: Instant,
    ) -> Self {
        Self {
            warning_start,
            total_timeout,
            poll_interval,
            last_activity: now,
            countdowns: Countdowns::CLEAR,
            stalled: false,
        }
    }

    /// Timestamp of the last activity.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    fn seconds_remaining(&self, elapsed: Duration) -> u32 {
        let remaining = self.total_timeout.saturating_sub(elapsed).as_nanos();
        remaining.div_ceil(1_000_000_000) as u32
    }
}

impl LivenessPolicy for InactivityMonitor {
    fn on_activity_observed(&mut self, now: Instant) {
        if self.stalled {
            return;
        }
        self.last_activity = now;
        self.countdowns = Countdowns::CLEAR;
    }

    #[instrument(skip(self), level = "trace")]
    fn tick(&mut self, now: Instant, local_turn: bool) -> LivenessTick {
        if self.stalled {
            return LivenessTick::default();
        }

        let elapsed = now.saturating_duration_since(self.last_activity);
        if elapsed < self.warning_start {
            self.countdowns = Countdowns::CLEAR;
        } else if elapsed < self.total_timeout {
            let seconds = self.seconds_remaining(elapsed);
            self.countdowns = if local_turn {
                Countdowns::new(seconds, 0)
            } else {
                Countdowns::new(0, seconds)
            };
            debug!(seconds, local_turn, "Inactivity warning");
        } else {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "Round stalled");
            self.countdowns = Countdowns::CLEAR;
            self.stalled = true;
            return LivenessTick {
                countdowns: self.countdowns,
                stalled: true,
                ping: false,
            };
        }

        LivenessTick {
            countdowns: self.countdowns,
            stalled: false,
            ping: false,
        }
    }

    fn is_stalled(&self) -> bool {
        self.stalled
    }

    fn force_stall(&mut self) -> bool {
        self.countdowns = Countdowns::CLEAR;
        !std::mem::replace(&mut self.stalled, true)
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn countdowns(&self) -> Countdowns {
        self.countdowns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(now: Instant) -> InactivityMonitor {
        InactivityMonitor::new(
            Duration::from_secs(10),
            Duration::from_secs(25),
            Duration::from_millis(500),
            now,
        )
    }

    #[test]
    fn quiet_before_warning_start() {
        let start = Instant::now();
        let mut m = monitor(start);

        let tick = m.tick(start + Duration::from_millis(9999), true);
        assert_eq!(tick.countdowns, Countdowns::CLEAR);
        assert!(!tick.stalled);
    }

    #[test]
    fn warning_goes_to_turn_holder() {
        let start = Instant::now();
        let mut m = monitor(start);

        let own = m.tick(start + Duration::from_millis(12_000), true);
        assert_eq!(own.countdowns, Countdowns::new(13, 0));

        let theirs = m.tick(start + Duration::from_millis(12_000), false);
        assert_eq!(theirs.countdowns, Countdowns::new(0, 13));

        let last = m.tick(start + Duration::from_millis(24_001), true);
        assert_eq!(last.countdowns, Countdowns::new(1, 0));
    }

    #[test]
    fn partial_seconds_round_up() {
        let start = Instant::now();
        let mut m = monitor(start);

        // 12.0000005s left.
        let tick = m.tick(start + Duration::from_nanos(12_999_999_500), true);
        assert_eq!(tick.countdowns, Countdowns::new(13, 0));

        let tick = m.tick(start + Duration::from_nanos(13_000_000_000), true);
        assert_eq!(tick.countdowns, Countdowns::new(12, 0));
    }

    #[test]
    fn stall_fires_once() {
        let start = Instant::now();
        let mut m = monitor(start);

        assert!(m.tick(start + Duration::from_millis(25_000), false).stalled);
        assert!(m.is_stalled());
        assert!(!m.tick(start + Duration::from_millis(25_500), false).stalled);
        assert!(!m.tick(start + Duration::from_millis(90_000), true).stalled);
        assert!(!m.force_stall());
    }

    #[test]
    fn activity_resets_clock() {
        let start = Instant::now();
        let mut m = monitor(start);

        m.tick(start + Duration::from_secs(20), true);
        m.on_activity_observed(start + Duration::from_secs(20));
        assert_eq!(m.countdowns(), Countdowns::CLEAR);

        let tick = m.tick(start + Duration::from_secs(29), true);
        assert_eq!(tick.countdowns, Countdowns::CLEAR);
        assert!(!tick.stalled);
    }
}
