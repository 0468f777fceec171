use super::{Countdowns, LivenessPolicy, LivenessTick};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{trace, warn};

/// Fixed-interval ping/pong heartbeat.
///
/// Every tick asks for a `ping`; the round stalls once nothing (pong or game
/// activity) has been heard for `timeout`. No countdowns are shown.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    last_heard: Instant,
    stalled: bool,
}

impl HeartbeatMonitor {
    /// Creates a heartbeat whose clock starts at `now`.
    pub fn new(interval: Duration, timeout: Duration, now: Instant) -> Self {
        Self {
            interval,
            timeout,
            last_heard: now,
            stalled: false,
        }
    }
}

impl LivenessPolicy for HeartbeatMonitor {
    fn on_activity_observed(&mut self, now: Instant) {
        if !self.stalled {
            self.last_heard = now;
        }
    }

    fn on_pong(&mut self, now: Instant) {
        trace!("Pong received");
        self.on_activity_observed(now);
    }

    fn tick(&mut self, now: Instant, _local_turn: bool) -> LivenessTick {
        if self.stalled {
            return LivenessTick::default();
        }

        let silence = now.saturating_duration_since(self.last_heard);
        if silence >= self.timeout {
            warn!(silence_ms = silence.as_millis() as u64, "Heartbeat lost");
            self.stalled = true;
            return LivenessTick {
                countdowns: Countdowns::CLEAR,
                stalled: true,
                ping: false,
            };
        }

        LivenessTick {
            countdowns: Countdowns::CLEAR,
            stalled: false,
            ping: true,
        }
    }

    fn is_stalled(&self) -> bool {
        self.stalled
    }

    fn force_stall(&mut self) -> bool {
        !std::mem::replace(&mut self.stalled, true)
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    fn countdowns(&self) -> Countdowns {
        Countdowns::CLEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pings_until_pongs_stop() {
        let start = Instant::now();
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(1), Duration::from_secs(5), start);

        assert!(hb.tick(start + Duration::from_secs(1), true).ping);
        hb.on_pong(start + Duration::from_secs(1));
        assert!(hb.tick(start + Duration::from_secs(5), true).ping);

        let lost = hb.tick(start + Duration::from_secs(6), true);
        assert!(lost.stalled);
        assert!(!lost.ping);
        assert!(!hb.tick(start + Duration::from_secs(7), true).stalled);
    }
}
