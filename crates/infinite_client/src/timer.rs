//! Deadline-based timers.
//!
//! Timers hold no task and no waker: the owner asks whether they are due at
//! a given instant, and the runtime sleeps until the earliest deadline.

use std::time::Duration;
use tokio::time::Instant;

/// A timer that fires at most once per arming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    due: Option<Instant>,
}

impl OneShotTimer {
    /// Creates a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire `after` from `now`, replacing any pending
    /// deadline.
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.due = Some(now + after);
    }

    /// Disarms the timer. Returns whether it was armed, so a second cancel
    /// is a harmless `false`.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// Pending deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.due
    }

    /// Fires (and disarms) if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// A repeating timer with a fixed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    period: Duration,
    next: Option<Instant>,
}

impl IntervalTimer {
    /// Creates a stopped timer.
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Starts ticking; the first tick is one period after `now`.
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    /// Stops ticking.
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Next tick.
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Consumes a due tick, scheduling the next one. Missed ticks are
    /// coalesced into one.
    pub fn tick_if_due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now >= next => {
                let mut following = next + self.period;
                if following <= now {
                    following = now + self.period;
                }
                self.next = Some(following);
                true
            }
            _ => false,
        }
    }
}
