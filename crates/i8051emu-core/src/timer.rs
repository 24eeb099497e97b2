use std::time::{Duration, Instant};

/// Identifies one armed periodic timer. Handles are never reused, so a stale
/// handle can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Issues fresh [`TimerHandle`]s.
#[derive(Debug, Default)]
pub struct TimerIds {
    next: u64,
}

impl TimerIds {
    pub fn issue(&mut self) -> TimerHandle {
        self.next += 1;
        TimerHandle(self.next)
    }
}

/// A deadline-based periodic timer driven by whoever polls it.
///
/// A poll fires at most one tick no matter how late it is, and the next
/// deadline is measured from the poll that fired. Ticks that were missed while
/// the host was busy are dropped rather than queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicTimer {
    handle: TimerHandle,
    period: Duration,
    next_due: Instant,
}

impl PeriodicTimer {
    pub fn start(handle: TimerHandle, period: Duration, now: Instant) -> Self {
        Self {
            handle,
            period,
            next_due: now + period,
        }
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Instant {
        self.next_due
    }

    /// Whether a tick is due at `now`. A due tick re-arms the timer.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }
}
