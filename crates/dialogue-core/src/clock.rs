use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Source of turn timestamps.
pub trait Clock: fmt::Debug + Send {
    fn now(&mut self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for replays: starts at `start` and moves by `step` on every reading.
#[derive(Debug, Clone)]
pub struct SteppedClock {
    next: DateTime<Utc>,
    step: Duration,
}

impl SteppedClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self { next: start, step }
    }
}

impl Default for SteppedClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default(), Duration::seconds(1))
    }
}

impl Clock for SteppedClock {
    fn now(&mut self) -> DateTime<Utc> {
        let current = self.next;
        self.next = current + self.step;
        current
    }
}
