use chrono::{DateTime, Utc};

/// A source for the current wall clock time in UTC.
///
/// Position sources stamp every fix with the time returned by [`now`](Self::now).
/// Implementations must be shareable between threads because a source is
/// used from the simulation driver and from the module task at the same time.
pub trait WallClock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// A [`WallClock`] backed by the system clock.
///
/// The system clock is not monotonic, two consecutive calls may return
/// decreasing timestamps when the clock gets adjusted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
