use crate::wall_clock::WallClock;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// A test implementation of [`WallClock`] that allows deterministic control
/// of the reported time in unit tests.
///
/// All clones share the same time value, so a test can keep one clone and
/// move another into the component under test.
#[derive(Debug, Clone)]
pub struct TestClock {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for TestClock {
    /// Creates a clock that reports the Unix epoch until it is set.
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl TestClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        TestClock {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Sets the time that is reported by every clone of this clock.
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap_or_else(|time| time.into_inner()) = time;
    }
}

impl WallClock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(|time| time.into_inner())
    }
}
