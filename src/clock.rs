//! Monotonic wall-clock and unique identifier provider.
//!
//! Components never call `chrono::Utc::now()` or `uuid::Uuid::new_v4()`
//! directly so that tests can substitute a fixed clock and deterministic ids
//! without threading a fake through every call site.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn new_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// A clock that advances only when told to, and hands out sequential
    /// ids, for assertions that need exact timestamps or ordering.
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
        counter: AtomicU64,
    }

    impl FixedClock {
        #[must_use]
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
                counter: AtomicU64::new(0),
            }
        }

        pub fn advance(&self, duration: chrono::Duration) {
            #[allow(clippy::unwrap_used)]
            let mut now = self.now.lock().unwrap();
            *now += duration;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            #[allow(clippy::unwrap_used)]
            {
                *self.now.lock().unwrap()
            }
        }

        fn new_id(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            format!("fixed-{n:08}")
        }
    }
}
