//! Monotonic clock abstraction so scheduling can be driven in tests

use std::time::Instant;

/// Source of monotonic timestamps for publish scheduling
pub trait MonotonicClock {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

/// Production clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

impl MonotonicClock for StdClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Manually-advanced clock for deterministic scheduling tests
    #[derive(Clone)]
    pub struct ManualClock {
        base: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl MonotonicClock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }
}
