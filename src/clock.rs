use time::OffsetDateTime;

/// Source of the current time, injected so expiry and window logic can be
/// driven deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Mutex;

    use time::{Duration, OffsetDateTime};

    use super::Clock;

    pub struct ManualClock(Mutex<OffsetDateTime>);

    impl ManualClock {
        pub fn new(start: OffsetDateTime) -> Self {
            Self(Mutex::new(start))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(time::macros::datetime!(2024-03-01 09:00:00 UTC))
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> OffsetDateTime {
            *self.0.lock().unwrap()
        }
    }
}
