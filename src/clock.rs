//! The clock collaborator: the store's only source of "now".

use chrono::{DateTime, Local};

/// Source of the current instant.
///
/// The store consults this instead of ambient time so tests (or hosts with
/// their own notion of time) can substitute an implementation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use chrono::{DateTime, Local, TimeDelta};
    use std::sync::{Arc, Mutex};

    /// A settable clock; clones share the same instant.
    #[derive(Clone)]
    pub(crate) struct ManualClock {
        now: Arc<Mutex<DateTime<Local>>>,
    }

    impl ManualClock {
        pub(crate) fn at(now: DateTime<Local>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub(crate) fn set(&self, now: DateTime<Local>) {
            *self.now.lock().unwrap() = now;
        }

        pub(crate) fn advance(&self, by: TimeDelta) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let clock = ManualClock::at(Local.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap());
        let other = clock.clone();
        clock.advance(TimeDelta::seconds(90));
        assert_eq!(
            other.now(),
            Local.with_ymd_and_hms(2026, 8, 7, 12, 1, 30).unwrap()
        );
    }
}
