//! Clock abstraction so "today" can be pinned in tests

use chrono::{Local, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Real system clock in the local timezone
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fake clock for testing, shared between clones
#[derive(Clone)]
pub struct FixedClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(now)),
        }
    }

    /// Noon on the given date
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn advance(&self, duration: chrono::Duration) {
        *self.current.lock() += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.current.lock()
    }
}
