//! Source of the current time.

use chrono::{DateTime, SubsecRound, Utc};

/// Provides "now" to session operations so tests can pin the time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock, truncated to whole seconds to match the stored format.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
