//! Clock

use jiff::Zoned;

/// Source of the current local time.
pub trait Clock {
    /// Current time in the customer's time zone.
    fn now(&self) -> Zoned;
}

/// Wall clock in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Zoned {
        Zoned::now()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone)]
pub struct FixedClock(Zoned);

impl FixedClock {
    /// Freeze the clock at `now`.
    pub fn new(now: Zoned) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Zoned {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use jiff::{civil::date, tz::TimeZone};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn fixed_clock_returns_frozen_time() -> TestResult {
        let now = date(2025, 3, 5).at(12, 0, 0, 0).to_zoned(TimeZone::UTC)?;
        let clock = FixedClock::new(now.clone());

        assert_eq!(clock.now(), now);
        assert_eq!(clock.now(), clock.now());

        Ok(())
    }
}
