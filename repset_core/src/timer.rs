//! Rest countdown between sets.
//!
//! The timer only stores when the rest ends. Remaining time is always
//! recomputed from the caller's clock, so late or missed ticks (a
//! suspended terminal, a throttled background tab) never drift the
//! countdown.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestTimer {
    ends_at: DateTime<Utc>,
}

impl RestTimer {
    pub fn start(seconds: u32, now: DateTime<Utc>) -> Self {
        Self {
            ends_at: now + Duration::seconds(i64::from(seconds)),
        }
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Whole seconds left, rounded up; zero once the rest is over
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        let millis = (self.ends_at - now).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        u32::try_from((millis + 999) / 1000).unwrap_or(u32::MAX)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) == 0
    }

    /// Push the end of the rest back by `seconds`
    pub fn extend(&mut self, seconds: u32) {
        self.ends_at = self.ends_at + Duration::seconds(i64::from(seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_is_recomputed_from_clock() {
        let start = Utc::now();
        let timer = RestTimer::start(60, start);

        assert_eq!(timer.remaining_seconds(start), 60);
        assert_eq!(timer.remaining_seconds(start + Duration::milliseconds(500)), 60);
        assert_eq!(timer.remaining_seconds(start + Duration::seconds(59)), 1);
        // A single late tick lands on the right value
        assert_eq!(timer.remaining_seconds(start + Duration::seconds(45)), 15);
        assert!(timer.is_expired(start + Duration::seconds(60)));
        assert!(timer.is_expired(start + Duration::hours(1)));
    }

    #[test]
    fn test_extend_accumulates() {
        let start = Utc::now();
        let mut timer = RestTimer::start(30, start);
        timer.extend(15);
        timer.extend(15);
        assert_eq!(timer.remaining_seconds(start), 60);
    }
}
