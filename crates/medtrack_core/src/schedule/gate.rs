//! Editability gate.
//!
//! A day log may be mutated only while its date is the current local
//! calendar date. Past and future dates are always locked.

use crate::clock::Clock;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutation attempted on a locked date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotEditable {
    pub date: NaiveDate,
    pub today: NaiveDate,
}

impl Display for NotEditable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "day log {} is read-only; only today ({}) can be edited",
            self.date, self.today
        )
    }
}

impl Error for NotEditable {}

/// Returns whether `date` is today according to `clock`.
pub fn is_editable(date: NaiveDate, clock: &dyn Clock) -> bool {
    date == clock.today()
}

/// Rejects mutation of any date other than today.
///
/// # Errors
/// - Returns `NotEditable` for every date that is not today.
pub fn ensure_editable(date: NaiveDate, clock: &dyn Clock) -> Result<(), NotEditable> {
    let today = clock.today();
    if date == today {
        Ok(())
    } else {
        Err(NotEditable { date, today })
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_editable, is_editable};
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn only_today_is_editable() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let clock = FixedClock::new(today.and_hms_opt(12, 0, 0).unwrap());

        assert!(is_editable(today, &clock));
        assert!(!is_editable(today - TimeDelta::days(1), &clock));
        assert!(!is_editable(today + TimeDelta::days(1), &clock));
        assert!(ensure_editable(today + TimeDelta::days(1), &clock).is_err());
    }

    #[test]
    fn yesterday_locks_at_midnight() {
        let yesterday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let clock = FixedClock::new(yesterday.and_hms_opt(23, 59, 59).unwrap());
        assert!(is_editable(yesterday, &clock));

        clock.advance(TimeDelta::seconds(1));
        let err = ensure_editable(yesterday, &clock).unwrap_err();
        assert_eq!(err.today, NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());
    }
}
