//! Business-day calculator.
//!
//! Counts weekdays (Monday through Friday) in an inclusive calendar range.
//! Holidays are not considered.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Weekday};

/// Number of weekdays between `start` and `end`, both inclusive.
///
/// Returns `0.0` when `end` is before `start`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn business_days(start: NaiveDate, end: NaiveDate) -> f64 {
    if end < start {
        return 0.0;
    }

    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as f64
}

/// Same as [`business_days`] for timestamps; the time of day is ignored.
#[must_use]
pub fn business_days_between<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> f64 {
    business_days(start.date_naive(), end.date_naive())
}
