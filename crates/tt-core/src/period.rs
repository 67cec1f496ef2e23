//! Calendar periods and local day boundaries.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A calendar period that ends today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

/// First day of the period containing `today`.
///
/// Weeks begin on `week_start`.
pub fn period_start(period: Period, today: NaiveDate, week_start: Weekday) -> NaiveDate {
    match period {
        Period::Day => today,
        Period::Week => {
            let since_start = (today.weekday().num_days_from_monday() + 7
                - week_start.num_days_from_monday())
                % 7;
            today - TimeDelta::days(i64::from(since_start))
        }
        Period::Month => today.with_day(1).unwrap_or(today),
        Period::Year => today.with_ordinal(1).unwrap_or(today),
    }
}

/// The instant a local calendar day begins, in UTC.
///
/// During a DST fall-back the earlier midnight is used. When midnight falls
/// into a spring-forward gap, 1am is used instead.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            let one_am = midnight + TimeDelta::hours(1);
            tz.from_local_datetime(&one_am).earliest()
        })
        .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc))
}

/// Half-open UTC bounds `[start, end)` of a local calendar day.
pub fn day_bounds<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (local_midnight(tz, date), local_midnight(tz, next))
}

/// The local calendar date of an instant.
pub fn local_date<Tz: TimeZone>(tz: &Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_starts_on_monday_by_default() {
        // Jan 29, 2025 is a Wednesday
        let wednesday = date(2025, 1, 29);
        assert_eq!(period_start(Period::Week, wednesday, Weekday::Mon), date(2025, 1, 27));
        assert_eq!(period_start(Period::Week, date(2025, 1, 27), Weekday::Mon), date(2025, 1, 27));
        assert_eq!(period_start(Period::Week, date(2025, 2, 2), Weekday::Mon), date(2025, 1, 27));
    }

    #[test]
    fn week_start_is_configurable() {
        let wednesday = date(2025, 1, 29);
        assert_eq!(period_start(Period::Week, wednesday, Weekday::Sun), date(2025, 1, 26));
        assert_eq!(period_start(Period::Week, wednesday, Weekday::Thu), date(2025, 1, 23));
        assert_eq!(period_start(Period::Week, wednesday, Weekday::Wed), wednesday);
    }

    #[test]
    fn month_and_year_start() {
        let today = date(2024, 3, 17);
        assert_eq!(period_start(Period::Day, today, Weekday::Mon), today);
        assert_eq!(period_start(Period::Month, today, Weekday::Mon), date(2024, 3, 1));
        assert_eq!(period_start(Period::Year, today, Weekday::Mon), date(2024, 1, 1));
    }

    #[test]
    fn midnight_in_fixed_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let midnight = local_midnight(&tz, date(2023, 1, 2));
        assert_eq!(midnight, Utc.with_ymd_and_hms(2023, 1, 1, 22, 0, 0).unwrap());
        assert_eq!(local_date(&tz, midnight), date(2023, 1, 2));
    }

    #[test]
    fn day_bounds_span_one_day() {
        let (start, end) = day_bounds(&Utc, date(2023, 1, 1));
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end - start, TimeDelta::days(1));
    }
}
