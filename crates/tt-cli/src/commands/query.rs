//! Date range and filter options shared by the reporting commands.

use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};
use clap::Args;
use tt_core::{FrameFilter, FrameQuery, FrameStore, Period, local_midnight, period_start};

use super::util::parse_datetime;

/// Days covered when no range is given, today included.
const DEFAULT_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// Start of the range (default: a week ago).
    #[arg(short, long)]
    pub from: Option<String>,

    /// End of the range (default: now).
    #[arg(short, long)]
    pub to: Option<String>,

    /// Today only.
    #[arg(long, group = "period")]
    pub day: bool,

    /// The current week.
    #[arg(long, group = "period")]
    pub week: bool,

    /// The current month.
    #[arg(long, group = "period")]
    pub month: bool,

    /// The current year.
    #[arg(long, group = "period")]
    pub year: bool,

    /// Everything ever recorded.
    #[arg(long, group = "period")]
    pub all: bool,
}

impl RangeArgs {
    fn period(&self) -> Option<Period> {
        if self.day {
            Some(Period::Day)
        } else if self.week {
            Some(Period::Week)
        } else if self.month {
            Some(Period::Month)
        } else if self.year {
            Some(Period::Year)
        } else {
            None
        }
    }

    /// Resolves the range to UTC instants.
    ///
    /// A period or `--all` overrides `--from`/`--to`.
    pub fn resolve(
        &self,
        store: &FrameStore,
        include_current: bool,
        now: DateTime<Utc>,
        week_start: Weekday,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        resolve_in(self, store, include_current, now, week_start, &Local)
    }
}

fn resolve_in<Tz: TimeZone>(
    range: &RangeArgs,
    store: &FrameStore,
    include_current: bool,
    now: DateTime<Utc>,
    week_start: Weekday,
    tz: &Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let today = now.with_timezone(tz).date_naive();

    if range.all {
        return Ok(store.span(include_current, now).unwrap_or((now, now)));
    }
    if let Some(period) = range.period() {
        let start = period_start(period, today, week_start);
        return Ok((local_midnight(tz, start), now));
    }

    let from = match &range.from {
        Some(from) => parse_datetime(from, now)?,
        None => local_midnight(tz, today - TimeDelta::days(DEFAULT_DAYS - 1)),
    };
    let to = match &range.to {
        Some(to) => parse_datetime(to, now)?,
        None => now,
    };
    if from > to {
        bail!("'from' must be before 'to'");
    }
    Ok((from, to))
}

/// Project and tag filters.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only frames of this project (repeatable).
    #[arg(short = 'p', long = "project")]
    pub projects: Vec<String>,

    /// Skip frames of this project (repeatable).
    #[arg(short = 'P', long = "ignore-project")]
    pub exclude_projects: Vec<String>,

    /// Only frames with this tag (repeatable).
    #[arg(short = 'a', long = "tag")]
    pub tags: Vec<String>,

    /// Skip frames with this tag (repeatable).
    #[arg(short = 'A', long = "ignore-tag")]
    pub exclude_tags: Vec<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> FrameFilter {
        FrameFilter {
            projects: self.projects.clone(),
            exclude_projects: self.exclude_projects.clone(),
            tags: self.tags.clone(),
            exclude_tags: self.exclude_tags.clone(),
        }
    }
}

/// Whether to count the running frame.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct CurrentArgs {
    /// Include the running frame.
    #[arg(long, overrides_with = "no_current")]
    pub current: bool,

    /// Leave the running frame out.
    #[arg(long)]
    pub no_current: bool,
}

impl CurrentArgs {
    /// The flags, falling back to the configured default.
    pub const fn include(self, default: bool) -> bool {
        if self.current {
            true
        } else if self.no_current {
            false
        } else {
            default
        }
    }
}

/// Builds the frame query for a resolved range.
pub fn frame_query(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    filters: &FilterArgs,
    include_current: bool,
) -> FrameQuery {
    FrameQuery::new(from, to)
        .with_filter(filters.to_filter())
        .include_current(include_current)
}

/// Local calendar days covered by a range.
pub fn local_days(from: DateTime<Utc>, to: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    (
        from.with_timezone(&Local).date_naive(),
        to.with_timezone(&Local).date_naive(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        // A Wednesday
        Utc.with_ymd_and_hms(2025, 1, 29, 15, 0, 0).unwrap()
    }

    fn store() -> FrameStore {
        let mut store = FrameStore::new();
        store
            .add(
                "p1",
                &[],
                Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
                Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()),
                now(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_default_range_is_last_seven_days() {
        let (from, to) = resolve_in(&RangeArgs::default(), &store(), false, now(), Weekday::Mon, &Utc).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 23, 0, 0, 0).unwrap());
        assert_eq!(to, now());
    }

    #[test]
    fn test_week_range_honors_week_start() {
        let range = RangeArgs {
            week: true,
            ..RangeArgs::default()
        };
        let (from, _) = resolve_in(&range, &store(), false, now(), Weekday::Mon, &Utc).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 27, 0, 0, 0).unwrap());

        let (from, _) = resolve_in(&range, &store(), false, now(), Weekday::Sun, &Utc).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 26, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_all_covers_every_frame() {
        let range = RangeArgs {
            all: true,
            ..RangeArgs::default()
        };
        let (from, to) = resolve_in(&range, &store(), false, now(), Weekday::Mon, &Utc).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_explicit_range_must_be_ordered() {
        let range = RangeArgs {
            from: Some("2025-01-10T00:00:00Z".to_string()),
            to: Some("2025-01-01T00:00:00Z".to_string()),
            ..RangeArgs::default()
        };
        assert!(resolve_in(&range, &store(), false, now(), Weekday::Mon, &Utc).is_err());
    }

    #[test]
    fn test_current_flags() {
        assert!(CurrentArgs::default().include(true));
        assert!(!CurrentArgs::default().include(false));
        let on = CurrentArgs {
            current: true,
            no_current: false,
        };
        assert!(on.include(false));
        let off = CurrentArgs {
            current: false,
            no_current: true,
        };
        assert!(!off.include(true));
    }
}
