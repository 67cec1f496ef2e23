//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{
    DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, TimeZone, Utc,
};
use regex::Regex;
use tt_core::{normalize_tags, project_name};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").expect("relative time pattern is valid")
});

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Parse a datetime argument in the local timezone.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Local date and time: "2026-01-15 10:30", "2026-01-15T10:30:00"
/// - Local date, meaning its midnight: "2026-01-15"
/// - Time of day, meaning today: "10:30"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    parse_datetime_in(s, now, &Local)
}

/// [`parse_datetime`] with an explicit timezone for the local forms.
pub fn parse_datetime_in<Tz: TimeZone>(s: &str, now: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }

    if let Some(naive) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    {
        return from_local(tz, naive, s);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return from_local(tz, date.and_time(NaiveTime::MIN), s);
    }

    if let Some(time) = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
    {
        let today = now.with_timezone(tz).date_naive();
        return from_local(tz, today.and_time(time), s);
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z), a local date and time (e.g., '2026-01-15 10:30'), a time of day (e.g., 10:30) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    // Safe to create the delta now that we've validated the range
    Ok(now - TimeDelta::minutes(n * minutes_per_unit))
}

fn from_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, input: &str) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{input} does not exist in the local timezone"))
}

/// Formats a duration as "Xh Ym" if >= 1 hour, "Xm" otherwise.
/// Negative durations are treated as 0m.
pub fn format_duration(duration: TimeDelta) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Renders tags as " [a, b]", or nothing when there are none.
pub fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    }
}

/// Splits `PROJECT [+TAG ...]` arguments.
///
/// Words before the first `+` form the project name. Each `+` starts a tag,
/// so `+code review` is the single tag "code review".
pub fn parse_project_and_tags(words: &[String]) -> Result<(String, Vec<String>)> {
    let mut project = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    for word in words {
        if let Some(tag) = word.strip_prefix('+') {
            tags.push(tag.to_string());
        } else if let Some(current) = tags.last_mut() {
            current.push(' ');
            current.push_str(word);
        } else {
            project.push(word.as_str());
        }
    }
    let project = project_name(&project.join(" "))?;
    Ok((project, normalize_tags(tags)))
}

/// Formats an instant as a local wall-clock time.
pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

/// Formats an instant as a local date and time.
pub fn local_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
