//! Aggregation of frames into totals.
//!
//! [`ReportEngine::report`] sums whole frames over a range, per project and
//! tag. [`ReportEngine::aggregate`] breaks the same totals down per local
//! calendar day. Neither reads configuration: whether the running frame
//! counts is decided by the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::error::TrackerError;
use crate::frame::Frame;
use crate::period::{day_bounds, local_date, local_midnight};
use crate::store::{FrameFilter, FrameQuery, FrameStore};
use crate::types::ValidationError;

/// How a frame crossing local midnight is counted in daily aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DayAttribution {
    /// The whole frame counts on the day it started.
    #[default]
    StartDay,
    /// The frame is cut at each midnight and every day gets its share.
    Split,
}

/// Time spent on one project with one exact tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    pub project: String,
    pub tags: Vec<String>,
    #[serde(rename = "time", serialize_with = "as_seconds")]
    pub duration: TimeDelta,
}

/// Every bucket of one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    #[serde(rename = "time", serialize_with = "as_seconds")]
    pub total: TimeDelta,
    pub entries: Vec<AggregateEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagTotal {
    pub name: String,
    #[serde(serialize_with = "as_seconds")]
    pub time: TimeDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTotal {
    pub name: String,
    #[serde(serialize_with = "as_seconds")]
    pub time: TimeDelta,
    pub tags: Vec<TagTotal>,
}

/// Flat totals over a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(rename = "time", serialize_with = "as_seconds")]
    pub total: TimeDelta,
    pub projects: Vec<ProjectTotal>,
    pub tags: Vec<TagTotal>,
}

fn as_seconds<S: Serializer>(duration: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_seconds())
}

/// Computes reports over a store as seen from one timezone at one instant.
pub struct ReportEngine<'a, Tz: TimeZone> {
    store: &'a FrameStore,
    tz: Tz,
    now: DateTime<Utc>,
}

impl<'a, Tz: TimeZone> ReportEngine<'a, Tz> {
    pub const fn new(store: &'a FrameStore, tz: Tz, now: DateTime<Utc>) -> Self {
        Self { store, tz, now }
    }

    /// Per-project and per-tag totals of every frame the query selects.
    ///
    /// Frames count in full even when they stick out of the range. When the
    /// query filters on tags, the per-project breakdown only lists those.
    pub fn report(&self, query: &FrameQuery) -> Result<Report, TrackerError> {
        let frames = self.store.filter(query, self.now)?;

        let mut total = TimeDelta::zero();
        let mut projects: BTreeMap<&str, (TimeDelta, BTreeMap<&str, TimeDelta>)> = BTreeMap::new();
        let mut tags: BTreeMap<&str, TimeDelta> = BTreeMap::new();

        for frame in &frames {
            let duration = frame.duration(self.now);
            total += duration;
            let (project_time, project_tags) = projects
                .entry(&frame.project)
                .or_insert_with(|| (TimeDelta::zero(), BTreeMap::new()));
            *project_time += duration;
            for tag in &frame.tags {
                *tags.entry(tag).or_insert(TimeDelta::zero()) += duration;
                if query.filter.tags.is_empty() || query.filter.tags.contains(tag) {
                    *project_tags.entry(tag).or_insert(TimeDelta::zero()) += duration;
                }
            }
        }

        let to_totals = |map: BTreeMap<&str, TimeDelta>| -> Vec<TagTotal> {
            map.into_iter()
                .map(|(name, time)| TagTotal {
                    name: name.to_string(),
                    time,
                })
                .collect()
        };

        Ok(Report {
            from: query.from,
            to: query.to,
            total,
            projects: projects
                .into_iter()
                .map(|(name, (time, tags))| ProjectTotal {
                    name: name.to_string(),
                    time,
                    tags: to_totals(tags),
                })
                .collect(),
            tags: to_totals(tags),
        })
    }

    /// Day-by-day totals for `[from_day, to_day]`, summed per project and tag
    /// set. Days without tracked time are left out.
    pub fn aggregate(
        &self,
        from_day: NaiveDate,
        to_day: NaiveDate,
        filter: &FrameFilter,
        include_current: bool,
        attribution: DayAttribution,
    ) -> Result<Vec<DailyAggregate>, TrackerError> {
        let from = local_midnight(&self.tz, from_day);
        let (_, end) = day_bounds(&self.tz, to_day);
        if from_day > to_day {
            return Err(ValidationError::InvertedRange { from, to: end }.into());
        }

        let query = FrameQuery::new(from, end - TimeDelta::seconds(1))
            .with_filter(filter.clone())
            .include_current(include_current);
        let frames = self.store.filter(&query, self.now)?;

        let mut days: BTreeMap<NaiveDate, BTreeMap<(String, Vec<String>), TimeDelta>> = BTreeMap::new();
        for frame in &frames {
            let mut tags = frame.tags.clone();
            tags.sort();
            for (day, duration) in self.attribute(frame, attribution) {
                if day < from_day || day > to_day || duration <= TimeDelta::zero() {
                    continue;
                }
                *days
                    .entry(day)
                    .or_default()
                    .entry((frame.project.clone(), tags.clone()))
                    .or_insert(TimeDelta::zero()) += duration;
            }
        }

        tracing::debug!(days = days.len(), frames = frames.len(), ?attribution, "aggregated frames");
        Ok(days
            .into_iter()
            .map(|(date, buckets)| {
                let entries: Vec<AggregateEntry> = buckets
                    .into_iter()
                    .map(|((project, tags), duration)| AggregateEntry {
                        project,
                        tags,
                        duration,
                    })
                    .collect();
                let total = entries
                    .iter()
                    .fold(TimeDelta::zero(), |sum, entry| sum + entry.duration);
                DailyAggregate { date, total, entries }
            })
            .collect())
    }

    /// The days a frame's time belongs to, with the share of each.
    fn attribute(&self, frame: &Frame, attribution: DayAttribution) -> Vec<(NaiveDate, TimeDelta)> {
        let start_day = local_date(&self.tz, frame.start);
        let end = frame.end_or(self.now);
        match attribution {
            DayAttribution::StartDay => vec![(start_day, frame.duration(self.now))],
            DayAttribution::Split => {
                let mut shares = Vec::new();
                let mut day = start_day;
                let mut cursor = frame.start;
                while cursor < end {
                    let (_, next_midnight) = day_bounds(&self.tz, day);
                    let piece_end = end.min(next_midnight);
                    if piece_end > cursor {
                        shares.push((day, piece_end - cursor));
                        cursor = piece_end;
                    }
                    match day.succ_opt() {
                        Some(next) => day = next,
                        None => break,
                    }
                }
                shares
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::FixedOffset;

    use crate::types::FrameId;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, minute, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, day).unwrap()
    }

    fn frame(id: &str, project: &str, tags: &[&str], start: DateTime<Utc>, stop: Option<DateTime<Utc>>) -> Frame {
        Frame::restore(
            FrameId::new(id).unwrap(),
            project,
            tags.iter().map(|t| (*t).to_string()).collect(),
            start,
            stop,
            start,
        )
        .unwrap()
    }

    fn sample() -> FrameStore {
        FrameStore::from_frames(vec![
            frame("a", "p1", &["x"], at(2, 9, 0), Some(at(2, 9, 30))),
            frame("b", "p1", &["x"], at(2, 10, 0), Some(at(2, 10, 45))),
            frame("c", "p2", &[], at(2, 11, 0), Some(at(2, 11, 15))),
        ])
        .unwrap()
    }

    #[test]
    fn aggregate_sums_one_day() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let days = engine
            .aggregate(date(2), date(2), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, date(2));
        assert_eq!(days[0].total, TimeDelta::minutes(90));
        let entries: Vec<(&str, TimeDelta)> = days[0]
            .entries
            .iter()
            .map(|entry| (entry.project.as_str(), entry.duration))
            .collect();
        assert_eq!(
            entries,
            vec![("p1", TimeDelta::minutes(75)), ("p2", TimeDelta::minutes(15))]
        );
    }

    #[test]
    fn aggregate_omits_empty_days() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let days = engine
            .aggregate(date(1), date(5), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        assert_eq!(days.iter().map(|d| d.date).collect::<Vec<_>>(), vec![date(2)]);
    }

    #[test]
    fn aggregate_buckets_by_tag_set() {
        let store = FrameStore::from_frames(vec![
            frame("a", "p1", &["x", "y"], at(2, 9, 0), Some(at(2, 10, 0))),
            frame("b", "p1", &["y", "x"], at(2, 10, 0), Some(at(2, 10, 30))),
            frame("c", "p1", &["x"], at(2, 11, 0), Some(at(2, 11, 10))),
        ])
        .unwrap();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let days = engine
            .aggregate(date(2), date(2), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        let entries = &days[0].entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tags, vec!["x"]);
        assert_eq!(entries[0].duration, TimeDelta::minutes(10));
        assert_eq!(entries[1].tags, vec!["x", "y"]);
        assert_eq!(entries[1].duration, TimeDelta::minutes(90));
    }

    #[test]
    fn frame_crossing_midnight_counts_on_start_day() {
        let store =
            FrameStore::from_frames(vec![frame("a", "p1", &[], at(2, 23, 0), Some(at(3, 1, 0)))]).unwrap();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let days = engine
            .aggregate(date(2), date(3), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, date(2));
        assert_eq!(days[0].total, TimeDelta::hours(2));

        // Queried alone, the second day sees nothing of it.
        let days = engine
            .aggregate(date(3), date(3), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn frame_crossing_midnight_is_split_when_asked() {
        let store =
            FrameStore::from_frames(vec![frame("a", "p1", &[], at(2, 23, 0), Some(at(3, 1, 0)))]).unwrap();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let days = engine
            .aggregate(date(2), date(3), &FrameFilter::default(), false, DayAttribution::Split)
            .unwrap();
        let totals: Vec<(NaiveDate, TimeDelta)> = days.iter().map(|d| (d.date, d.total)).collect();
        assert_eq!(
            totals,
            vec![(date(2), TimeDelta::hours(1)), (date(3), TimeDelta::hours(1))]
        );

        let days = engine
            .aggregate(date(3), date(3), &FrameFilter::default(), false, DayAttribution::Split)
            .unwrap();
        assert_eq!(days[0].total, TimeDelta::hours(1));
    }

    #[test]
    fn day_boundaries_follow_the_timezone() {
        // 23:00 UTC on the 2nd is 01:00 on the 3rd at UTC+2.
        let store =
            FrameStore::from_frames(vec![frame("a", "p1", &[], at(2, 23, 0), Some(at(2, 23, 30)))]).unwrap();
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let engine = ReportEngine::new(&store, tz, at(20, 0, 0));

        let days = engine
            .aggregate(date(1), date(5), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        assert_eq!(days[0].date, date(3));
    }

    #[test]
    fn aggregate_includes_running_frame_only_when_asked() {
        let store = FrameStore::from_frames(vec![frame("a", "p1", &[], at(2, 9, 0), None)]).unwrap();
        let engine = ReportEngine::new(&store, Utc, at(2, 10, 0));

        let without = engine
            .aggregate(date(2), date(2), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap();
        assert!(without.is_empty());

        let with = engine
            .aggregate(date(2), date(2), &FrameFilter::default(), true, DayAttribution::StartDay)
            .unwrap();
        assert_eq!(with[0].total, TimeDelta::hours(1));
    }

    #[test]
    fn aggregate_rejects_inverted_days() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));
        let err = engine
            .aggregate(date(3), date(2), &FrameFilter::default(), false, DayAttribution::StartDay)
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn report_totals_projects_and_tags() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let report = engine.report(&FrameQuery::new(at(1, 0, 0), at(20, 0, 0))).unwrap();

        assert_eq!(report.total, TimeDelta::minutes(90));
        assert_eq!(report.projects.len(), 2);
        assert_eq!(report.projects[0].name, "p1");
        assert_eq!(report.projects[0].time, TimeDelta::minutes(75));
        assert_eq!(report.projects[0].tags[0].name, "x");
        assert_eq!(report.projects[1].time, TimeDelta::minutes(15));
        assert!(report.projects[1].tags.is_empty());
        assert_eq!(report.tags.len(), 1);
        assert_eq!(report.tags[0].time, TimeDelta::minutes(75));
    }

    #[test]
    fn report_counts_whole_frames_at_range_edges() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));

        let report = engine
            .report(&FrameQuery::new(at(2, 10, 30), at(2, 11, 5)))
            .unwrap();
        assert_eq!(report.total, TimeDelta::minutes(60));
    }

    #[test]
    fn report_tag_filter_excludes_tagged_frames() {
        let store = FrameStore::from_frames(vec![
            frame("a", "p1", &["x"], at(2, 9, 0), Some(at(2, 10, 0))),
            frame("b", "p1", &["x", "y"], at(2, 10, 0), Some(at(2, 11, 0))),
            frame("c", "p2", &["z"], at(2, 11, 0), Some(at(2, 12, 0))),
        ])
        .unwrap();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));
        let filter = FrameFilter {
            tags: vec!["x".to_string()],
            exclude_tags: vec!["y".to_string()],
            ..FrameFilter::default()
        };

        let report = engine
            .report(&FrameQuery::new(at(1, 0, 0), at(20, 0, 0)).with_filter(filter))
            .unwrap();
        assert_eq!(report.total, TimeDelta::hours(1));
        assert_eq!(report.projects.len(), 1);
    }

    #[test]
    fn report_serializes_seconds() {
        let store = sample();
        let engine = ReportEngine::new(&store, Utc, at(20, 0, 0));
        let report = engine.report(&FrameQuery::new(at(1, 0, 0), at(20, 0, 0))).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["time"], 5400);
        assert_eq!(json["projects"][0]["name"], "p1");
        assert_eq!(json["projects"][0]["time"], 4500);
        assert_eq!(json["projects"][0]["tags"][0]["time"], 4500);
    }
}
