//! Frames - recorded or running intervals of work.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FrameId, ValidationError, normalize_tags, project_name};

/// One tracked interval of work on a project.
///
/// `stop` is `None` while the frame is running. Timestamps are kept at whole
/// second precision, which is what the frames file stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier, fixed at creation.
    pub id: FrameId,

    /// Project name (never empty).
    pub project: String,

    /// Tags in insertion order, without duplicates.
    #[serde(default)]
    pub tags: Vec<String>,

    /// When work started.
    pub start: DateTime<Utc>,

    /// When work stopped; absent while running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,

    /// Last modification time, used to break merge ties.
    pub updated_at: DateTime<Utc>,
}

impl Frame {
    /// Builds a frame from already-known parts, validating every invariant.
    ///
    /// Used when restoring frames from storage or from another store.
    pub fn restore(
        id: FrameId,
        project: &str,
        tags: Vec<String>,
        start: DateTime<Utc>,
        stop: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let project = project_name(project)?;
        let start = start.trunc_subsecs(0);
        let stop = stop.map(|stop| stop.trunc_subsecs(0));
        check_order(start, stop)?;
        Ok(Self {
            id,
            project,
            tags: normalize_tags(tags),
            start,
            stop,
            updated_at: updated_at.trunc_subsecs(0),
        })
    }

    /// Whether the frame is still running.
    pub const fn is_active(&self) -> bool {
        self.stop.is_none()
    }

    /// End of the frame, substituting `now` for a running frame.
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.stop.unwrap_or(now)
    }

    /// Elapsed time, measuring a running frame up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.end_or(now) - self.start).max(TimeDelta::zero())
    }

    /// Whether the frame carries the tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether `[start, stop)` intersects the closed range `[from, to]`.
    ///
    /// Zero-length frames match when their instant lies inside the range.
    pub fn intersects(&self, from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let end = self.end_or(now);
        if end == self.start {
            return from <= self.start && self.start <= to;
        }
        self.start <= to && end > from
    }

    /// Whether two frames on the same project cover overlapping time.
    pub fn overlaps(&self, other: &Self, now: DateTime<Utc>) -> bool {
        let (a_end, b_end) = (self.end_or(now), other.end_or(now));
        if self.start == a_end || other.start == b_end {
            return self.start == other.start;
        }
        self.start < b_end && other.start < a_end
    }

    /// Compares the user-visible fields, ignoring `id` and `updated_at`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.project == other.project
            && self.tags == other.tags
            && self.start == other.start
            && self.stop == other.stop
    }
}

/// Replacement values for the mutable fields of a frame.
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    pub project: Option<String>,
    pub tags: Option<Vec<String>>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
}

impl FrameUpdate {
    /// Whether the update changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.project.is_none() && self.tags.is_none() && self.start.is_none() && self.stop.is_none()
    }
}

pub(crate) fn check_order(
    start: DateTime<Utc>,
    stop: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    match stop {
        Some(stop) if stop < start => Err(ValidationError::StopBeforeStart { start, stop }),
        _ => Ok(()),
    }
}
