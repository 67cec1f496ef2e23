//! In-memory frame store.
//!
//! A [`FrameStore`] keeps stopped frames in insertion order plus a single
//! slot for the running frame. Keeping the running frame in its own slot is
//! what guarantees that at most one frame lacks a stop time.
//!
//! Frames are addressed through a [`FrameRef`]: a full id, an unambiguous id
//! prefix, or a position in the stopped sequence (negative positions count
//! from the end, so `-1` is the most recent frame).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::TrackerError;
use crate::frame::{Frame, FrameUpdate, check_order};
use crate::id::generate_id;
use crate::types::{FrameId, ValidationError, normalize_tags, project_name};

/// A way of pointing at a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRef {
    /// Position in the stopped sequence; negative values count from the end.
    Index(isize),
    /// Full id or unambiguous id prefix.
    Id(String),
}

impl FrameRef {
    /// The most recently stopped frame.
    pub const LAST: Self = Self::Index(-1);
}

impl FromStr for FrameRef {
    type Err = std::convert::Infallible;

    /// Negative integers are positions; anything else is an id, since a
    /// non-negative number could just as well be an id made of digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<isize>() {
            Ok(index) if index < 0 => Ok(Self::Index(index)),
            _ => Ok(Self::Id(s.to_string())),
        }
    }
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "index {index}"),
            Self::Id(id) => write!(f, "id {id}"),
        }
    }
}

impl From<&FrameId> for FrameRef {
    fn from(id: &FrameId) -> Self {
        Self::Id(id.as_str().to_string())
    }
}

/// Structural problems found when assembling a store from existing frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Two frames share an id.
    #[error("duplicate frame id {0}")]
    DuplicateId(FrameId),

    /// More than one frame has no stop time.
    #[error("more than one running frame ({first} and {second})")]
    MultipleActive { first: FrameId, second: FrameId },
}

/// Project and tag criteria. Includes are OR'd, excludes AND-NOT'd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFilter {
    pub projects: Vec<String>,
    pub exclude_projects: Vec<String>,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
}

impl FrameFilter {
    /// Rejects values that are both included and excluded.
    pub fn validate(&self) -> Result<(), ValidationError> {
        contradiction("project", &self.projects, &self.exclude_projects)?;
        contradiction("tag", &self.tags, &self.exclude_tags)
    }

    /// Whether the frame passes every criterion.
    pub fn matches(&self, frame: &Frame) -> bool {
        if !self.projects.is_empty() && !self.projects.contains(&frame.project) {
            return false;
        }
        if self.exclude_projects.contains(&frame.project) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| frame.has_tag(tag)) {
            return false;
        }
        !self.exclude_tags.iter().any(|tag| frame.has_tag(tag))
    }
}

fn contradiction(
    kind: &'static str,
    included: &[String],
    excluded: &[String],
) -> Result<(), ValidationError> {
    match included.iter().find(|value| excluded.contains(value)) {
        Some(value) => Err(ValidationError::ContradictoryFilter {
            kind,
            value: value.clone(),
        }),
        None => Ok(()),
    }
}

/// A time range plus filter criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub filter: FrameFilter,
    /// Include the running frame, measured up to "now".
    pub include_current: bool,
    /// Sort results by start time instead of store order.
    pub chronological: bool,
}

impl FrameQuery {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            filter: FrameFilter::default(),
            include_current: false,
            chronological: false,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FrameFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub const fn include_current(mut self, include: bool) -> Self {
        self.include_current = include;
        self
    }

    #[must_use]
    pub const fn chronological(mut self, chronological: bool) -> Self {
        self.chronological = chronological;
        self
    }

    /// Checks the range and the filter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from > self.to {
            return Err(ValidationError::InvertedRange {
                from: self.from,
                to: self.to,
            });
        }
        self.filter.validate()
    }
}

/// Where a resolved reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Stopped(usize),
    Active,
}

/// Ordered collection of frames with one running-frame slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStore {
    frames: Vec<Frame>,
    active: Option<Frame>,
    frames_changed: bool,
    active_changed: bool,
}

impl FrameStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a store from frames loaded elsewhere.
    ///
    /// At most one frame may lack a stop time; it becomes the running frame.
    /// The store starts out unchanged.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self, IntegrityError> {
        let mut seen = HashSet::new();
        let mut stopped = Vec::with_capacity(frames.len());
        let mut active: Option<Frame> = None;

        for frame in frames {
            if !seen.insert(frame.id.clone()) {
                return Err(IntegrityError::DuplicateId(frame.id));
            }
            if frame.is_active() {
                if let Some(first) = &active {
                    return Err(IntegrityError::MultipleActive {
                        first: first.id.clone(),
                        second: frame.id,
                    });
                }
                active = Some(frame);
            } else {
                stopped.push(frame);
            }
        }

        Ok(Self {
            frames: stopped,
            active,
            frames_changed: false,
            active_changed: false,
        })
    }

    /// Number of stopped frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the store holds no frame at all, running or stopped.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.active.is_none()
    }

    /// Stopped frames in store order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The running frame, if any.
    pub const fn active(&self) -> Option<&Frame> {
        self.active.as_ref()
    }

    pub const fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// The most recently stored stopped frame.
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Whether any frame, running or stopped, has exactly this id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.all().any(|frame| frame.id.as_str() == id)
    }

    /// Whether the stopped sequence changed since load or the last save.
    pub const fn frames_changed(&self) -> bool {
        self.frames_changed
    }

    /// Whether the running-frame slot changed since load or the last save.
    pub const fn active_changed(&self) -> bool {
        self.active_changed
    }

    /// Clears the change flags after a successful save.
    pub fn mark_saved(&mut self) {
        self.frames_changed = false;
        self.active_changed = false;
    }

    /// Marks the stopped sequence as changed so it gets rewritten.
    pub fn mark_frames_changed(&mut self) {
        self.frames_changed = true;
    }

    /// Marks the running-frame slot as changed so it gets rewritten.
    pub fn mark_active_changed(&mut self) {
        self.active_changed = true;
    }

    fn all(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().chain(self.active.iter())
    }

    /// Generates an id unused in this store.
    pub fn next_id(&self, project: &str, start: DateTime<Utc>) -> Result<FrameId, TrackerError> {
        generate_id(project, start, |candidate| self.contains_id(candidate))
    }

    /// Records a new frame.
    ///
    /// Without `stop` the frame becomes the running frame, which requires the
    /// slot to be free.
    pub fn add(
        &mut self,
        project: &str,
        tags: &[String],
        start: DateTime<Utc>,
        stop: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Frame, TrackerError> {
        let project = project_name(project)?;
        check_order(start, stop)?;
        if stop.is_none() {
            self.ensure_idle()?;
        }

        let id = self.next_id(&project, start)?;
        let frame = Frame::restore(id, &project, tags.to_vec(), start, stop, now)?;
        tracing::debug!(id = %frame.id, project = %frame.project, running = frame.is_active(), "adding frame");

        if frame.is_active() {
            self.set_active(Some(frame.clone()));
        } else {
            self.frames.push(frame.clone());
            self.frames_changed = true;
        }
        Ok(frame)
    }

    /// Appends a frame that already has an id, such as one taken from another
    /// store during a merge.
    pub fn insert(&mut self, frame: Frame) -> Result<(), TrackerError> {
        if self.contains_id(frame.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: frame.id.to_string(),
            }
            .into());
        }
        if frame.is_active() {
            self.ensure_idle()?;
            self.set_active(Some(frame));
        } else {
            self.frames.push(frame);
            self.frames_changed = true;
        }
        Ok(())
    }

    /// Looks a frame up by id, id prefix or position.
    pub fn get(&self, reference: &FrameRef) -> Result<&Frame, TrackerError> {
        Ok(match self.resolve(reference)? {
            Slot::Stopped(index) => &self.frames[index],
            Slot::Active => self
                .active
                .as_ref()
                .ok_or(TrackerError::NoActiveFrame)?,
        })
    }

    /// Replaces the mutable fields of a frame and bumps its `updated_at`.
    pub fn update(
        &mut self,
        reference: &FrameRef,
        update: FrameUpdate,
        now: DateTime<Utc>,
    ) -> Result<Frame, TrackerError> {
        let slot = self.resolve(reference)?;
        let current = match slot {
            Slot::Stopped(index) => &self.frames[index],
            Slot::Active => self.active.as_ref().ok_or(TrackerError::NoActiveFrame)?,
        };

        if current.is_active() && update.stop.is_some() {
            return Err(ValidationError::StopOnActiveFrame.into());
        }
        for (field, value) in [("start", update.start), ("stop", update.stop)] {
            if let Some(at) = value.filter(|at| *at > now) {
                return Err(ValidationError::InFuture { field, at }.into());
            }
        }

        let project = match &update.project {
            Some(project) => project_name(project)?,
            None => current.project.clone(),
        };
        let tags = update
            .tags
            .map_or_else(|| current.tags.clone(), normalize_tags);
        let start = update.start.unwrap_or(current.start);
        let stop = update.stop.or(current.stop);

        let updated = Frame::restore(current.id.clone(), &project, tags, start, stop, now)?;
        tracing::debug!(id = %updated.id, "updating frame");

        match slot {
            Slot::Stopped(index) => {
                self.frames[index] = updated.clone();
                self.frames_changed = true;
            }
            Slot::Active => self.set_active(Some(updated.clone())),
        }
        Ok(updated)
    }

    /// Deletes a frame, running or stopped, and returns it.
    pub fn remove(&mut self, reference: &FrameRef) -> Result<Frame, TrackerError> {
        let removed = match self.resolve(reference)? {
            Slot::Stopped(index) => {
                self.frames_changed = true;
                self.frames.remove(index)
            }
            Slot::Active => self.take_active()?,
        };
        tracing::debug!(id = %removed.id, "removed frame");
        Ok(removed)
    }

    /// Frames intersecting the query range that pass its filter.
    ///
    /// The running frame is only considered when the query asks for it, and
    /// comes back with its stop still absent.
    pub fn filter(&self, query: &FrameQuery, now: DateTime<Utc>) -> Result<Vec<Frame>, TrackerError> {
        query.validate()?;

        let active = self.active.iter().filter(|_| query.include_current);
        let mut selected: Vec<Frame> = self
            .frames
            .iter()
            .chain(active)
            .filter(|frame| query.filter.matches(frame))
            .filter(|frame| frame.intersects(query.from, query.to, now))
            .cloned()
            .collect();

        if query.chronological {
            selected.sort_by_key(|frame| frame.start);
        }
        Ok(selected)
    }

    /// Earliest start and latest stop across frames, optionally counting the
    /// running frame up to `now`.
    pub fn span(&self, include_current: bool, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let active = self.active.iter().filter(|_| include_current);
        self.frames
            .iter()
            .chain(active)
            .fold(None, |span, frame| {
                let end = frame.end_or(now);
                Some(match span {
                    None => (frame.start, end),
                    Some((start, stop)) => (start.min(frame.start), stop.max(end)),
                })
            })
    }

    /// The most recent stopped frame of a project.
    pub fn latest_for_project(&self, project: &str) -> Option<&Frame> {
        self.frames.iter().rev().find(|frame| frame.project == project)
    }

    /// Sorted project names; with tags given, only projects carrying every
    /// one of them.
    pub fn projects(&self, tags: &[String]) -> Vec<String> {
        let mut projects = BTreeSet::new();
        let mut tagged: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for frame in self.all() {
            if !tags.is_empty() && !tags.iter().any(|tag| frame.has_tag(tag)) {
                continue;
            }
            projects.insert(frame.project.as_str());
            for tag in &frame.tags {
                tagged.entry(tag).or_default().insert(frame.project.as_str());
            }
        }
        projects
            .into_iter()
            .filter(|project| {
                tags.iter().all(|tag| {
                    tagged
                        .get(tag.as_str())
                        .is_some_and(|carriers| carriers.contains(project))
                })
            })
            .map(str::to_string)
            .collect()
    }

    /// Sorted tag names; with projects given, only tags used in every one of
    /// them.
    pub fn tags(&self, projects: &[String]) -> Vec<String> {
        let mut tags = BTreeSet::new();
        let mut by_project: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for frame in self.all() {
            if !projects.is_empty() && !projects.contains(&frame.project) {
                continue;
            }
            for tag in &frame.tags {
                tags.insert(tag.as_str());
                by_project.entry(&frame.project).or_default().insert(tag);
            }
        }
        tags.into_iter()
            .filter(|tag| {
                projects.iter().all(|project| {
                    by_project
                        .get(project.as_str())
                        .is_some_and(|used| used.contains(tag))
                })
            })
            .map(str::to_string)
            .collect()
    }

    /// Renames a project on every frame. Returns how many frames changed.
    pub fn rename_project(&mut self, old: &str, new: &str, now: DateTime<Utc>) -> Result<usize, TrackerError> {
        let new = project_name(new)?;
        let renamed = self.rewrite(now, |frame| {
            if frame.project == old {
                frame.project.clone_from(&new);
                true
            } else {
                false
            }
        });
        if renamed == 0 {
            return Err(TrackerError::NotFound {
                reference: format!("project {old}"),
            });
        }
        Ok(renamed)
    }

    /// Renames a tag on every frame. Returns how many frames changed.
    pub fn rename_tag(&mut self, old: &str, new: &str, now: DateTime<Utc>) -> Result<usize, TrackerError> {
        let new = new.trim().to_string();
        if new.is_empty() {
            return Err(ValidationError::Empty { field: "tag" }.into());
        }
        let renamed = self.rewrite(now, |frame| {
            if !frame.has_tag(old) {
                return false;
            }
            let tags = frame.tags.iter().map(|tag| if tag == old { new.as_str() } else { tag.as_str() });
            frame.tags = normalize_tags(tags);
            true
        });
        if renamed == 0 {
            return Err(TrackerError::NotFound {
                reference: format!("tag {old}"),
            });
        }
        Ok(renamed)
    }

    fn rewrite(&mut self, now: DateTime<Utc>, mut edit: impl FnMut(&mut Frame) -> bool) -> usize {
        let mut count = 0;
        for frame in &mut self.frames {
            if edit(frame) {
                frame.updated_at = now;
                self.frames_changed = true;
                count += 1;
            }
        }
        if let Some(frame) = self.active.as_mut() {
            if edit(frame) {
                frame.updated_at = now;
                self.active_changed = true;
                count += 1;
            }
        }
        count
    }

    pub(crate) fn ensure_idle(&self) -> Result<(), TrackerError> {
        match &self.active {
            Some(active) => Err(TrackerError::AlreadyRunning {
                project: active.project.clone(),
                tags: active.tags.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn set_active(&mut self, frame: Option<Frame>) {
        self.active = frame;
        self.active_changed = true;
    }

    pub(crate) fn take_active(&mut self) -> Result<Frame, TrackerError> {
        let frame = self.active.take().ok_or(TrackerError::NoActiveFrame)?;
        self.active_changed = true;
        Ok(frame)
    }

    /// Moves the running frame into the stopped sequence.
    pub(crate) fn finish_active(&mut self, stop: DateTime<Utc>, now: DateTime<Utc>) -> Result<Frame, TrackerError> {
        let active = self.active.as_ref().ok_or(TrackerError::NoActiveFrame)?;
        check_order(active.start, Some(stop))?;

        let mut frame = self.take_active()?;
        frame.stop = Some(stop);
        frame.updated_at = now;
        self.frames.push(frame.clone());
        self.frames_changed = true;
        Ok(frame)
    }

    /// Mutable access to the last stopped frame, flagging the sequence as
    /// changed.
    pub(crate) fn last_mut(&mut self) -> Option<&mut Frame> {
        let last = self.frames.last_mut();
        if last.is_some() {
            self.frames_changed = true;
        }
        last
    }

    fn resolve(&self, reference: &FrameRef) -> Result<Slot, TrackerError> {
        let not_found = || TrackerError::NotFound {
            reference: reference.to_string(),
        };
        match reference {
            FrameRef::Index(index) => {
                let len = isize::try_from(self.frames.len()).map_err(|_| not_found())?;
                let position = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&position) {
                    usize::try_from(position).map(Slot::Stopped).map_err(|_| not_found())
                } else {
                    Err(not_found())
                }
            }
            FrameRef::Id(id) => {
                if id.is_empty() {
                    return Err(not_found());
                }
                if let Some(slot) = self.find_slot(|frame| frame.id.as_str() == id) {
                    return Ok(slot);
                }
                let matches = self
                    .all()
                    .filter(|frame| frame.id.as_str().starts_with(id.as_str()))
                    .count();
                match matches {
                    0 => Err(not_found()),
                    1 => self
                        .find_slot(|frame| frame.id.as_str().starts_with(id.as_str()))
                        .ok_or_else(not_found),
                    matches => Err(TrackerError::AmbiguousId {
                        prefix: id.clone(),
                        matches,
                    }),
                }
            }
        }
    }

    fn find_slot(&self, predicate: impl Fn(&Frame) -> bool) -> Option<Slot> {
        if let Some(index) = self.frames.iter().position(&predicate) {
            return Some(Slot::Stopped(index));
        }
        self.active
            .as_ref()
            .filter(|&frame| predicate(frame))
            .map(|_| Slot::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeDelta, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, day, hour, minute, 0).unwrap()
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn now() -> DateTime<Utc> {
        at(20, 0, 0)
    }

    fn sample_store() -> FrameStore {
        let mut store = FrameStore::new();
        store
            .add("p1", &tags(&["x"]), at(1, 9, 0), Some(at(1, 10, 0)), now())
            .unwrap();
        store
            .add("p1", &tags(&["x", "y"]), at(2, 9, 0), Some(at(2, 11, 0)), now())
            .unwrap();
        store
            .add("p2", &tags(&["z"]), at(3, 9, 0), Some(at(3, 9, 30)), now())
            .unwrap();
        store
    }

    #[test]
    fn add_rejects_empty_project() {
        let mut store = FrameStore::new();
        let err = store.add("", &[], at(1, 9, 0), None, now()).unwrap_err();
        assert_eq!(err, TrackerError::Validation(ValidationError::Empty { field: "project" }));
    }

    #[test]
    fn add_rejects_stop_before_start() {
        let mut store = FrameStore::new();
        let err = store
            .add("p1", &[], at(1, 10, 0), Some(at(1, 9, 0)), now())
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::StopBeforeStart { .. })
        ));
    }

    #[test]
    fn add_without_stop_fills_active_slot_once() {
        let mut store = FrameStore::new();
        store.add("p1", &[], at(1, 9, 0), None, now()).unwrap();
        assert!(store.is_running());
        assert_eq!(store.len(), 0);

        let err = store.add("p2", &[], at(1, 10, 0), None, now()).unwrap_err();
        assert!(matches!(err, TrackerError::AlreadyRunning { .. }));
    }

    #[test]
    fn add_deduplicates_tags() {
        let mut store = FrameStore::new();
        let frame = store
            .add("p1", &tags(&["a", "b", "a"]), at(1, 9, 0), Some(at(1, 10, 0)), now())
            .unwrap();
        assert_eq!(frame.tags, tags(&["a", "b"]));
    }

    #[test]
    fn get_by_negative_and_positive_index() {
        let store = sample_store();
        assert_eq!(store.get(&FrameRef::LAST).unwrap().project, "p2");
        assert_eq!(store.get(&FrameRef::Index(-3)).unwrap().start, at(1, 9, 0));
        assert_eq!(store.get(&FrameRef::Index(1)).unwrap().start, at(2, 9, 0));
        assert!(matches!(
            store.get(&FrameRef::Index(-4)),
            Err(TrackerError::NotFound { .. })
        ));
        assert!(matches!(
            store.get(&FrameRef::Index(3)),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn get_by_id_and_prefix() {
        let store = sample_store();
        let id = store.frames()[1].id.clone();
        assert_eq!(store.get(&FrameRef::from(&id)).unwrap().id, id);

        let prefix = FrameRef::Id(id.short().to_string());
        assert_eq!(store.get(&prefix).unwrap().id, id);
    }

    #[test]
    fn get_reports_ambiguous_prefix() {
        let frames = ["abc111", "abc222"]
            .into_iter()
            .map(|id| {
                Frame::restore(
                    FrameId::new(id).unwrap(),
                    "p1",
                    Vec::new(),
                    at(1, 9, 0),
                    Some(at(1, 10, 0)),
                    at(1, 10, 0),
                )
                .unwrap()
            })
            .collect();
        let store = FrameStore::from_frames(frames).unwrap();

        assert_eq!(
            store.get(&FrameRef::Id("abc".to_string())).unwrap_err(),
            TrackerError::AmbiguousId {
                prefix: "abc".to_string(),
                matches: 2
            }
        );
        assert_eq!(
            store.get(&FrameRef::Id("abc2".to_string())).unwrap().id.as_str(),
            "abc222"
        );
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = sample_store();
        assert!(matches!(
            store.get(&FrameRef::Id("zzzz".to_string())),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn frame_ref_parses_negative_numbers_as_positions() {
        assert_eq!("-2".parse::<FrameRef>().unwrap(), FrameRef::Index(-2));
        assert_eq!(
            "1234567".parse::<FrameRef>().unwrap(),
            FrameRef::Id("1234567".to_string())
        );
    }

    #[test]
    fn update_replaces_fields_and_bumps_updated_at() {
        let mut store = sample_store();
        let later = now() + TimeDelta::hours(1);
        let updated = store
            .update(
                &FrameRef::Index(0),
                FrameUpdate {
                    project: Some("p3".to_string()),
                    stop: Some(at(1, 11, 0)),
                    ..FrameUpdate::default()
                },
                later,
            )
            .unwrap();

        assert_eq!(updated.project, "p3");
        assert_eq!(updated.stop, Some(at(1, 11, 0)));
        assert_eq!(updated.tags, tags(&["x"]));
        assert_eq!(updated.updated_at, later);
        assert_eq!(store.frames()[0], updated);
    }

    #[test]
    fn update_validates_order_and_future() {
        let mut store = sample_store();
        let err = store
            .update(
                &FrameRef::Index(0),
                FrameUpdate {
                    start: Some(at(1, 12, 0)),
                    ..FrameUpdate::default()
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::StopBeforeStart { .. })
        ));

        let err = store
            .update(
                &FrameRef::Index(0),
                FrameUpdate {
                    stop: Some(now() + TimeDelta::hours(1)),
                    ..FrameUpdate::default()
                },
                now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::InFuture { field: "stop", .. })
        ));
    }

    #[test]
    fn update_refuses_to_stop_running_frame() {
        let mut store = FrameStore::new();
        let active = store.add("p1", &[], at(1, 9, 0), None, now()).unwrap();
        let err = store
            .update(
                &FrameRef::from(&active.id),
                FrameUpdate {
                    stop: Some(at(1, 10, 0)),
                    ..FrameUpdate::default()
                },
                now(),
            )
            .unwrap_err();
        assert_eq!(err, TrackerError::Validation(ValidationError::StopOnActiveFrame));
    }

    #[test]
    fn remove_deletes_by_reference() {
        let mut store = sample_store();
        let removed = store.remove(&FrameRef::LAST).unwrap();
        assert_eq!(removed.project, "p2");
        assert_eq!(store.len(), 2);
        assert!(store.frames_changed());
        assert!(matches!(
            store.remove(&FrameRef::from(&removed.id)),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn filter_excluded_tag_wins_over_included() {
        let store = sample_store();
        let query = FrameQuery::new(at(1, 0, 0), at(4, 0, 0)).with_filter(FrameFilter {
            tags: tags(&["x"]),
            exclude_tags: tags(&["y"]),
            ..FrameFilter::default()
        });
        let frames = store.filter(&query, now()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].start, at(1, 9, 0));
    }

    #[test]
    fn filter_projects_are_ored() {
        let store = sample_store();
        let query = FrameQuery::new(at(1, 0, 0), at(4, 0, 0)).with_filter(FrameFilter {
            projects: tags(&["p1", "p2"]),
            exclude_projects: tags(&["p3"]),
            ..FrameFilter::default()
        });
        assert_eq!(store.filter(&query, now()).unwrap().len(), 3);
    }

    #[test]
    fn filter_restricts_to_range() {
        let store = sample_store();
        let query = FrameQuery::new(at(2, 10, 0), at(3, 9, 0));
        let frames = store.filter(&query, now()).unwrap();
        let starts: Vec<_> = frames.iter().map(|f| f.start).collect();
        assert_eq!(starts, vec![at(2, 9, 0), at(3, 9, 0)]);
    }

    #[test]
    fn filter_includes_running_frame_only_on_request() {
        let mut store = sample_store();
        store.add("p3", &[], at(4, 9, 0), None, now()).unwrap();
        let query = FrameQuery::new(at(4, 0, 0), at(5, 0, 0));

        assert!(store.filter(&query, now()).unwrap().is_empty());

        let frames = store.filter(&query.include_current(true), now()).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_active());
    }

    #[test]
    fn filter_rejects_contradictions() {
        let store = sample_store();
        let query = FrameQuery::new(at(1, 0, 0), at(4, 0, 0)).with_filter(FrameFilter {
            projects: tags(&["p1"]),
            exclude_projects: tags(&["p1"]),
            ..FrameFilter::default()
        });
        assert!(matches!(
            store.filter(&query, now()),
            Err(TrackerError::Validation(ValidationError::ContradictoryFilter { kind: "project", .. }))
        ));

        let inverted = FrameQuery::new(at(4, 0, 0), at(1, 0, 0));
        assert!(matches!(
            store.filter(&inverted, now()),
            Err(TrackerError::Validation(ValidationError::InvertedRange { .. }))
        ));
    }

    #[test]
    fn filter_chronological_sorts_by_start() {
        let mut store = sample_store();
        store
            .add("p1", &[], at(1, 6, 0), Some(at(1, 7, 0)), now())
            .unwrap();
        let query = FrameQuery::new(at(1, 0, 0), at(4, 0, 0));

        let in_store_order = store.filter(&query, now()).unwrap();
        assert_eq!(in_store_order.last().unwrap().start, at(1, 6, 0));

        let sorted = store.filter(&query.chronological(true), now()).unwrap();
        assert_eq!(sorted.first().unwrap().start, at(1, 6, 0));
    }

    #[test]
    fn from_frames_rejects_duplicates_and_second_active() {
        let frame = |id: &str, stop: Option<DateTime<Utc>>| {
            Frame::restore(FrameId::new(id).unwrap(), "p1", Vec::new(), at(1, 9, 0), stop, at(1, 9, 0)).unwrap()
        };

        let err = FrameStore::from_frames(vec![
            frame("a", Some(at(1, 10, 0))),
            frame("a", Some(at(1, 10, 0))),
        ])
        .unwrap_err();
        assert_eq!(err, IntegrityError::DuplicateId(FrameId::new("a").unwrap()));

        let err = FrameStore::from_frames(vec![frame("a", None), frame("b", None)]).unwrap_err();
        assert!(matches!(err, IntegrityError::MultipleActive { .. }));

        let store = FrameStore::from_frames(vec![frame("a", None), frame("b", Some(at(1, 10, 0)))]).unwrap();
        assert!(store.is_running());
        assert_eq!(store.len(), 1);
        assert!(!store.frames_changed());
    }

    #[test]
    fn projects_and_tags_are_derived() {
        let store = sample_store();
        assert_eq!(store.projects(&[]), tags(&["p1", "p2"]));
        assert_eq!(store.projects(&tags(&["x", "y"])), tags(&["p1"]));
        assert_eq!(store.tags(&[]), tags(&["x", "y", "z"]));
        assert_eq!(store.tags(&tags(&["p1"])), tags(&["x", "y"]));
        assert!(store.tags(&tags(&["p1", "p2"])).is_empty());
    }

    #[test]
    fn span_covers_all_frames() {
        let mut store = sample_store();
        assert_eq!(store.span(false, now()), Some((at(1, 9, 0), at(3, 9, 30))));
        store.add("p1", &[], at(5, 9, 0), None, now()).unwrap();
        assert_eq!(store.span(true, now()), Some((at(1, 9, 0), now())));
        assert_eq!(FrameStore::new().span(true, now()), None);
    }

    #[test]
    fn rename_project_and_tag() {
        let mut store = sample_store();
        assert_eq!(store.rename_project("p1", "q1", now()).unwrap(), 2);
        assert_eq!(store.projects(&[]), tags(&["p2", "q1"]));

        assert_eq!(store.rename_tag("y", "x", now()).unwrap(), 1);
        assert_eq!(store.frames()[1].tags, tags(&["x"]));

        assert!(matches!(
            store.rename_project("nope", "q2", now()),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn latest_for_project_searches_backwards() {
        let store = sample_store();
        assert_eq!(store.latest_for_project("p1").unwrap().start, at(2, 9, 0));
        assert!(store.latest_for_project("p9").is_none());
    }
}
