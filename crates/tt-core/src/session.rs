//! The running frame and the rules around starting and stopping it.
//!
//! [`ActiveSession`] borrows a [`FrameStore`] and applies the tracking
//! policy: whether starting a frame may stop the running one, which default
//! tags a project gets, and how far back a stretch may reach.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;
use crate::error::TrackerError;
use crate::frame::Frame;
use crate::store::{FrameRef, FrameStore};
use crate::types::{ValidationError, normalize_tags, project_name};

/// Tracking behavior taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Stop the running frame instead of failing when a new one starts.
    pub stop_on_start: bool,

    /// Tags appended to every frame started on a project.
    pub default_tags: HashMap<String, Vec<String>>,

    /// Largest gap a stretch may close.
    /// Default: 8 hours.
    pub autostretch_max_elapsed: TimeDelta,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            stop_on_start: false,
            default_tags: HashMap::new(),
            autostretch_max_elapsed: TimeDelta::hours(8),
        }
    }
}

impl SessionPolicy {
    /// Requested tags followed by the project's default tags, deduplicated.
    pub fn tags_for(&self, project: &str, tags: &[String]) -> Vec<String> {
        let defaults = self.default_tags.get(project).into_iter().flatten();
        normalize_tags(tags.iter().chain(defaults))
    }
}

/// Policy-aware access to a store's running-frame slot.
pub struct ActiveSession<'a> {
    store: &'a mut FrameStore,
    policy: &'a SessionPolicy,
    clock: &'a dyn Clock,
}

impl<'a> ActiveSession<'a> {
    pub fn new(store: &'a mut FrameStore, policy: &'a SessionPolicy, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// The running frame, if any.
    pub fn current(&self) -> Option<&Frame> {
        self.store.active()
    }

    /// Starts a frame at `at`.
    ///
    /// A running frame is stopped at `at` when the policy allows it, otherwise
    /// this fails with [`TrackerError::AlreadyRunning`]. With `stretch`, the
    /// last stopped frame is extended up to `at` when the gap is within the
    /// policy's limit.
    pub fn start(
        &mut self,
        project: &str,
        tags: &[String],
        at: DateTime<Utc>,
        stretch: bool,
    ) -> Result<Frame, TrackerError> {
        let now = self.clock.now();
        let project = project_name(project)?;
        if at > now {
            return Err(ValidationError::InFuture { field: "start", at }.into());
        }

        if let Some(active) = self.store.active() {
            if !self.policy.stop_on_start {
                return Err(TrackerError::AlreadyRunning {
                    project: active.project.clone(),
                    tags: active.tags.clone(),
                });
            }
            let stopped = self.store.finish_active(at, now)?;
            tracing::debug!(id = %stopped.id, "stopped running frame before start");
        } else if stretch {
            self.stretch_last(at, now);
        }

        let tags = self.policy.tags_for(&project, tags);
        let frame = self.store.add(&project, &tags, at, None, now)?;
        tracing::debug!(id = %frame.id, project = %frame.project, "started frame");
        Ok(frame)
    }

    /// Stops the running frame at `at`, or now.
    pub fn stop(&mut self, at: Option<DateTime<Utc>>) -> Result<Frame, TrackerError> {
        let now = self.clock.now();
        let at = at.unwrap_or(now);
        if !self.store.is_running() {
            return Err(TrackerError::NoActiveFrame);
        }
        if at > now {
            return Err(ValidationError::InFuture { field: "stop", at }.into());
        }
        let frame = self.store.finish_active(at, now)?;
        tracing::debug!(id = %frame.id, project = %frame.project, "stopped frame");
        Ok(frame)
    }

    /// Discards the running frame and returns it.
    pub fn cancel(&mut self) -> Result<Frame, TrackerError> {
        let frame = self.store.take_active()?;
        tracing::debug!(id = %frame.id, "cancelled frame");
        Ok(frame)
    }

    /// Starts a new frame with the project and tags of `reference`, which
    /// defaults to the most recent stopped frame.
    pub fn restart(
        &mut self,
        reference: Option<&FrameRef>,
        at: DateTime<Utc>,
        stretch: bool,
    ) -> Result<Frame, TrackerError> {
        let source = match reference {
            Some(reference) => self.store.get(reference)?,
            None => self.store.last().ok_or_else(|| TrackerError::NotFound {
                reference: "a frame to restart".to_string(),
            })?,
        };
        let (project, tags) = (source.project.clone(), source.tags.clone());
        self.start(&project, &tags, at, stretch)
    }

    /// Starts `project` again with the tags it was last tracked with, plus
    /// `extra_tags`.
    ///
    /// The running frame's tags are reused when it is on the same project.
    pub fn restart_project(
        &mut self,
        project: &str,
        extra_tags: &[String],
        at: DateTime<Utc>,
        stretch: bool,
    ) -> Result<Frame, TrackerError> {
        let project = project_name(project)?;
        let previous = self
            .store
            .active()
            .filter(|active| active.project == project)
            .or_else(|| self.store.latest_for_project(&project))
            .map(|frame| frame.tags.clone())
            .unwrap_or_default();
        let tags: Vec<String> = extra_tags.iter().cloned().chain(previous).collect();
        self.start(&project, &tags, at, stretch)
    }

    fn stretch_last(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) {
        let limit = self.policy.autostretch_max_elapsed;
        let Some(last) = self.store.last() else {
            return;
        };
        let Some(stop) = last.stop else {
            return;
        };
        if stop >= at || at - stop >= limit {
            return;
        }
        if let Some(last) = self.store.last_mut() {
            tracing::debug!(id = %last.id, gap_secs = (at - stop).num_seconds(), "stretching last frame");
            last.stop = Some(at);
            last.updated_at = now;
        }
    }
}
