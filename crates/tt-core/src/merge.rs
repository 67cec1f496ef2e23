//! Reconciling two diverged frame histories.
//!
//! [`Merger::plan`] classifies every frame as unchanged, merged (an incoming
//! addition) or conflicting. [`Merger::apply`] asks a [`Resolver`] about each
//! conflict and builds the consolidated store. Planning never consults the
//! resolver, so the same pair of stores always yields the same plan.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TrackerError;
use crate::frame::Frame;
use crate::id::generate_id;
use crate::store::{FrameStore, IntegrityError};
use crate::types::{FrameId, ValidationError};

/// Why two frames were paired as a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same id, different content.
    Diverged,
    /// Different ids, overlapping time on the same project.
    Overlap,
}

/// A local frame and the incoming frame competing with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub local: Frame,
    pub incoming: Frame,
}

/// Classification of a merge. The three id sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    /// Local frames kept as they are.
    pub unchanged: Vec<FrameId>,
    /// Incoming frames absent locally, in incoming order.
    pub merged: Vec<Frame>,
    /// Pairs that need a decision, in incoming order.
    pub conflicting: Vec<Conflict>,
}

impl MergeResult {
    pub fn merged_ids(&self) -> impl Iterator<Item = &FrameId> {
        self.merged.iter().map(|frame| &frame.id)
    }

    /// Ids on both sides of every conflict, local first.
    pub fn conflicting_ids(&self) -> impl Iterator<Item = &FrameId> {
        self.conflicting.iter().flat_map(|conflict| {
            let incoming = (conflict.incoming.id != conflict.local.id).then_some(&conflict.incoming.id);
            std::iter::once(&conflict.local.id).chain(incoming)
        })
    }

    /// Whether merging would leave the local store as it is.
    pub fn is_noop(&self) -> bool {
        self.merged.is_empty() && self.conflicting.is_empty()
    }
}

/// What to keep for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    KeepLocal,
    KeepIncoming,
    /// Keep the local frame and add the incoming one as a separate frame.
    KeepBoth,
}

/// Decides conflicts during [`Merger::apply`].
pub trait Resolver {
    fn resolve(&mut self, conflict: &Conflict) -> Decision;
}

impl<F> Resolver for F
where
    F: FnMut(&Conflict) -> Decision,
{
    fn resolve(&mut self, conflict: &Conflict) -> Decision {
        self(conflict)
    }
}

/// Policy used when conflicts are resolved without asking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForcePolicy {
    /// The incoming frame always replaces the local one.
    #[default]
    IncomingWins,
    /// The frame with the later `updated_at` wins; ties keep the local frame.
    NewestWins,
}

/// Resolves every conflict with a fixed [`ForcePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcedResolver {
    pub policy: ForcePolicy,
}

impl ForcedResolver {
    pub const fn new(policy: ForcePolicy) -> Self {
        Self { policy }
    }
}

impl Resolver for ForcedResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Decision {
        match self.policy {
            ForcePolicy::IncomingWins => Decision::KeepIncoming,
            ForcePolicy::NewestWins if conflict.incoming.updated_at > conflict.local.updated_at => {
                Decision::KeepIncoming
            }
            ForcePolicy::NewestWins => Decision::KeepLocal,
        }
    }
}

/// Merges an incoming store into a local one.
///
/// Only the incoming store's stopped frames take part. The local running
/// frame is carried over unless an incoming frame shares its id.
pub struct Merger<'a> {
    local: &'a FrameStore,
    incoming: &'a FrameStore,
}

impl<'a> Merger<'a> {
    pub const fn new(local: &'a FrameStore, incoming: &'a FrameStore) -> Self {
        Self { local, incoming }
    }

    /// Classifies every frame of both stores.
    pub fn plan(&self) -> MergeResult {
        let local_by_id: HashMap<&FrameId, &Frame> = local_frames(self.local)
            .map(|frame| (&frame.id, frame))
            .collect();
        let incoming_ids: HashSet<&FrameId> = self.incoming.frames().iter().map(|frame| &frame.id).collect();

        // Local stopped frames the incoming side never saw, candidates for
        // an overlap pairing.
        let mut local_only: Vec<&Frame> = self
            .local
            .frames()
            .iter()
            .filter(|frame| !incoming_ids.contains(&frame.id))
            .collect();

        let mut result = MergeResult::default();
        let mut in_conflict: HashSet<&FrameId> = HashSet::new();

        for incoming in self.incoming.frames() {
            if let Some(&local) = local_by_id.get(&incoming.id) {
                if !local.same_content(incoming) {
                    in_conflict.insert(&local.id);
                    result.conflicting.push(Conflict {
                        kind: ConflictKind::Diverged,
                        local: local.clone(),
                        incoming: incoming.clone(),
                    });
                }
                continue;
            }

            let overlapping = local_only
                .iter()
                .position(|local| local.project == incoming.project && stopped_overlap(local, incoming));
            if let Some(position) = overlapping {
                let local = local_only.remove(position);
                in_conflict.insert(&local.id);
                result.conflicting.push(Conflict {
                    kind: ConflictKind::Overlap,
                    local: local.clone(),
                    incoming: incoming.clone(),
                });
            } else {
                result.merged.push(incoming.clone());
            }
        }

        result.unchanged = local_frames(self.local)
            .filter(|frame| !in_conflict.contains(&frame.id))
            .map(|frame| frame.id.clone())
            .collect();

        tracing::debug!(
            unchanged = result.unchanged.len(),
            merged = result.merged.len(),
            conflicting = result.conflicting.len(),
            "planned merge"
        );
        result
    }

    /// Builds the consolidated store from a plan, asking `resolver` about
    /// each conflict in plan order.
    ///
    /// Local order is kept and replaced frames stay in place. Additions and
    /// kept-both copies are appended in incoming order; a copy that shares
    /// its id with the local frame gets a fresh one.
    pub fn apply(&self, plan: &MergeResult, resolver: &mut dyn Resolver) -> Result<FrameStore, TrackerError> {
        let incoming_order: HashMap<&FrameId, usize> = self
            .incoming
            .frames()
            .iter()
            .enumerate()
            .map(|(index, frame)| (&frame.id, index))
            .collect();
        let order_of = |id: &FrameId| incoming_order.get(id).copied().unwrap_or(usize::MAX);

        let mut used: HashSet<String> = local_frames(self.local)
            .chain(self.incoming.frames())
            .map(|frame| frame.id.to_string())
            .collect();
        let mut replacements: HashMap<&FrameId, &Frame> = HashMap::new();
        let mut appended: Vec<(usize, Frame)> = plan
            .merged
            .iter()
            .map(|frame| (order_of(&frame.id), frame.clone()))
            .collect();

        for conflict in &plan.conflicting {
            let decision = resolver.resolve(conflict);
            tracing::debug!(id = %conflict.incoming.id, kind = ?conflict.kind, ?decision, "resolved conflict");
            match decision {
                Decision::KeepLocal => {}
                Decision::KeepIncoming => {
                    replacements.insert(&conflict.local.id, &conflict.incoming);
                }
                Decision::KeepBoth => {
                    let mut copy = conflict.incoming.clone();
                    if copy.id == conflict.local.id {
                        copy.id = generate_id(&copy.project, copy.start, |candidate| used.contains(candidate))?;
                        used.insert(copy.id.to_string());
                    }
                    appended.push((order_of(&conflict.incoming.id), copy));
                }
            }
        }
        appended.sort_by_key(|(order, _)| *order);

        let frames: Vec<Frame> = local_frames(self.local)
            .map(|frame| replacements.get(&frame.id).map_or_else(|| frame.clone(), |&incoming| incoming.clone()))
            .chain(appended.into_iter().map(|(_, frame)| frame))
            .collect();

        let mut merged = FrameStore::from_frames(frames).map_err(integrity_to_validation)?;
        if merged.frames() != self.local.frames() {
            merged.mark_frames_changed();
        }
        if merged.active() != self.local.active() {
            let active = merged.active().cloned();
            merged.set_active(active);
        }
        Ok(merged)
    }
}

fn local_frames(store: &FrameStore) -> impl Iterator<Item = &Frame> {
    store.frames().iter().chain(store.active())
}

// Both frames are stopped, so the clock never comes into play.
fn stopped_overlap(a: &Frame, b: &Frame) -> bool {
    a.overlaps(b, DateTime::<Utc>::MIN_UTC)
}

fn integrity_to_validation(err: IntegrityError) -> TrackerError {
    match err {
        IntegrityError::DuplicateId(id) | IntegrityError::MultipleActive { second: id, .. } => {
            ValidationError::DuplicateId { id: id.to_string() }.into()
        }
    }
}
