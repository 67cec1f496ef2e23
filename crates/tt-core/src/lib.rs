//! Core domain logic for the time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Frames: tracked intervals of work on a project
//! - The frame store and its single running-frame slot
//! - Starting and stopping work under a configurable policy
//! - Merging two diverged frame histories
//! - Daily and flat reports over a date range
//!
//! Nothing here touches the filesystem or the terminal.

pub mod clock;
mod error;
mod frame;
pub mod id;
pub mod merge;
pub mod period;
pub mod report;
pub mod session;
mod store;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::TrackerError;
pub use frame::{Frame, FrameUpdate};
pub use merge::{
    Conflict, ConflictKind, Decision, ForcePolicy, ForcedResolver, MergeResult, Merger, Resolver,
};
pub use period::{Period, local_midnight, period_start};
pub use report::{DailyAggregate, DayAttribution, Report, ReportEngine};
pub use session::{ActiveSession, SessionPolicy};
pub use store::{FrameFilter, FrameQuery, FrameRef, FrameStore, IntegrityError};
pub use types::{FrameId, SHORT_ID_LEN, ValidationError, normalize_tags, project_name};
