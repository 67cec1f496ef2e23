//! Frame id generation.
//!
//! Ids are the first 32 hex characters of a SHA-256 digest over the frame's
//! project, its start instant and a random UUIDv4 salt. The salt makes two
//! frames with identical content distinct; the width matches the UUID-hex ids
//! found in older frame files.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::types::FrameId;

/// Length of a generated id in hex characters.
pub const ID_HEX_LEN: usize = 32;

/// How many candidates are tried before giving up.
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Outcome of one id generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdAttempt {
    /// The candidate is not in use.
    Fresh(FrameId),
    /// The candidate is taken; roll again.
    Collision,
}

/// Produces one candidate and checks it against `is_taken`.
pub fn attempt_id(project: &str, start: DateTime<Utc>, is_taken: impl Fn(&str) -> bool) -> IdAttempt {
    let candidate = digest_hex(project, start, Uuid::new_v4());
    if is_taken(&candidate) {
        IdAttempt::Collision
    } else {
        IdAttempt::Fresh(FrameId(candidate))
    }
}

/// Generates an id not rejected by `is_taken`, retrying a bounded number of
/// times.
pub fn generate_id(
    project: &str,
    start: DateTime<Utc>,
    is_taken: impl Fn(&str) -> bool,
) -> Result<FrameId, TrackerError> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        match attempt_id(project, start, &is_taken) {
            IdAttempt::Fresh(id) => return Ok(id),
            IdAttempt::Collision => {
                tracing::warn!(attempt, "frame id collision, retrying");
            }
        }
    }
    Err(TrackerError::IdExhausted {
        attempts: MAX_ID_ATTEMPTS,
    })
}

/// Derives a stable id from a frame's project and start, for records written
/// before ids existed. Loading the same record twice yields the same id.
pub fn derived_id(project: &str, start: DateTime<Utc>) -> FrameId {
    FrameId(digest_hex(project, start, Uuid::nil()))
}

fn digest_hex(project: &str, start: DateTime<Utc>, salt: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project.as_bytes());
    hasher.update([0u8]);
    hasher.update(start.timestamp().to_be_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(ID_HEX_LEN);
    for b in digest.iter().take(ID_HEX_LEN / 2) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
