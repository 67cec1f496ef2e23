//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and operation inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A frame would end before it starts.
    #[error("frame cannot end before it starts ({stop} < {start})")]
    StopBeforeStart {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    /// A timestamp lies after the current time.
    #[error("{field} cannot be in the future ({at})")]
    InFuture {
        field: &'static str,
        at: DateTime<Utc>,
    },

    /// A query range is inverted.
    #[error("'from' must be before 'to' ({from} > {to})")]
    InvertedRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// The same value was both included and excluded by a filter.
    #[error("{kind} {value:?} can't be included and excluded at the same time")]
    ContradictoryFilter { kind: &'static str, value: String },

    /// A frame id is already taken.
    #[error("frame id {id} is already in use")]
    DuplicateId { id: String },

    /// The running frame can only be finalized by stopping it.
    #[error("the running frame cannot be given a stop time by editing; stop it instead")]
    StopOnActiveFrame,
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub(crate) String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated frame identifier.
    ///
    /// Frame IDs must be non-empty strings. Freshly generated IDs are 32
    /// lowercase hex characters; older data may carry any non-empty string.
    FrameId, "frame ID"
);

/// Number of characters shown when a frame id is abbreviated.
pub const SHORT_ID_LEN: usize = 7;

impl FrameId {
    /// Returns the abbreviated form used in listings.
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(SHORT_ID_LEN)
            .map_or(self.0.as_str(), |(end, _)| &self.0[..end])
    }
}

/// Validates and normalizes a project name.
pub fn project_name(project: &str) -> Result<String, ValidationError> {
    let project = project.trim();
    if project.is_empty() {
        return Err(ValidationError::Empty { field: "project" });
    }
    Ok(project.to_string())
}

/// Trims tags, drops blank ones and removes duplicates, keeping the first
/// occurrence of each.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !normalized.iter().any(|existing| existing == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}
