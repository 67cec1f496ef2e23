//! Errors raised by frame store and session operations.

use thiserror::Error;

use crate::types::ValidationError;

/// Errors from core tracker operations.
///
/// Every variant is recoverable: the CLI reports it and exits non-zero.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// Bad input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No frame matches the given id, prefix or index.
    #[error("no frame found for {reference}")]
    NotFound { reference: String },

    /// An id prefix matches more than one frame.
    #[error("frame id prefix {prefix} is ambiguous ({matches} frames match)")]
    AmbiguousId { prefix: String, matches: usize },

    /// A frame is already running.
    #[error("project {project} is already started{}", format_tags(.tags))]
    AlreadyRunning { project: String, tags: Vec<String> },

    /// No frame is running.
    #[error("no project started")]
    NoActiveFrame,

    /// Every generated id collided with an existing one.
    #[error("could not generate a unique frame id after {attempts} attempts")]
    IdExhausted { attempts: usize },
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" with tags [{}]", tags.join(", "))
    }
}
