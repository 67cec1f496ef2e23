//! Storage layer for the time tracker.
//!
//! Frames live in two JSON files inside the data directory:
//!
//! - `frames`: every stopped frame, in store order
//! - `state`: the running frame, or `{}` when nothing runs
//!
//! # Writes
//!
//! Every write goes to a temporary file in the destination directory, is
//! synced, and then renamed over the destination. Readers never observe a
//! half-written file and a crash before the rename leaves the old file in
//! place. The previous contents are copied to `<name>.bak` first.
//!
//! There is no locking: two processes writing the same data directory at
//! once may lose one of the updates.

mod format;

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tt_core::id::{derived_id, generate_id};
use tt_core::{Frame, FrameStore};

pub use format::StateRecord;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file exists but does not hold valid frame data.
    #[error("corrupt data in {}: {reason}", path.display())]
    CorruptData { path: PathBuf, reason: String },

    /// A file could not be read.
    #[error("could not read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be written. The previous contents are intact.
    #[error("could not write {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptData {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn persistence(path: &Path, source: io::Error) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }
}

const FRAMES_FILE: &str = "frames";
const STATE_FILE: &str = "state";

/// The frames and state files of one data directory.
#[derive(Debug, Clone)]
pub struct FileRepository {
    frames_path: PathBuf,
    state_path: PathBuf,
}

impl FileRepository {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            frames_path: data_dir.join(FRAMES_FILE),
            state_path: data_dir.join(STATE_FILE),
        }
    }

    pub fn frames_path(&self) -> &Path {
        &self.frames_path
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Loads both files. Missing or empty files count as no data.
    ///
    /// Two kinds of state record are repaired on load and flagged so the
    /// next save rewrites the state file:
    ///
    /// - A running frame without an id, as written by older versions, gets
    ///   one derived from its project and start.
    /// - A running frame whose id is already a stopped frame in `frames` is
    ///   dropped. This is what an interrupted save of a stop leaves behind,
    ///   since `frames` is written before `state`.
    pub fn load(&self) -> Result<FrameStore, StoreError> {
        let mut frames = read_frames(&self.frames_path)?;
        let mut repaired = false;

        let contents = read_optional(&self.state_path)?;
        let state = format::decode_state(&contents).map_err(|reason| StoreError::corrupt(&self.state_path, reason))?;
        if let Some(state) = state {
            let taken: HashSet<String> = frames.iter().map(|frame| frame.id.to_string()).collect();
            match state.id {
                Some(id) if taken.contains(id.as_str()) => {
                    tracing::warn!(
                        path = %self.state_path.display(),
                        id = %id,
                        "running frame was already stopped, dropping it"
                    );
                    repaired = true;
                }
                id => {
                    let id = match id {
                        Some(id) => id,
                        None => {
                            tracing::warn!(path = %self.state_path.display(), "running frame has no id, assigning one");
                            repaired = true;
                            let derived = derived_id(&state.project, state.start);
                            if taken.contains(derived.as_str()) {
                                generate_id(&state.project, state.start, |candidate| taken.contains(candidate))
                                    .map_err(|err| StoreError::corrupt(&self.state_path, err.to_string()))?
                            } else {
                                derived
                            }
                        }
                    };
                    let updated_at = state.updated_at.unwrap_or(state.start);
                    let active = Frame::restore(id, &state.project, state.tags, state.start, None, updated_at)
                        .map_err(|err| StoreError::corrupt(&self.state_path, err.to_string()))?;
                    frames.push(active);
                }
            }
        }

        let mut store =
            FrameStore::from_frames(frames).map_err(|err| StoreError::corrupt(&self.frames_path, err.to_string()))?;
        if repaired {
            store.mark_active_changed();
        }
        tracing::debug!(frames = store.len(), running = store.is_running(), "loaded frames");
        Ok(store)
    }

    /// Writes whichever files changed since load, then clears the change
    /// flags.
    pub fn save(&self, store: &mut FrameStore) -> Result<(), StoreError> {
        if store.frames_changed() {
            write_frames_file(&self.frames_path, store.frames())?;
        }
        if store.active_changed() {
            let contents = format::encode_state(store.active())
                .map_err(|err| StoreError::persistence(&self.state_path, io::Error::other(err)))?;
            write_atomic(&self.state_path, &contents)?;
            tracing::info!(path = %self.state_path.display(), running = store.is_running(), "saved state");
        }
        store.mark_saved();
        Ok(())
    }
}

/// Loads a standalone frames file, such as one exported from another
/// machine, into a store of its own.
pub fn load_frames_file(path: &Path) -> Result<FrameStore, StoreError> {
    if !path.exists() {
        return Err(StoreError::Read {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
    }
    let frames = read_frames(path)?;
    FrameStore::from_frames(frames).map_err(|err| StoreError::corrupt(path, err.to_string()))
}

/// Atomically replaces a frames file with the given frames.
pub fn write_frames_file(path: &Path, frames: &[Frame]) -> Result<(), StoreError> {
    let contents = format::encode_frames(frames).map_err(|err| StoreError::persistence(path, io::Error::other(err)))?;
    write_atomic(path, &contents)?;
    tracing::info!(path = %path.display(), frames = frames.len(), "saved frames");
    Ok(())
}

fn read_frames(path: &Path) -> Result<Vec<Frame>, StoreError> {
    let contents = read_optional(path)?;
    format::decode_frames(&contents).map_err(|reason| StoreError::corrupt(path, reason))
}

fn read_optional(path: &Path) -> Result<String, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let fail = |source| StoreError::persistence(path, source);
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(fail)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(contents).map_err(fail)?;
    tmp.flush().map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;

    if path.exists() {
        fs::copy(path, backup_path(path)).map_err(fail)?;
    }
    tmp.persist(path).map_err(|err| fail(err.error))?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}
