//! Per-invocation application context.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tt_core::{ActiveSession, Clock, FrameStore, SessionPolicy, SystemClock};
use tt_store::FileRepository;

use crate::Config;

/// Everything a command needs: configuration, the loaded frames and a clock.
///
/// Commands mutate [`App::store`] and call [`App::save`] once at the end, so
/// a failing command never leaves a partial write behind.
pub struct App {
    pub config: Config,
    pub repository: FileRepository,
    pub store: FrameStore,
    policy: SessionPolicy,
    clock: Box<dyn Clock>,
}

impl App {
    /// Loads the frames from the configured data directory.
    pub fn open(config: Config) -> Result<Self> {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Box<dyn Clock>) -> Result<Self> {
        let repository = FileRepository::new(&config.data_dir);
        let store = repository
            .load()
            .with_context(|| format!("failed to load frames from {}", config.data_dir.display()))?;
        let policy = config.session_policy();
        Ok(Self {
            config,
            repository,
            store,
            policy,
            clock,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The running-frame operations, bound to this app's policy and clock.
    pub fn session(&mut self) -> ActiveSession<'_> {
        ActiveSession::new(&mut self.store, &self.policy, self.clock.as_ref())
    }

    /// Writes whatever changed.
    pub fn save(&mut self) -> Result<()> {
        self.repository.save(&mut self.store).context("failed to save frames")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use chrono::TimeZone;
    use tt_core::FixedClock;

    use super::*;

    /// 2023-01-02 18:00 UTC.
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 2, 18, 0, 0).unwrap()
    }

    pub fn config(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    pub fn app(dir: &Path) -> App {
        App::with_clock(config(dir), Box::new(FixedClock(now()))).unwrap()
    }

    pub fn app_with(config: Config) -> App {
        App::with_clock(config, Box::new(FixedClock(now()))).unwrap()
    }
}
