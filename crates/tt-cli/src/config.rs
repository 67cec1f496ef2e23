//! Configuration loading and management.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{TimeDelta, Weekday};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tt_core::{SessionPolicy, normalize_tags};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the frames and state files.
    pub data_dir: PathBuf,

    #[serde(default)]
    pub options: Options,

    /// Tags added to every frame started on a project.
    #[serde(default)]
    pub default_tags: BTreeMap<String, TagList>,
}

/// Behavior switches from the `[options]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Stop the running frame when another one is started.
    pub stop_on_start: bool,

    /// `start` on the project that was last tracked reuses its tags.
    pub restart_on_start: bool,

    /// `start` closes the gap since the last frame unless told otherwise.
    pub autostretch_on_start: bool,

    /// Largest gap, in seconds, a stretch may close.
    pub autostretch_max_elapsed_secs: u64,

    /// Count the running frame in reports and logs.
    pub include_current: bool,

    /// First day of a `--week`.
    pub week_start: Weekday,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            stop_on_start: false,
            restart_on_start: false,
            autostretch_on_start: false,
            autostretch_max_elapsed_secs: 8 * 60 * 60,
            include_current: false,
            week_start: Weekday::Mon,
        }
    }
}

/// Default tags, either as one space-separated string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    Spaced(String),
    List(Vec<String>),
}

impl TagList {
    pub fn tags(&self) -> Vec<String> {
        match self {
            Self::Spaced(tags) => normalize_tags(tags.split_whitespace()),
            Self::List(tags) => normalize_tags(tags),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &self.data_dir)
            .field("options", &self.options)
            .field("default_tags", &self.default_tags.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs_data_path().unwrap_or_else(|| PathBuf::from(".")),
            options: Options::default(),
            default_tags: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `<config dir>/tt/config.toml`, the given
    /// file, then `TT_*` environment variables (`__` separates nested keys,
    /// as in `TT_OPTIONS__STOP_ON_START=true`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TT_*)
        figment = figment.merge(Env::prefixed("TT_").split("__"));

        figment.extract()
    }

    /// The session policy these options describe.
    pub fn session_policy(&self) -> SessionPolicy {
        let max_secs = i64::try_from(self.options.autostretch_max_elapsed_secs).unwrap_or(i64::MAX);
        SessionPolicy {
            stop_on_start: self.options.stop_on_start,
            default_tags: self
                .default_tags
                .iter()
                .map(|(project, tags)| (project.clone(), tags.tags()))
                .collect::<HashMap<_, _>>(),
            autostretch_max_elapsed: TimeDelta::try_seconds(max_secs).unwrap_or_else(|| TimeDelta::days(36_500)),
        }
    }
}

/// Returns the platform-specific config directory for tt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tt"))
}

/// Returns the platform-specific data directory for tt.
///
/// On Linux: `~/.local/share/tt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tt"))
}
