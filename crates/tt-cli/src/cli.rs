//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::add::AddArgs;
use crate::commands::aggregate::AggregateArgs;
use crate::commands::config::ConfigArgs;
use crate::commands::edit::EditArgs;
use crate::commands::log::LogArgs;
use crate::commands::merge::MergeArgs;
use crate::commands::projects::{ProjectsArgs, TagsArgs};
use crate::commands::remove::RemoveArgs;
use crate::commands::rename::RenameArgs;
use crate::commands::report::ReportArgs;
use crate::commands::restart::RestartArgs;
use crate::commands::start::StartArgs;
use crate::commands::status::StatusArgs;
use crate::commands::stop::StopArgs;

/// Personal time tracker.
///
/// Records frames of work on projects, with tags, and reports on them.
#[derive(Debug, Parser)]
#[command(name = "tt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start tracking a project.
    Start(StartArgs),

    /// Stop the running frame.
    Stop(StopArgs),

    /// Discard the running frame.
    Cancel,

    /// Start a new frame with the project and tags of an earlier one.
    Restart(RestartArgs),

    /// Show the running frame.
    Status(StatusArgs),

    /// Record a frame after the fact.
    Add(AddArgs),

    /// List frames by day.
    Log(LogArgs),

    /// Time per project and tag over a range.
    Report(ReportArgs),

    /// Daily totals over a range.
    Aggregate(AggregateArgs),

    /// Change a frame.
    Edit(EditArgs),

    /// Delete a frame.
    #[command(alias = "rm")]
    Remove(RemoveArgs),

    /// Merge frames from another frames file.
    Merge(MergeArgs),

    /// List projects.
    Projects(ProjectsArgs),

    /// List tags.
    Tags(TagsArgs),

    /// List frame ids.
    Frames,

    /// Rename a project or tag.
    Rename(RenameArgs),

    /// Show the effective configuration.
    Config(ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_start_with_tags_and_global_flags() {
        let cli = Cli::try_parse_from(["tt", "-v", "start", "alpha", "+x", "--at", "10:00"]).unwrap();
        assert!(cli.verbose);
        let Some(Commands::Start(args)) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.words, vec!["alpha", "+x"]);
        assert_eq!(args.at.as_deref(), Some("10:00"));
    }

    #[test]
    fn parses_negative_frame_position() {
        let cli = Cli::try_parse_from(["tt", "remove", "-2", "--force"]).unwrap();
        let Some(Commands::Remove(args)) = cli.command else {
            panic!("expected remove");
        };
        assert_eq!(args.frame, "-2");
        assert!(args.force);
    }

    #[test]
    fn period_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["tt", "report", "--week", "--month"]).is_err());
        assert!(Cli::try_parse_from(["tt", "report", "--week", "-p", "alpha", "--json"]).is_ok());
    }
}
