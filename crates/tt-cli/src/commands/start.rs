//! `tt start`: begin tracking a project.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use super::stop::write_stopped;
use super::util::{format_tags, local_time, parse_datetime, parse_project_and_tags};
use crate::app::App;

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Project name followed by optional `+tag` words.
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,

    /// Start time (default: now).
    #[arg(long)]
    pub at: Option<String>,

    /// Extend the previous frame up to the new start.
    #[arg(long, overrides_with = "no_stretch")]
    pub stretch: bool,

    #[arg(long)]
    pub no_stretch: bool,

    /// Reuse the tags the project was last tracked with.
    #[arg(long, overrides_with = "no_restart")]
    pub restart: bool,

    #[arg(long)]
    pub no_restart: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &StartArgs, app: &mut App) -> Result<()> {
    let (project, tags) = parse_project_and_tags(&args.words)?;
    let now = app.now();
    let at = args.at.as_deref().map(|at| parse_datetime(at, now)).transpose()?.unwrap_or(now);

    let options = &app.config.options;
    let stretch = args.stretch || (options.autostretch_on_start && !args.no_stretch);
    let restart = args.restart || (options.restart_on_start && !args.no_restart);

    let previous = app.store.active().cloned();
    let mut session = app.session();
    let frame = if restart {
        session.restart_project(&project, &tags, at, stretch)?
    } else {
        session.start(&project, &tags, at, stretch)?
    };
    app.save()?;

    if let Some(previous) = previous {
        write_stopped(writer, &previous, at)?;
    }
    writeln!(
        writer,
        "Starting project {}{} at {}",
        frame.project,
        format_tags(&frame.tags),
        local_time(frame.start)
    )?;
    Ok(())
}
