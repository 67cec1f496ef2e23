//! `tt restart`: start a new frame like an earlier one.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tt_core::FrameRef;

use super::stop::write_stopped;
use super::util::{format_tags, local_time, parse_datetime};
use crate::app::App;

#[derive(Debug, Args)]
pub struct RestartArgs {
    /// Frame id, id prefix or negative position (default: the last frame).
    #[arg(allow_negative_numbers = true)]
    pub frame: Option<String>,

    /// Start time (default: now).
    #[arg(long)]
    pub at: Option<String>,

    /// Extend the previous frame up to the new start.
    #[arg(long, overrides_with = "no_stretch")]
    pub stretch: bool,

    #[arg(long)]
    pub no_stretch: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &RestartArgs, app: &mut App) -> Result<()> {
    let now = app.now();
    let at = args.at.as_deref().map(|at| parse_datetime(at, now)).transpose()?.unwrap_or(now);
    let reference = args.frame.as_deref().map(str::parse::<FrameRef>).transpose()?;
    let stretch = args.stretch || (app.config.options.autostretch_on_start && !args.no_stretch);

    let previous = app.store.active().cloned();
    let frame = app.session().restart(reference.as_ref(), at, stretch)?;
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
