//! `tt stop`: stop the running frame.

use std::io::{self, Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use tt_core::Frame;

use super::util::{format_duration, format_tags, parse_datetime};
use crate::app::App;

#[derive(Debug, Args)]
pub struct StopArgs {
    /// Stop time (default: now).
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &StopArgs, app: &mut App) -> Result<()> {
    let now = app.now();
    let at = args.at.as_deref().map(|at| parse_datetime(at, now)).transpose()?;
    let frame = app.session().stop(at)?;
    app.save()?;
    write_stopped(writer, &frame, frame.end_or(now))?;
    Ok(())
}

/// Reports a frame that was stopped at `at`.
pub(crate) fn write_stopped<W: Write>(writer: &mut W, frame: &Frame, at: DateTime<Utc>) -> io::Result<()> {
    writeln!(
        writer,
        "Stopping project {}{} after {} (id: {})",
        frame.project,
        format_tags(&frame.tags),
        format_duration(at - frame.start),
        frame.id.short()
    )
}
