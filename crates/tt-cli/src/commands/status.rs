//! `tt status`: show the running frame.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use super::util::{format_duration, format_tags, local_datetime};
use crate::app::App;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Status<'a> {
    id: &'a str,
    project: &'a str,
    tags: &'a [String],
    start: DateTime<Utc>,
    elapsed: i64,
}

pub fn run<W: Write>(writer: &mut W, args: &StatusArgs, app: &App) -> Result<()> {
    let now = app.now();
    let active = app.store.active();

    if args.json {
        let status = active.map(|frame| Status {
            id: frame.id.as_str(),
            project: &frame.project,
            tags: &frame.tags,
            start: frame.start,
            elapsed: frame.duration(now).num_seconds(),
        });
        writeln!(writer, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(());
    }

    match active {
        Some(frame) => writeln!(
            writer,
            "Project {}{} started {} ago ({})",
            frame.project,
            format_tags(&frame.tags),
            format_duration(frame.duration(now)),
            local_datetime(frame.start)
        )?,
        None => writeln!(writer, "No project started.")?,
    }
    Ok(())
}
