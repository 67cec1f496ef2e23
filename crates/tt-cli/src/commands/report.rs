//! `tt report`: time per project and tag over a range.

use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use clap::Args;
use tt_core::{Report, ReportEngine};

use super::query::{CurrentArgs, FilterArgs, RangeArgs, frame_query};
use super::util::{format_duration, local_datetime};
use crate::app::App;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub current: CurrentArgs,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, app: &App) -> Result<()> {
    let now = app.now();
    let include_current = args.current.include(app.config.options.include_current);
    let (from, to) = args
        .range
        .resolve(&app.store, include_current, now, app.config.options.week_start)?;
    let query = frame_query(from, to, &args.filters, include_current);
    let report = ReportEngine::new(&app.store, Local, now).report(&query)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_report(writer, &report)?;
    }
    Ok(())
}

fn write_report<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    writeln!(
        writer,
        "{} -> {}",
        local_datetime(report.from),
        local_datetime(report.to)
    )?;

    for project in &report.projects {
        writeln!(writer)?;
        writeln!(writer, "{} - {}", project.name, format_duration(project.time))?;
        for tag in &project.tags {
            writeln!(writer, "\t[{} {}]", tag.name, format_duration(tag.time))?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "Total: {}", format_duration(report.total))
}
