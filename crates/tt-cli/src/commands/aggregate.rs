//! `tt aggregate`: daily totals over a range.

use std::io::Write;

use anyhow::Result;
use chrono::Local;
use clap::Args;
use tt_core::{DayAttribution, ReportEngine};

use super::query::{CurrentArgs, FilterArgs, RangeArgs, local_days};
use super::util::{format_duration, format_tags};
use crate::app::App;

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub current: CurrentArgs,

    /// Split frames that cross midnight between both days instead of
    /// counting them on the day they started.
    #[arg(long)]
    pub split: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &AggregateArgs, app: &App) -> Result<()> {
    let now = app.now();
    let include_current = args.current.include(app.config.options.include_current);
    let (from, to) = args
        .range
        .resolve(&app.store, include_current, now, app.config.options.week_start)?;
    let (from_day, to_day) = local_days(from, to);
    let attribution = if args.split {
        DayAttribution::Split
    } else {
        DayAttribution::StartDay
    };

    let days = ReportEngine::new(&app.store, Local, now).aggregate(
        from_day,
        to_day,
        &args.filters.to_filter(),
        include_current,
        attribution,
    )?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&days)?)?;
        return Ok(());
    }

    for (index, day) in days.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "{} - {}", day.date.format("%A %d %B %Y"), format_duration(day.total))?;
        for entry in &day.entries {
            writeln!(
                writer,
                "\t{}{} {}",
                entry.project,
                format_tags(&entry.tags),
                format_duration(entry.duration)
            )?;
        }
    }
    Ok(())
}
