//! `tt log`: list frames, grouped by local day.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use chrono::{Local, NaiveDate, TimeDelta};
use clap::Args;
use tt_core::Frame;

use super::query::{CurrentArgs, FilterArgs, RangeArgs, frame_query};
use super::util::{format_duration, format_tags, local_time};
use crate::app::App;

#[derive(Debug, Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub current: CurrentArgs,

    /// Newest day first.
    #[arg(short, long)]
    pub reverse: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &LogArgs, app: &App) -> Result<()> {
    let now = app.now();
    let include_current = args.current.include(app.config.options.include_current);
    let (from, to) = args
        .range
        .resolve(&app.store, include_current, now, app.config.options.week_start)?;
    let query = frame_query(from, to, &args.filters, include_current).chronological(true);
    let frames = app.store.filter(&query, now)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&frames)?)?;
        return Ok(());
    }

    let mut days: BTreeMap<NaiveDate, Vec<&Frame>> = BTreeMap::new();
    for frame in &frames {
        days.entry(frame.start.with_timezone(&Local).date_naive())
            .or_default()
            .push(frame);
    }
    let mut days: Vec<_> = days.into_iter().collect();
    if args.reverse {
        days.reverse();
    }

    for (index, (date, frames)) in days.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }
        let total = frames
            .iter()
            .fold(TimeDelta::zero(), |total, frame| total + frame.duration(now));
        writeln!(writer, "{} ({})", date.format("%A %d %B %Y"), format_duration(total))?;
        for frame in frames {
            let stop = frame.stop.map_or_else(|| "now".to_string(), local_time);
            writeln!(
                writer,
                "\t{}  {} to {}  {:>8}  {}{}",
                frame.id.short(),
                local_time(frame.start),
                stop,
                format_duration(frame.duration(now)),
                frame.project,
                format_tags(&frame.tags)
            )?;
        }
    }
    Ok(())
}
