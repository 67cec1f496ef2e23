//! `tt edit`: change a recorded or running frame.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use tt_core::{FrameRef, FrameUpdate};

use super::util::{format_tags, local_datetime, parse_datetime};
use crate::app::App;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Frame id, id prefix or negative position (default: the running
    /// frame, else the last one).
    #[arg(allow_negative_numbers = true)]
    pub frame: Option<String>,

    /// New project name.
    #[arg(long)]
    pub project: Option<String>,

    /// Replace the tags (repeatable).
    #[arg(short = 'a', long = "tag")]
    pub tags: Vec<String>,

    /// Remove every tag.
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,

    /// New start time.
    #[arg(long)]
    pub start: Option<String>,

    /// New stop time.
    #[arg(long)]
    pub stop: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &EditArgs, app: &mut App) -> Result<()> {
    let now = app.now();
    let reference = match &args.frame {
        Some(frame) => frame.parse::<FrameRef>()?,
        None => app.store.active().map_or(FrameRef::LAST, |active| FrameRef::from(&active.id)),
    };

    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags.clone())
    };
    let update = FrameUpdate {
        project: args.project.clone(),
        tags,
        start: args.start.as_deref().map(|at| parse_datetime(at, now)).transpose()?,
        stop: args.stop.as_deref().map(|at| parse_datetime(at, now)).transpose()?,
    };
    if update.is_empty() {
        bail!("nothing to edit: pass --project, --tag, --clear-tags, --start or --stop");
    }

    let frame = app.store.update(&reference, update, now)?;
    app.save()?;

    let stop = frame.stop.map_or_else(|| "now".to_string(), local_datetime);
    writeln!(
        writer,
        "Edited frame {}: {}{} from {} to {}",
        frame.id.short(),
        frame.project,
        format_tags(&frame.tags),
        local_datetime(frame.start),
        stop
    )?;
    Ok(())
}
