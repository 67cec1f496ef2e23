//! `tt remove`: delete a frame.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::Args;
use tt_core::FrameRef;

use super::util::{format_tags, local_datetime};
use crate::app::App;
use crate::prompt::confirm;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Frame id, id prefix or negative position.
    #[arg(allow_negative_numbers = true)]
    pub frame: String,

    /// Don't ask for confirmation.
    #[arg(short, long)]
    pub force: bool,
}

pub fn run<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, args: &RemoveArgs, app: &mut App) -> Result<()> {
    let reference = args.frame.parse::<FrameRef>()?;
    let frame = app.store.get(&reference)?;

    if !args.force {
        let question = format!(
            "Remove frame {} ({}{}, started {})?",
            frame.id.short(),
            frame.project,
            format_tags(&frame.tags),
            local_datetime(frame.start)
        );
        if !confirm(reader, writer, &question)? {
            writeln!(writer, "Aborted.")?;
            return Ok(());
        }
    }

    let removed = app.store.remove(&reference)?;
    app.save()?;
    writeln!(writer, "Frame {} removed.", removed.id.short())?;
    Ok(())
}
