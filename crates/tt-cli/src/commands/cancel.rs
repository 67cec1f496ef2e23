//! `tt cancel`: discard the running frame.

use std::io::Write;

use anyhow::Result;

use super::util::format_tags;
use crate::app::App;

pub fn run<W: Write>(writer: &mut W, app: &mut App) -> Result<()> {
    let frame = app.session().cancel()?;
    app.save()?;
    writeln!(
        writer,
        "Canceling the timer for project {}{}",
        frame.project,
        format_tags(&frame.tags)
    )?;
    Ok(())
}
