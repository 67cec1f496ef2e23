//! `tt add`: record a finished frame after the fact.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use super::util::{format_tags, local_datetime, parse_datetime, parse_project_and_tags};
use crate::app::App;

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Project name followed by optional `+tag` words.
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,

    /// When the work started.
    #[arg(short, long)]
    pub from: String,

    /// When the work ended.
    #[arg(short, long)]
    pub to: String,
}

pub fn run<W: Write>(writer: &mut W, args: &AddArgs, app: &mut App) -> Result<()> {
    let (project, tags) = parse_project_and_tags(&args.words)?;
    let now = app.now();
    let from = parse_datetime(&args.from, now)?;
    let to = parse_datetime(&args.to, now)?;

    let frame = app.store.add(&project, &tags, from, Some(to), now)?;
    app.save()?;

    writeln!(
        writer,
        "Adding project {}{}, started {} and stopped {} (id: {})",
        frame.project,
        format_tags(&frame.tags),
        local_datetime(from),
        local_datetime(to),
        frame.id.short()
    )?;
    Ok(())
}
