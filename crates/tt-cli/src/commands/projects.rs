//! `tt projects`, `tt tags` and `tt frames`: list what has been recorded.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use crate::app::App;

#[derive(Debug, Args)]
pub struct ProjectsArgs {
    /// Only projects that have every one of these tags.
    pub tags: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TagsArgs {
    /// Only tags used in every one of these projects.
    pub projects: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn projects<W: Write>(writer: &mut W, args: &ProjectsArgs, app: &App) -> Result<()> {
    write_names(writer, &app.store.projects(&args.tags), args.json)
}

pub fn tags<W: Write>(writer: &mut W, args: &TagsArgs, app: &App) -> Result<()> {
    write_names(writer, &app.store.tags(&args.projects), args.json)
}

/// Prints every frame id, oldest first. The running frame comes last.
pub fn frames<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    for frame in app.store.frames().iter().chain(app.store.active()) {
        writeln!(writer, "{}", frame.id.short())?;
    }
    Ok(())
}

fn write_names<W: Write>(writer: &mut W, names: &[String], json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(names)?)?;
    } else {
        for name in names {
            writeln!(writer, "{name}")?;
        }
    }
    Ok(())
}
