//! `tt rename`: rename a project or tag everywhere.

use std::io::Write;

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenameKind {
    Project,
    Tag,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// What to rename.
    #[arg(value_enum)]
    pub kind: RenameKind,

    /// Current name.
    pub old: String,

    /// New name.
    pub new: String,
}

pub fn run<W: Write>(writer: &mut W, args: &RenameArgs, app: &mut App) -> Result<()> {
    let now = app.now();
    let (label, count) = match args.kind {
        RenameKind::Project => ("project", app.store.rename_project(&args.old, &args.new, now)?),
        RenameKind::Tag => ("tag", app.store.rename_tag(&args.old, &args.new, now)?),
    };
    app.save()?;
    writeln!(
        writer,
        "Renamed {label} \"{}\" to \"{}\" in {count} frame(s)",
        args.old, args.new
    )?;
    Ok(())
}
