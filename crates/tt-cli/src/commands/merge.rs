//! `tt merge`: fold another frames file into this one.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tt_core::{ConflictKind, ForcePolicy, ForcedResolver, Merger};

use super::util::format_tags;
use crate::app::App;
use crate::prompt::InteractiveResolver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// The incoming frame replaces the local one.
    #[default]
    Incoming,
    /// The most recently edited frame wins.
    Newest,
}

impl From<PolicyArg> for ForcePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Incoming => Self::IncomingWins,
            PolicyArg::Newest => Self::NewestWins,
        }
    }
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Frames file to merge in.
    pub file: PathBuf,

    /// Resolve conflicts without asking.
    #[arg(short, long)]
    pub force: bool,

    /// How `--force` resolves conflicts.
    #[arg(long, value_enum, default_value_t = PolicyArg::Incoming)]
    pub policy: PolicyArg,

    /// Only show what would happen.
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, args: &MergeArgs, app: &mut App) -> Result<()> {
    let incoming = tt_store::load_frames_file(&args.file)
        .with_context(|| format!("failed to load frames to merge from {}", args.file.display()))?;
    let merger = Merger::new(&app.store, &incoming);
    let plan = merger.plan();

    if plan.is_noop() {
        writeln!(writer, "Nothing to merge.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{} new frame(s), {} conflict(s)",
        plan.merged.len(),
        plan.conflicting.len()
    )?;
    if args.dry_run {
        for frame in &plan.merged {
            writeln!(writer, "\tadd {} {}{}", frame.id.short(), frame.project, format_tags(&frame.tags))?;
        }
        for conflict in &plan.conflicting {
            let kind = match conflict.kind {
                ConflictKind::Diverged => "diverged",
                ConflictKind::Overlap => "overlap",
            };
            writeln!(
                writer,
                "\t{kind} {} / {} {}",
                conflict.local.id.short(),
                conflict.incoming.id.short(),
                conflict.incoming.project
            )?;
        }
        return Ok(());
    }

    let merged = if args.force {
        merger.apply(&plan, &mut ForcedResolver::new(args.policy.into()))?
    } else {
        let mut resolver = InteractiveResolver::new(reader, &mut *writer);
        let merged = merger.apply(&plan, &mut resolver)?;
        resolver.finish().context("failed to ask about merge conflicts")?;
        merged
    };

    app.store = merged;
    app.save()?;
    writeln!(writer, "Merge complete.")?;
    Ok(())
}
