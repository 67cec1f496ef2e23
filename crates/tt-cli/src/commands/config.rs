//! `tt config`: show the effective configuration.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use crate::Config;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Dotted key to show, such as `options.stop_on_start`.
    pub key: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &ConfigArgs, config: &Config) -> Result<()> {
    let root = serde_json::to_value(config)?;
    let value = match &args.key {
        Some(key) => key
            .split('.')
            .try_fold(&root, |value, part| value.get(part))
            .with_context(|| format!("unknown configuration key: {key}"))?,
        None => &root,
    };

    match value {
        Value::String(text) => writeln!(writer, "{text}")?,
        Value::Bool(_) | Value::Number(_) => writeln!(writer, "{value}")?,
        _ => writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?,
    }
    Ok(())
}
