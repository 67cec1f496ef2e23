use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tt_cli::commands::{
    add, aggregate, cancel, config, edit, log, merge, projects, remove, rename, report, restart,
    start, status, stop,
};
use tt_cli::{App, Cli, Commands, Config};

/// Load config and open the data directory.
fn open_app(config_path: Option<&Path>) -> Result<App> {
    let config = load_config(config_path)?;
    App::open(config)
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config_path = cli.config.as_deref();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Start(args)) => start::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Stop(args)) => stop::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Cancel) => cancel::run(&mut out, &mut open_app(config_path)?)?,
        Some(Commands::Restart(args)) => restart::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Status(args)) => status::run(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Add(args)) => add::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Log(args)) => log::run(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Report(args)) => report::run(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Aggregate(args)) => aggregate::run(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Edit(args)) => edit::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Remove(args)) => {
            let mut app = open_app(config_path)?;
            remove::run(&mut io::stdin().lock(), &mut out, args, &mut app)?;
        }
        Some(Commands::Merge(args)) => {
            let mut app = open_app(config_path)?;
            merge::run(&mut io::stdin().lock(), &mut out, args, &mut app)?;
        }
        Some(Commands::Projects(args)) => projects::projects(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Tags(args)) => projects::tags(&mut out, args, &open_app(config_path)?)?,
        Some(Commands::Frames) => projects::frames(&mut out, &open_app(config_path)?)?,
        Some(Commands::Rename(args)) => rename::run(&mut out, args, &mut open_app(config_path)?)?,
        Some(Commands::Config(args)) => config::run(&mut out, args, &load_config(config_path)?)?,
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
