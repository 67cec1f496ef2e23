//! CLI subcommand implementations.

pub mod add;
pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod edit;
pub mod log;
pub mod merge;
pub mod projects;
pub mod query;
pub mod remove;
pub mod rename;
pub mod report;
pub mod restart;
pub mod start;
pub mod status;
pub mod stop;
pub mod util;
