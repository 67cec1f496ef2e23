//! Time tracker CLI library.
//!
//! This crate provides the `tt` command-line interface over the frame store.

pub mod app;
mod cli;
pub mod commands;
mod config;
pub mod prompt;

pub use app::App;
pub use cli::{Cli, Commands};
pub use config::{Config, Options, TagList};
