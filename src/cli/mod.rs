//! Command-line interface
//!
//! `probe`, `plan`, `run` and `config` subcommands on top of the library,
//! with global flags that feed the configuration layers.

pub mod commands;
pub mod output;

pub use commands::Cli;
pub use output::Output;
