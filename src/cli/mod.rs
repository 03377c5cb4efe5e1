//! CLI module
//!
//! Command-line interface: `remote-tail [OPTIONS] <URL>`.

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
