//! catalog-probe CLI library
//!
//! Command definitions, logging setup and subcommand handlers for the
//! `catalog-probe` binary.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, LogFormat, PlanArgs, ProfileArgs, RunArgs, ScenarioArg, TraceArg,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{outcome_line, summary_line, Reporter};
