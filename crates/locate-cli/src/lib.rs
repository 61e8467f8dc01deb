//! Locador CLI Library
//!
//! Command-line interface for Locate: runs YAML resolution scenarios against
//! a scripted driver on virtual time and prints the effective settings.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, ConfigOutputFormat, RunArgs, RunOutputFormat,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::{render_json, ReportPrinter};
pub use runner::{check_reports, load_scenario, render_config, ScenarioBatch};
