// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::model::WindowTypeKey;

/// Command-line arguments for `orca`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "orca",
    version,
    about = "Validate an analytics processor manifest and show the DAG each window type triggers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Orca.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Orca.toml")]
    pub config: String,

    /// Only show the plan for windows of this type (`NAME@VERSION`).
    #[arg(long, value_name = "NAME@VERSION")]
    pub window: Option<WindowTypeKey>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ORCA_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
