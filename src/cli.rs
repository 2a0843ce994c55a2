// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pipetask`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipetask",
    version,
    about = "Run external-process tasks over work items with retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    ///
    /// Default: `Pipeline.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Pipeline.toml")]
    pub config: String,

    /// Only run the named item(s). May be given more than once.
    #[arg(long = "item", value_name = "NAME")]
    pub items: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPETASK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved commands, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Echo each item's process output to stdout while it runs.
    ///
    /// Overrides `[config].echo_output` when set.
    #[arg(long)]
    pub echo_output: bool,
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
