// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::{BackwardReadiness, Dispatch};

/// Command-line arguments for `gradflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gradflow",
    version,
    about = "Run forward and backward passes over an operator graph on a worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph file (TOML).
    ///
    /// Default: `Gradflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Override `[config].workers` from the graph file.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Override `[config].dispatch` (polling, counted).
    #[arg(long, value_name = "MODE")]
    pub dispatch: Option<Dispatch>,

    /// Override `[config].backward_readiness` (first_successor, all_successors).
    #[arg(long, value_name = "POLICY")]
    pub backward_readiness: Option<BackwardReadiness>,

    /// Stop after the forward pass.
    #[arg(long)]
    pub forward_only: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GRADFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't run any pass.
    #[arg(long)]
    pub dry_run: bool,
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
