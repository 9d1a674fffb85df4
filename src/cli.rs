// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `makedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "makedag",
    version,
    about = "Build out-of-date targets from a TOML build description, make style.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build file (TOML).
    #[arg(short = 'f', long = "file", value_name = "PATH", default_value = "Makedag.toml")]
    pub file: String,

    /// Maximum number of jobs to run at once.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Keep building unrelated targets after an error.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Ignore failing recipe lines.
    #[arg(short = 'i', long)]
    pub ignore_errors: bool,

    /// Print recipe lines instead of running them.
    #[arg(short = 'n', long, conflicts_with = "query")]
    pub no_execute: bool,

    /// Run nothing; exit 1 if any goal is out of date.
    #[arg(short = 'q', long)]
    pub query: bool,

    /// Do not echo recipe lines.
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Request children in random order, to expose missing dependencies.
    #[arg(long)]
    pub randomize: bool,

    /// Seed for `--randomize`.
    #[arg(long, value_name = "SEED", requires = "randomize")]
    pub seed: Option<u64>,

    /// Populate and resolve the graph, print it, and exit.
    #[arg(long)]
    pub print_graph: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MAKEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Goals to build instead of the main target.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
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
