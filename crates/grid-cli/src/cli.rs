//! CLI argument definitions for `gridbind`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use grid_model::FieldSourceTypeId;

#[derive(Parser)]
#[command(
    name = "gridbind",
    version,
    about = "Inspect field sources and layouts, and drive a live record source",
    long_about = "Inspect the field catalogs a grid can bind to, normalise persisted \
                  grid layouts, and run a deterministic market simulation through a \
                  live record source."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (TOML). Missing or malformed files fall back to defaults.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Table style for printed output.
    #[arg(
        long = "table-style",
        value_enum,
        default_value = "rounded",
        global = true
    )]
    pub table_style: TableStyleArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every field source type.
    Sources,

    /// List the fields of one or more field sources.
    Fields(FieldsArgs),

    /// Load a persisted grid layout and resolve it against field sources.
    Layout(LayoutArgs),

    /// Run a market simulation through a record source and print the grid.
    Simulate(SimulateArgs),
}

#[derive(Parser)]
pub struct FieldsArgs {
    /// Field source names (Symbol, Security, NotificationChannel, ScanMatch).
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<FieldSourceTypeId>,
}

#[derive(Parser)]
pub struct LayoutArgs {
    /// Layout definition file (JSON).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Field sources the layout may reference.
    #[arg(
        long = "sources",
        value_name = "SOURCE",
        num_args = 1..,
        default_values = ["Symbol", "Security"]
    )]
    pub sources: Vec<FieldSourceTypeId>,

    /// Rewrite the file with the normalised layout.
    #[arg(long = "write")]
    pub write: bool,
}

#[derive(Parser)]
pub struct SimulateArgs {
    /// Number of securities in the list.
    #[arg(long = "rows", value_name = "N")]
    pub rows: Option<usize>,

    /// Number of market ticks to apply.
    #[arg(long = "ticks", value_name = "N")]
    pub ticks: Option<usize>,

    /// Seed for the tick sequence.
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Field sources to activate (must be Symbol and/or Security).
    #[arg(long = "sources", value_name = "SOURCE", num_args = 1..)]
    pub sources: Option<Vec<FieldSourceTypeId>>,

    /// Layout definition file choosing the printed columns.
    #[arg(long = "layout", value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Print hidden layout columns too.
    #[arg(long = "show-hidden")]
    pub show_hidden: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

/// CLI table style choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum TableStyleArg {
    Rounded,
    Markdown,
}
