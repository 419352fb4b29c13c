//! CLI argument definitions for the `onboard` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "onboard",
    version,
    about = "Suggest which source columns fill each target field",
    long_about = "Suggest which uploaded source columns fill each field of a target layout.\n\n\
                  Combines exact, fuzzy, semantic, contextual and value-pattern matching,\n\
                  optionally boosted by previously recorded user corrections."
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Suggest a source column for every target field.
    Suggest(SuggestArgs),

    /// Show every candidate column for one field with its score breakdown.
    Explain(ExplainArgs),

    /// Turn an assistant's reply into suggestions.
    ParseReply(ParseReplyArgs),

    /// Print a prompt to paste into an external assistant.
    Prompt(SchemaArgs),
}

/// Source and target schema files.
#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// JSON array of source columns (`name`, `dtype`, `samples`, `label`).
    #[arg(long = "source", value_name = "FILE")]
    pub source: PathBuf,

    /// JSON array of target fields (`name`, `description`, `category`, ...).
    #[arg(long = "target", value_name = "FILE")]
    pub target: PathBuf,
}

/// Inputs shared by the matching commands.
#[derive(Debug, Clone, Args)]
pub struct MatchArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// JSON object with `groups`, `types` and `descriptions` hints.
    #[arg(long = "context", value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// JSON matcher configuration (weights, thresholds, cache settings).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a preset instead of the default configuration.
    #[arg(long = "preset", value_enum, conflicts_with = "config")]
    pub preset: Option<PresetArg>,

    /// Correction history saved from a previous session.
    #[arg(long = "corrections", value_name = "FILE")]
    pub corrections: Option<PathBuf>,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Debug, Clone, Parser)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub inputs: MatchArgs,

    /// Match fields on the rayon thread pool.
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Prior `{field: {"value": column}}` mapping to keep where still valid.
    #[arg(long = "prior", value_name = "FILE")]
    pub prior: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct ExplainArgs {
    /// Target field to explain.
    #[arg(value_name = "FIELD")]
    pub field: String,

    #[command(flatten)]
    pub inputs: MatchArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct ParseReplyArgs {
    /// File holding the assistant's reply text.
    #[arg(value_name = "REPLY_FILE")]
    pub reply_file: PathBuf,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Strict,
    Relaxed,
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
