//! Field mapping suggestion CLI.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use onboard_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg, OutputFormatArg};
use onboard_cli::commands::{run_explain, run_parse_reply, run_prompt, run_suggest};
use onboard_cli::logging::{LogConfig, LogFormat, init_logging};
use onboard_cli::output;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(&cli.command) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(command: &Command) -> Result<()> {
    match command {
        Command::Suggest(args) => {
            let report = run_suggest(args)?;
            match args.inputs.format {
                OutputFormatArg::Table => {
                    println!("{}", output::suggestions_table(&report));
                    println!("{}", output::summary_line(&report));
                }
                OutputFormatArg::Json => println!("{}", output::suggestions_json(&report)?),
            }
        }
        Command::Explain(args) => {
            let report = run_explain(args)?;
            match args.inputs.format {
                OutputFormatArg::Table => {
                    if report.candidates.is_empty() {
                        println!("No candidate columns for {}", report.field);
                    } else {
                        println!("{}", output::explain_table(&report));
                    }
                }
                OutputFormatArg::Json => println!("{}", output::explain_json(&report)?),
            }
        }
        Command::ParseReply(args) => {
            let parsed = run_parse_reply(args)?;
            match args.format {
                OutputFormatArg::Table => println!("{}", output::reply_table(&parsed)),
                OutputFormatArg::Json => println!("{}", output::reply_json(&parsed)?),
            }
        }
        Command::Prompt(args) => print!("{}", run_prompt(args)?),
    }
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
