//! `gridbind` command-line entry point.

use std::io::{self, IsTerminal};
use std::rc::Rc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use grid_cli::commands::{run_fields, run_layout, run_simulate, run_sources};
use grid_cli::logging::{LogConfig, LogFormat, init_logging};
use grid_cli::render::TableStyle;
use grid_cli::settings::{Settings, load_settings};
use grid_cli::simulation::SimulationConfig;
use grid_model::FieldSourceDefinitionCache;
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, SimulateArgs, TableStyleArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref());
    let cache = Rc::new(FieldSourceDefinitionCache::new());
    let style = match cli.table_style {
        TableStyleArg::Rounded => TableStyle::Rounded,
        TableStyleArg::Markdown => TableStyle::Markdown,
    };
    match cli.command {
        Command::Sources => println!("{}", run_sources(&cache, style)),
        Command::Fields(args) => println!("{}", run_fields(&cache, &args.sources, style)),
        Command::Layout(args) => println!(
            "{}",
            run_layout(
                &cache,
                &args.file,
                &args.sources,
                args.write,
                &settings,
                style
            )?
        ),
        Command::Simulate(args) => {
            let (settings, config) = simulation_config(settings, &args);
            let (_, rendered) =
                run_simulate(&cache, &config, args.layout.as_deref(), &settings, style)?;
            println!("{rendered}");
        }
    }
    Ok(())
}

/// Flags override the settings file.
fn simulation_config(mut settings: Settings, args: &SimulateArgs) -> (Settings, SimulationConfig) {
    let mut config = SimulationConfig::from(&settings.simulation);
    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(sources) = &args.sources {
        config.field_sources = sources.clone();
    }
    settings.display.show_hidden |= args.show_hidden;
    (settings, config)
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
