#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use psrkit::cli::app::{Cli, Command, RuntimeArgs};
use psrkit::cli::commands;
use psrkit::config::{RuntimeConfig, TableOverrides};
use psrkit::utils::logging;
use tracing::info;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_UP_TO_DATE: i32 = 3;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    logging::init_cli_logger(cli.runtime.verbose);
    let command_name = command_name(&cli.command);
    info!("psrkit: starting `{command_name}`");

    match execute(cli) {
        Ok(exit_code) => {
            info!("psrkit: completed `{command_name}` (exit_code={exit_code})");
            exit_code
        }
        Err(error) => {
            eprintln!("psrkit: failed `{command_name}` (exit_code={EXIT_RUNTIME_FAILURE})");
            eprintln!("{error:#}");
            EXIT_RUNTIME_FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::RiseSet(args) => {
            let config = resolve_runtime_config(&cli.runtime)?;
            commands::rise_set::run(&args, &config)?;
        }
        Command::Observatory(args) => {
            let config = resolve_runtime_config(&cli.runtime)?;
            commands::observatory::run(&args, &config)?;
        }
        Command::NeedRerun(args) => {
            let decision = commands::need_rerun::run(&args)?;
            if args.exit_status && !decision.needs_rerun() {
                return Ok(EXIT_UP_TO_DATE);
            }
        }
        Command::Downsample(args) => commands::downsample::run(&args)?,
        Command::Logspace(args) => commands::logspace::run(&args)?,
        Command::WriteIfChanged(args) => commands::write_if_changed::run(&args)?,
    }
    Ok(EXIT_SUCCESS)
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::RiseSet(_) => "rise-set",
        Command::NeedRerun(_) => "need-rerun",
        Command::Downsample(_) => "downsample",
        Command::Logspace(_) => "logspace",
        Command::Observatory(_) => "observatory",
        Command::WriteIfChanged(_) => "write-if-changed",
    }
}

fn resolve_runtime_config(args: &RuntimeArgs) -> Result<RuntimeConfig> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let tempo2_dir = std::env::var_os("TEMPO2")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let overrides = TableOverrides {
        observatories: args.observatories.as_deref(),
        aliases: args.aliases.as_deref(),
        catalog: args.catalog.as_deref(),
        tempo2_dir: tempo2_dir.as_deref(),
    };
    psrkit::config::resolve_runtime_config(&home_dir, &cwd, &overrides)
}
