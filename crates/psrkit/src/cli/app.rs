use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use super::commands::{
    downsample::DownsampleArgs, logspace::LogspaceArgs, need_rerun::NeedRerunArgs,
    observatory::ObservatoryArgs, rise_set::RiseSetArgs, write_if_changed::WriteIfChangedArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "psrkit",
    version,
    about = "Handy tools for pulsar observing and data wrangling"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Extra observatory table in tempo2 `observatories.dat` format.
    #[arg(long, global = true, value_name = "PATH")]
    pub observatories: Option<PathBuf>,

    /// Extra observatory aliases in tempo2 `aliases` format.
    #[arg(long, global = true, value_name = "PATH")]
    pub aliases: Option<PathBuf>,

    /// Extra source catalog with `NAME RA DEC [ALIAS ...]` lines.
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug); `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rise and set times of a source at an observatory.
    RiseSet(RiseSetArgs),
    /// Check whether outputs are older than their inputs, make-style.
    NeedRerun(NeedRerunArgs),
    /// Reduce a numeric table along an axis in blocks.
    Downsample(DownsampleArgs),
    /// Print logarithmically spaced values.
    Logspace(LogspaceArgs),
    /// Show what is known about an observatory.
    Observatory(ObservatoryArgs),
    /// Copy stdin to a file only if the contents differ.
    WriteIfChanged(WriteIfChangedArgs),
}
