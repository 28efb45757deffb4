use anyhow::Result;
use clap::Args;

use crate::utils::spacing::logspace_exp;

#[derive(Debug, Clone, Args)]
pub struct LogspaceArgs {
    #[arg(value_name = "START", allow_negative_numbers = true)]
    pub start: f64,

    #[arg(value_name = "STOP", allow_negative_numbers = true)]
    pub stop: f64,

    #[arg(long, default_value_t = 50)]
    pub num: usize,

    /// Leave STOP out of the samples.
    #[arg(long, default_value_t = false)]
    pub no_endpoint: bool,
}

pub fn run(args: &LogspaceArgs) -> Result<()> {
    for value in logspace_exp(args.start, args.stop, args.num, !args.no_endpoint)? {
        println!("{value}");
    }
    Ok(())
}
