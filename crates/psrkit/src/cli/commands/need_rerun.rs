use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::utils::files::{RerunDecision, need_rerun};

#[derive(Debug, Clone, Args)]
pub struct NeedRerunArgs {
    /// Input file, or `@LIST` naming a file with one input per line.
    #[arg(long = "input", value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Output file; at least one is required.
    #[arg(long = "output", value_name = "PATH", required = true)]
    pub outputs: Vec<PathBuf>,

    /// Exit 0 when a rerun is needed and 3 when everything is up to date.
    #[arg(long, default_value_t = false)]
    pub exit_status: bool,
}

pub fn run(args: &NeedRerunArgs) -> Result<RerunDecision> {
    let decision = need_rerun(&args.inputs, &args.outputs)?;
    println!("{}", render_decision(&decision));
    Ok(decision)
}

#[must_use]
pub fn render_decision(decision: &RerunDecision) -> String {
    let mut line = format!(
        "need-rerun: rerun={} reason={}",
        decision.needs_rerun(),
        decision.reason_key()
    );
    match decision {
        RerunDecision::OutputMissing { output } => {
            line.push_str(&format!(" output={}", output.display()));
        }
        RerunDecision::InputNewer { input, output } => {
            line.push_str(&format!(
                " input={} output={}",
                input.display(),
                output.display()
            ));
        }
        RerunDecision::UpToDate => {}
    }
    line
}
