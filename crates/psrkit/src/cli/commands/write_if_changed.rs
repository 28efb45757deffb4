use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::utils::files::write_file_if_changed;

#[derive(Debug, Clone, Args)]
pub struct WriteIfChangedArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

pub fn run(args: &WriteIfChangedArgs) -> Result<()> {
    let mut contents = Vec::new();
    std::io::stdin()
        .read_to_end(&mut contents)
        .context("failed to read stdin")?;
    let written = write_file_if_changed(&args.path, &contents)?;
    println!(
        "write-if-changed: written={written} path={}",
        args.path.display()
    );
    Ok(())
}
