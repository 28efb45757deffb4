use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::array::{NdArray, Reduction, downsample_with};

#[derive(Debug, Clone, Args)]
pub struct DownsampleArgs {
    /// Whitespace-separated numeric table, or `-` for stdin.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[arg(long)]
    pub factor: usize,

    /// Axis to reduce: 0 for rows, 1 (or -1) for columns.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub axis: isize,

    /// One of mean, sum, product, max, min.
    #[arg(long, default_value = "mean")]
    pub reduce: Reduction,
}

pub fn run(args: &DownsampleArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let table = parse_table(&text)
        .with_context(|| format!("downsample: invalid table in {}", args.input.display()))?;
    let reduced = downsample_with(&table, args.factor, args.axis, args.reduce)?;
    print!("{}", render_table(&reduced));
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Parses rows of whitespace-separated numbers; blank and `#` lines are
/// skipped. The result is always two-dimensional.
pub fn parse_table(text: &str) -> Result<NdArray> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .with_context(|| format!("line {}: not a number: {token}", index + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("table has no rows");
    }
    Ok(NdArray::from_rows(&rows)?)
}

#[must_use]
pub fn render_table(table: &NdArray) -> String {
    let mut out = String::new();
    for row in table.rows().unwrap_or_default() {
        let line = row
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
