use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Outcome of comparing input and output modification times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RerunDecision {
    OutputMissing { output: PathBuf },
    InputNewer { input: PathBuf, output: PathBuf },
    UpToDate,
}

impl RerunDecision {
    #[must_use]
    pub const fn needs_rerun(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }

    #[must_use]
    pub const fn reason_key(&self) -> &'static str {
        match self {
            Self::OutputMissing { .. } => "output_missing",
            Self::InputNewer { .. } => "input_newer",
            Self::UpToDate => "up_to_date",
        }
    }
}

/// Expands `@LIST` entries into the non-empty lines of the file `LIST`.
pub fn expand_inputs<I, P>(inputs: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut expanded = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let list_file = input
            .to_str()
            .and_then(|text| text.strip_prefix('@'))
            .filter(|rest| !rest.is_empty());
        match list_file {
            Some(list_file) => {
                let text = std::fs::read_to_string(list_file)
                    .with_context(|| format!("failed to read input list: {list_file}"))?;
                expanded.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(PathBuf::from),
                );
            }
            None => expanded.push(input.to_path_buf()),
        }
    }
    Ok(expanded)
}

/// Decides whether a command producing `outputs` from `inputs` must run
/// again, make-style.
///
/// A rerun is needed when any output is missing or when some input was
/// modified strictly after the oldest output. Inputs written as `@LIST`
/// are expanded with [`expand_inputs`].
pub fn need_rerun<I, O, P, Q>(inputs: I, outputs: O) -> Result<RerunDecision>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    O: IntoIterator<Item = Q>,
    Q: AsRef<Path>,
{
    let outputs = outputs
        .into_iter()
        .map(|path| path.as_ref().to_path_buf())
        .collect::<Vec<_>>();
    if outputs.is_empty() {
        bail!("no outputs specified");
    }
    let inputs = expand_inputs(inputs)?;

    let mut oldest: Option<(SystemTime, &Path)> = None;
    for output in &outputs {
        if !output.exists() {
            info!(output = %output.display(), "output missing");
            return Ok(RerunDecision::OutputMissing {
                output: output.clone(),
            });
        }
        let modified = modified_time(output)?;
        if oldest.is_none_or(|(time, _)| modified < time) {
            oldest = Some((modified, output.as_path()));
        }
    }
    let Some((oldest_time, oldest_output)) = oldest else {
        bail!("no outputs specified");
    };

    for input in &inputs {
        let modified = modified_time(input)?;
        if modified > oldest_time {
            info!(
                input = %input.display(),
                output = %oldest_output.display(),
                "input newer than output"
            );
            debug!(
                input_mtime = %describe_time(modified),
                output_mtime = %describe_time(oldest_time),
                "modification times"
            );
            return Ok(RerunDecision::InputNewer {
                input: input.clone(),
                output: oldest_output.to_path_buf(),
            });
        }
    }

    Ok(RerunDecision::UpToDate)
}

/// Writes `contents` to `path` only when they differ from what is on disk.
///
/// Returns whether the file was written. Leaving identical files alone keeps
/// their modification times stable for [`need_rerun`].
pub fn write_file_if_changed(path: &Path, contents: impl AsRef<[u8]>) -> Result<bool> {
    let contents = contents.as_ref();
    if path.exists() {
        let existing = std::fs::read(path)
            .with_context(|| format!("failed to read file: {}", path.display()))?;
        if existing == contents {
            debug!(path = %path.display(), "contents unchanged; not writing");
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(true)
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .with_context(|| format!("failed to read modification time: {}", path.display()))
}

fn describe_time(time: SystemTime) -> String {
    let datetime = OffsetDateTime::from(time);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
        datetime.year(),
        u8::from(datetime.month()),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second(),
        datetime.nanosecond()
    )
}
