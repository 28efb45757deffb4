use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

/// An optional data table supplied at runtime.
///
/// Tables named explicitly on the command line are `required`; tables
/// discovered through `$TEMPO2` are skipped with a warning when unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub path: PathBuf,
    pub required: bool,
}

/// Data tables to load on top of the bundled ones, with every path
/// already expanded and made absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub observatories: Option<TableSource>,
    pub aliases: Option<TableSource>,
    pub catalog: Option<TableSource>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOverrides<'a> {
    pub observatories: Option<&'a Path>,
    pub aliases: Option<&'a Path>,
    pub catalog: Option<&'a Path>,
    pub tempo2_dir: Option<&'a Path>,
}

pub fn resolve_runtime_config(
    home_dir: &Path,
    cwd: &Path,
    overrides: &TableOverrides<'_>,
) -> Result<RuntimeConfig> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let explicit = |path: Option<&Path>| -> Result<Option<TableSource>> {
        path.map(|path| {
            Ok(TableSource {
                path: resolve_user_path(path, &home_dir, &cwd)?,
                required: true,
            })
        })
        .transpose()
    };

    let mut observatories = explicit(overrides.observatories)?;
    let mut aliases = explicit(overrides.aliases)?;
    let catalog = explicit(overrides.catalog)?;

    if let Some(tempo2_dir) = overrides.tempo2_dir {
        let observatory_dir = resolve_user_path(tempo2_dir, &home_dir, &cwd)?.join("observatory");
        observatories.get_or_insert_with(|| TableSource {
            path: observatory_dir.join("observatories.dat"),
            required: false,
        });
        aliases.get_or_insert_with(|| TableSource {
            path: observatory_dir.join("aliases"),
            required: false,
        });
    }

    Ok(RuntimeConfig {
        observatories,
        aliases,
        catalog,
    })
}

pub fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
