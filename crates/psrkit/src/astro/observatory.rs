use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::coords::EarthLocation;
use crate::config::{RuntimeConfig, TableSource};

const BUNDLED_OBSERVATORIES: &str = include_str!("../../data/observatories.dat");
const BUNDLED_ALIASES: &str = include_str!("../../data/aliases");

/// Elevation limits (degrees) of telescopes that cannot point to the horizon.
const KNOWN_ELEVATION_LIMITS: &[(&str, f64)] = &[("gbt", 5.5), ("arecibo", 69.0)];

/// Optical and radio sites known by name, as (name, longitude, latitude,
/// height): east longitude and latitude in degrees, height in metres.
const SITES: &[(&str, f64, f64, f64)] = &[
    ("greenwich", -0.001_475, 51.477_811, 46.0),
    ("paranal", -70.404_167, -24.627_500, 2_635.0),
    ("keck", -155.478_333, 19.828_333, 4_160.0),
    ("alma", -67.755_2, -23.029_2, 5_058.0),
    ("kitt peak", -111.6, 31.963_333, 2_120.0),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObservatoryError {
    #[error("mysterious line {line:?} in {origin}")]
    MalformedLine { origin: String, line: String },
    #[error("alias line in {origin} refers to unknown observatory '{name}'")]
    UnknownAliasTarget { origin: String, name: String },
    #[error("observatory '{0}' not known to tempo2")]
    UnknownObservatory(String),
    #[error("observatory '{0}' not found")]
    NotFound(String),
}

/// Observatory positions keyed by lower-cased canonical name, with a
/// lower-cased alias index pointing at those names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservatoryRegistry {
    observatories: BTreeMap<String, EarthLocation>,
    aliases: BTreeMap<String, String>,
}

impl ObservatoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry built from the bundled tables, parsed once per process.
    pub fn builtin() -> Result<&'static Self, ObservatoryError> {
        static BUILTIN: OnceLock<Result<ObservatoryRegistry, ObservatoryError>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let mut registry = Self::new();
                registry.load_observatories_dat(BUNDLED_OBSERVATORIES, "bundled observatories.dat")?;
                registry.load_aliases(BUNDLED_ALIASES, "bundled aliases")?;
                Ok(registry)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The bundled registry extended with any tables named in `config`.
    ///
    /// Optional tables that cannot be read are skipped with a warning; a
    /// table that is read but malformed is always an error.
    pub fn with_overrides(config: &RuntimeConfig) -> Result<Self> {
        let mut registry = Self::builtin()?.clone();
        if let Some(text) = read_table(config.observatories.as_ref())? {
            let origin = origin_label(config.observatories.as_ref());
            registry.load_observatories_dat(&text, &origin)?;
        }
        if let Some(text) = read_table(config.aliases.as_ref())? {
            let origin = origin_label(config.aliases.as_ref());
            registry.load_aliases(&text, &origin)?;
        }
        Ok(registry)
    }

    /// Reads tempo2 `observatories.dat` lines: `X Y Z NAME [CODE ...]`.
    pub fn load_observatories_dat(&mut self, text: &str, origin: &str) -> Result<(), ObservatoryError> {
        for line in significant_lines(text) {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let malformed = || ObservatoryError::MalformedLine {
                origin: origin.to_string(),
                line: line.to_string(),
            };
            if fields.len() < 4 {
                return Err(malformed());
            }
            let mut xyz = [0.0; 3];
            for (slot, raw) in xyz.iter_mut().zip(&fields[..3]) {
                *slot = raw.parse::<f64>().map_err(|_| malformed())?;
            }

            let name = fields[3].to_lowercase();
            self.observatories
                .insert(name.clone(), EarthLocation::from_geocentric(xyz[0], xyz[1], xyz[2]));
            for alias in &fields[3..] {
                self.aliases.insert(alias.to_lowercase(), name.clone());
            }
        }
        debug!(origin, observatories = self.observatories.len(), "loaded observatories");
        Ok(())
    }

    /// Reads tempo2 `aliases` lines: `KNOWN_NAME ALIAS [ALIAS ...]`.
    pub fn load_aliases(&mut self, text: &str, origin: &str) -> Result<(), ObservatoryError> {
        for line in significant_lines(text) {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() < 2 {
                return Err(ObservatoryError::MalformedLine {
                    origin: origin.to_string(),
                    line: line.to_string(),
                });
            }
            let name = self
                .aliases
                .get(&fields[0].to_lowercase())
                .cloned()
                .ok_or_else(|| ObservatoryError::UnknownAliasTarget {
                    origin: origin.to_string(),
                    name: fields[0].to_string(),
                })?;
            for alias in &fields[1..] {
                self.aliases.insert(alias.to_lowercase(), name.clone());
            }
        }
        debug!(origin, aliases = self.aliases.len(), "loaded observatory aliases");
        Ok(())
    }

    #[must_use]
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.aliases.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn location(&self, name: &str) -> Result<EarthLocation, ObservatoryError> {
        self.canonical_name(name)
            .and_then(|canonical| self.observatories.get(canonical))
            .copied()
            .ok_or_else(|| ObservatoryError::UnknownObservatory(name.to_string()))
    }

    /// Every alias of `canonical`, sorted, including the name itself.
    #[must_use]
    pub fn aliases_of(&self, canonical: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.observatories.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservatoryOrigin {
    Tempo2,
    Site,
}

/// An observatory resolved by name, with its telescope elevation limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedObservatory {
    pub name: String,
    pub origin: ObservatoryOrigin,
    pub location: EarthLocation,
    pub elevation_limit_deg: Option<f64>,
}

/// Looks `name` up in the tempo2 tables first, then in the site list.
pub fn resolve_observatory(
    registry: &ObservatoryRegistry,
    name: &str,
) -> Result<ResolvedObservatory, ObservatoryError> {
    match registry.location(name) {
        Ok(location) => {
            let canonical = registry
                .canonical_name(name)
                .unwrap_or(name)
                .to_string();
            Ok(ResolvedObservatory {
                elevation_limit_deg: known_elevation_limit(&canonical),
                name: canonical,
                origin: ObservatoryOrigin::Tempo2,
                location,
            })
        }
        Err(ObservatoryError::UnknownObservatory(_)) => {
            debug!(name, "not a tempo2 observatory; trying site list");
            of_site(name)
                .map(|location| ResolvedObservatory {
                    name: name.to_lowercase(),
                    origin: ObservatoryOrigin::Site,
                    location,
                    elevation_limit_deg: None,
                })
                .ok_or_else(|| ObservatoryError::NotFound(name.to_string()))
        }
        Err(other) => Err(other),
    }
}

#[must_use]
pub fn known_elevation_limit(canonical: &str) -> Option<f64> {
    KNOWN_ELEVATION_LIMITS
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, limit)| *limit)
}

#[must_use]
pub fn of_site(name: &str) -> Option<EarthLocation> {
    let wanted = name.trim().to_lowercase();
    SITES
        .iter()
        .find(|(site, ..)| *site == wanted)
        .map(|(_, lon, lat, height)| {
            EarthLocation::from_geodetic(lon.to_radians(), lat.to_radians(), *height)
        })
}

fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn read_table(source: Option<&TableSource>) -> Result<Option<String>> {
    let Some(source) = source else {
        return Ok(None);
    };
    match std::fs::read_to_string(&source.path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if !source.required => {
            warn!(
                path = %source.path.display(),
                %error,
                "optional table unreadable; using bundled data"
            );
            Ok(None)
        }
        Err(error) => Err(error)
            .with_context(|| format!("failed to read table: {}", source.path.display())),
    }
}

fn origin_label(source: Option<&TableSource>) -> String {
    source.map_or_else(String::new, |source| source.path.display().to_string())
}
