use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::coords::{CoordinateError, SkyCoord};
use crate::config::RuntimeConfig;

const BUNDLED_SOURCES: &str = include_str!("../../data/sources.dat");

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog line {line:?} in {origin}: {reason}")]
    MalformedLine {
        origin: String,
        line: String,
        reason: String,
    },
    #[error("source '{0}' not found; give coordinates as 'RA DEC' or add it to a catalog")]
    UnknownSource(String),
}

/// Named source positions; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub position: SkyCoord,
}

/// A source ready for the rise and set search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSource {
    pub name: String,
    pub position: SkyCoord,
}

impl SourceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<&'static Self, CatalogError> {
        static BUILTIN: OnceLock<Result<SourceCatalog, CatalogError>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let mut catalog = Self::new();
                catalog.load(BUNDLED_SOURCES, "bundled sources.dat")?;
                Ok(catalog)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The bundled catalog plus the user catalog named in `config`.
    pub fn with_overrides(config: &RuntimeConfig) -> Result<Self> {
        let mut catalog = Self::builtin()?.clone();
        if let Some(table) = &config.catalog {
            let text = std::fs::read_to_string(&table.path)
                .with_context(|| format!("failed to read catalog: {}", table.path.display()))?;
            catalog.load(&text, &table.path.display().to_string())?;
        }
        Ok(catalog)
    }

    /// Reads `NAME RA DEC [ALIAS ...]` lines.
    pub fn load(&mut self, text: &str, origin: &str) -> Result<(), CatalogError> {
        for line in text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
        {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let malformed = |reason: String| CatalogError::MalformedLine {
                origin: origin.to_string(),
                line: line.to_string(),
                reason,
            };
            let [name, ra, dec, aliases @ ..] = fields.as_slice() else {
                return Err(malformed("expected NAME RA DEC".to_string()));
            };
            let position =
                SkyCoord::parse(ra, dec).map_err(|error: CoordinateError| malformed(error.to_string()))?;

            let entry = CatalogEntry {
                name: (*name).to_string(),
                position,
            };
            for key in std::iter::once(name).chain(aliases) {
                self.entries.insert(key.to_lowercase(), entry.clone());
            }
        }
        debug!(origin, entries = self.entries.len(), "loaded source catalog");
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&name.trim().to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns user input into a position: an explicit `RA DEC` pair wins,
/// otherwise the name is looked up in `catalog`.
pub fn resolve_source(text: &str, catalog: &SourceCatalog) -> Result<ResolvedSource, CatalogError> {
    if let Ok(position) = SkyCoord::parse_pair(text) {
        return Ok(ResolvedSource {
            name: text.trim().to_string(),
            position,
        });
    }
    catalog
        .get(text)
        .map(|entry| ResolvedSource {
            name: entry.name.clone(),
            position: entry.position,
        })
        .ok_or_else(|| CatalogError::UnknownSource(text.trim().to_string()))
}
