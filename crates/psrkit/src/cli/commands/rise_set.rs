use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::astro::coords::{format_dms, format_hms};
use crate::astro::{Epoch, ObservatoryRegistry, RiseSet, RiseSetQuery, SourceCatalog, rise_set};
use crate::config::RuntimeConfig;

#[derive(Debug, Clone, Args)]
pub struct RiseSetArgs {
    /// Catalog name of the source, or its position as "RA DEC".
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Observatory name, tempo2 code or alias, or a known site name.
    #[arg(value_name = "OBSERVATORY")]
    pub observatory: String,

    /// MJD (UTC) around which rise and set are wanted (default now).
    #[arg(long, conflicts_with = "when")]
    pub mjd: Option<f64>,

    /// UTC time around which rise and set are wanted, e.g. 2024-03-01T06:00:00.
    #[arg(long)]
    pub when: Option<String>,

    /// Elevation in degrees at which the source rises and sets.
    #[arg(long, allow_negative_numbers = true)]
    pub elevation_limit: Option<f64>,

    /// Report local sidereal times instead of UTC.
    #[arg(long, default_value_t = false)]
    pub lst: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiseSetReport {
    pub source: String,
    pub ra: String,
    pub dec: String,
    pub observatory: String,
    pub elevation_limit_deg: f64,
    pub rise_utc: String,
    pub set_utc: String,
    pub rise_mjd: f64,
    pub set_mjd: f64,
    pub rise_lst: String,
    pub set_lst: String,
}

impl RiseSetReport {
    pub fn from_rise_set(result: &RiseSet) -> Result<Self> {
        Ok(Self {
            source: result.source.name.clone(),
            ra: format_hms(result.source.position.ra),
            dec: format_dms(result.source.position.dec),
            observatory: result.observatory.name.clone(),
            elevation_limit_deg: result.elevation_limit_deg,
            rise_utc: result.rise.iso()?,
            set_utc: result.set.iso()?,
            rise_mjd: result.rise.mjd(),
            set_mjd: result.set.mjd(),
            rise_lst: result.rise_lst_text()?,
            set_lst: result.set_lst_text()?,
        })
    }
}

pub fn run(args: &RiseSetArgs, config: &RuntimeConfig) -> Result<()> {
    let when = match (args.mjd, args.when.as_deref()) {
        (Some(mjd), _) => Some(Epoch::from_mjd(mjd)),
        (None, Some(raw)) => Some(Epoch::parse(raw)?),
        (None, None) => None,
    };
    let registry = ObservatoryRegistry::with_overrides(config)?;
    let catalog = SourceCatalog::with_overrides(config)?;

    let result = rise_set(
        &RiseSetQuery {
            source: &args.source,
            observatory: &args.observatory,
            elevation_limit_deg: args.elevation_limit,
            when,
        },
        &registry,
        &catalog,
    )
    .with_context(|| {
        format!(
            "rise-set: cannot compute rise and set of '{}' at '{}'",
            args.source, args.observatory
        )
    })?;

    if args.json {
        let report = RiseSetReport::from_rise_set(&result)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", result.render(args.lst)?);
    }
    Ok(())
}
