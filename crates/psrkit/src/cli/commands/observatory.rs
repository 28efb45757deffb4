use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::astro::observatory::{
    ObservatoryOrigin, ObservatoryRegistry, ResolvedObservatory, resolve_observatory,
};
use crate::config::RuntimeConfig;

#[derive(Debug, Clone, Args)]
pub struct ObservatoryArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservatoryReport {
    pub name: String,
    pub origin: ObservatoryOrigin,
    pub aliases: Vec<String>,
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub height_m: f64,
    pub elevation_limit_deg: Option<f64>,
}

#[must_use]
pub fn build_report(registry: &ObservatoryRegistry, resolved: &ResolvedObservatory) -> ObservatoryReport {
    let geodetic = resolved.location.geodetic();
    let aliases = match resolved.origin {
        ObservatoryOrigin::Tempo2 => registry
            .aliases_of(&resolved.name)
            .into_iter()
            .filter(|alias| *alias != resolved.name)
            .map(str::to_string)
            .collect(),
        ObservatoryOrigin::Site => Vec::new(),
    };
    ObservatoryReport {
        name: resolved.name.clone(),
        origin: resolved.origin,
        aliases,
        x_m: resolved.location.x,
        y_m: resolved.location.y,
        z_m: resolved.location.z,
        longitude_deg: geodetic.longitude.to_degrees(),
        latitude_deg: geodetic.latitude.to_degrees(),
        height_m: geodetic.height,
        elevation_limit_deg: resolved.elevation_limit_deg,
    }
}

#[must_use]
pub fn render_text_report(report: &ObservatoryReport) -> String {
    let origin = match report.origin {
        ObservatoryOrigin::Tempo2 => "tempo2",
        ObservatoryOrigin::Site => "site",
    };
    let mut lines = vec![
        format!("name: {}", report.name),
        format!("origin: {origin}"),
    ];
    if !report.aliases.is_empty() {
        lines.push(format!("aliases: {}", report.aliases.join(",")));
    }
    lines.push(format!(
        "geocentric_m: {:.3} {:.3} {:.3}",
        report.x_m, report.y_m, report.z_m
    ));
    lines.push(format!(
        "geodetic: lon={:.6} lat={:.6} height={:.1}",
        report.longitude_deg, report.latitude_deg, report.height_m
    ));
    lines.push(match report.elevation_limit_deg {
        Some(limit) => format!("elevation_limit_deg: {limit}"),
        None => "elevation_limit_deg: none".to_string(),
    });
    lines.join("\n")
}

pub fn run(args: &ObservatoryArgs, config: &RuntimeConfig) -> Result<()> {
    let registry = ObservatoryRegistry::with_overrides(config)?;
    let resolved = resolve_observatory(&registry, &args.name)?;
    let report = build_report(&registry, &resolved);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_text_report(&report));
    }
    Ok(())
}
