use thiserror::Error;
use tracing::debug;

use super::catalog::{CatalogError, ResolvedSource, SourceCatalog, resolve_source};
use super::coords::{EarthLocation, Geodetic, SkyCoord};
use super::observatory::{
    ObservatoryError, ObservatoryRegistry, ResolvedObservatory, resolve_observatory,
};
use super::time::{Epoch, TimeError, format_sidereal_time, local_sidereal_time};

const SEARCH_WINDOW_DAYS: f64 = 1.0;
const SEARCH_STEP_DAYS: f64 = 10.0 / 1_440.0;
const TIME_TOLERANCE_DAYS: f64 = 0.05 / 86_400.0;
const MAX_BISECTIONS: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum RiseSetError {
    #[error(transparent)]
    Source(#[from] CatalogError),
    #[error(transparent)]
    Observatory(#[from] ObservatoryError),
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error("elevation limit must be between -90 and 90 degrees, got {0}")]
    InvalidElevationLimit(f64),
    #[error("source never rises above {horizon_deg} degrees")]
    NeverRises { horizon_deg: f64 },
    #[error("source never sets below {horizon_deg} degrees")]
    NeverSets { horizon_deg: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Rising,
    Setting,
}

/// A fixed site that can evaluate source altitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    location: EarthLocation,
    geodetic: Geodetic,
}

impl Observer {
    #[must_use]
    pub fn new(location: EarthLocation) -> Self {
        Self {
            location,
            geodetic: location.geodetic(),
        }
    }

    #[must_use]
    pub const fn location(&self) -> EarthLocation {
        self.location
    }

    #[must_use]
    pub fn local_sidereal_time(&self, epoch: Epoch) -> f64 {
        local_sidereal_time(epoch, self.geodetic.longitude)
    }

    /// Geometric altitude of the apparent place, radians. No refraction.
    #[must_use]
    pub fn altitude(&self, target: SkyCoord, epoch: Epoch) -> f64 {
        let apparent = target.apparent_at(epoch);
        let hour_angle = self.local_sidereal_time(epoch) - apparent.ra;
        let (sin_lat, cos_lat) = self.geodetic.latitude.sin_cos();
        let (sin_dec, cos_dec) = apparent.dec.sin_cos();
        (sin_lat * sin_dec + cos_lat * cos_dec * hour_angle.cos())
            .clamp(-1.0, 1.0)
            .asin()
    }

    #[must_use]
    pub fn is_up(&self, target: SkyCoord, epoch: Epoch, horizon: f64) -> bool {
        self.altitude(target, epoch) >= horizon
    }

    pub fn rise_time(
        &self,
        target: SkyCoord,
        epoch: Epoch,
        horizon: f64,
        which: Which,
    ) -> Result<Epoch, RiseSetError> {
        self.crossing(target, epoch, horizon, which, Crossing::Rising)
    }

    pub fn set_time(
        &self,
        target: SkyCoord,
        epoch: Epoch,
        horizon: f64,
        which: Which,
    ) -> Result<Epoch, RiseSetError> {
        self.crossing(target, epoch, horizon, which, Crossing::Setting)
    }

    /// Walks up to a day away from `epoch` on a coarse grid until the
    /// wanted horizon crossing is bracketed, then bisects it.
    fn crossing(
        &self,
        target: SkyCoord,
        epoch: Epoch,
        horizon: f64,
        which: Which,
        kind: Crossing,
    ) -> Result<Epoch, RiseSetError> {
        let above = |t: Epoch| self.altitude(target, t) >= horizon;
        let direction = match which {
            Which::Next => 1.0,
            Which::Previous => -1.0,
        };
        let steps = (SEARCH_WINDOW_DAYS / SEARCH_STEP_DAYS).ceil() as usize;

        let mut current = epoch;
        let mut current_above = above(current);
        let mut seen_above = current_above;
        let mut seen_below = !current_above;

        for _ in 0..steps {
            let neighbour = current.plus_days(direction * SEARCH_STEP_DAYS);
            let neighbour_above = above(neighbour);
            seen_above |= neighbour_above;
            seen_below |= !neighbour_above;

            let (earlier, later, earlier_above, later_above) = match which {
                Which::Next => (current, neighbour, current_above, neighbour_above),
                Which::Previous => (neighbour, current, neighbour_above, current_above),
            };
            let found = match kind {
                Crossing::Rising => !earlier_above && later_above,
                Crossing::Setting => earlier_above && !later_above,
            };
            if found {
                return Ok(bisect(earlier, later, |t| above(t) == later_above));
            }

            current = neighbour;
            current_above = neighbour_above;
        }

        let horizon_deg = horizon.to_degrees();
        debug!(seen_above, seen_below, horizon_deg, "no horizon crossing in search window");
        if seen_above && !seen_below {
            Err(RiseSetError::NeverSets { horizon_deg })
        } else {
            Err(RiseSetError::NeverRises { horizon_deg })
        }
    }
}

/// Narrows `[earlier, later]` to the first instant where `reached` holds.
///
/// Stops early once the midpoint can no longer be told apart from an end.
fn bisect(mut earlier: Epoch, mut later: Epoch, reached: impl Fn(Epoch) -> bool) -> Epoch {
    for _ in 0..MAX_BISECTIONS {
        if later.mjd() - earlier.mjd() <= TIME_TOLERANCE_DAYS {
            break;
        }
        let middle = Epoch::from_mjd(0.5 * (earlier.mjd() + later.mjd()));
        if middle == earlier || middle == later {
            break;
        }
        if reached(middle) {
            later = middle;
        } else {
            earlier = middle;
        }
    }
    Epoch::from_mjd(0.5 * (earlier.mjd() + later.mjd()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiseSetQuery<'a> {
    pub source: &'a str,
    pub observatory: &'a str,
    pub elevation_limit_deg: Option<f64>,
    pub when: Option<Epoch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiseSet {
    pub source: ResolvedSource,
    pub observatory: ResolvedObservatory,
    pub elevation_limit_deg: f64,
    pub when: Epoch,
    pub rise: Epoch,
    pub set: Epoch,
    /// Apparent local sidereal times at the observatory, radians.
    pub rise_lst: f64,
    pub set_lst: f64,
}

impl RiseSet {
    pub fn rise_lst_text(&self) -> Result<String, TimeError> {
        format_sidereal_time(self.rise_lst)
    }

    pub fn set_lst_text(&self) -> Result<String, TimeError> {
        format_sidereal_time(self.set_lst)
    }

    /// `Rise:\t...` and `Set:\t...` lines, as ISO UTC or as LST.
    pub fn render(&self, lst: bool) -> Result<String, TimeError> {
        let (rise, set) = if lst {
            (self.rise_lst_text()?, self.set_lst_text()?)
        } else {
            (self.rise.iso()?, self.set.iso()?)
        };
        Ok(format!("Rise:\t{rise}\nSet:\t{set}"))
    }
}

/// Rise and set of a source around `when` (default now).
///
/// A source already up at `when` reports the rise that brought it up;
/// otherwise the next rise. The set is always the first one after the
/// reported rise. Without an explicit limit the telescope's known limit
/// applies, else the horizon.
pub fn rise_set(
    query: &RiseSetQuery<'_>,
    registry: &ObservatoryRegistry,
    catalog: &SourceCatalog,
) -> Result<RiseSet, RiseSetError> {
    let source = resolve_source(query.source, catalog)?;
    let observatory = resolve_observatory(registry, query.observatory)?;
    let elevation_limit_deg = query
        .elevation_limit_deg
        .or(observatory.elevation_limit_deg)
        .unwrap_or(0.0);
    if !(-90.0..=90.0).contains(&elevation_limit_deg) {
        return Err(RiseSetError::InvalidElevationLimit(elevation_limit_deg));
    }
    let horizon = elevation_limit_deg.to_radians();
    let when = query.when.unwrap_or_else(Epoch::now);
    // Reported times must be printable as UTC dates.
    when.to_datetime()?;

    let observer = Observer::new(observatory.location);
    let which = if observer.is_up(source.position, when, horizon) {
        Which::Previous
    } else {
        Which::Next
    };
    let rise = observer.rise_time(source.position, when, horizon, which)?;
    let set = observer.set_time(source.position, rise, horizon, Which::Next)?;
    debug!(
        source = %source.name,
        observatory = %observatory.name,
        elevation_limit_deg,
        rise_mjd = rise.mjd(),
        set_mjd = set.mjd(),
        "computed rise and set"
    );

    Ok(RiseSet {
        rise_lst: observer.local_sidereal_time(rise),
        set_lst: observer.local_sidereal_time(set),
        source,
        observatory,
        elevation_limit_deg,
        when,
        rise,
        set,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        Observer, RiseSetError, RiseSetQuery, TIME_TOLERANCE_DAYS, Which, bisect, rise_set,
    };
    use crate::astro::catalog::SourceCatalog;
    use crate::astro::coords::SkyCoord;
    use crate::astro::observatory::ObservatoryRegistry;
    use crate::astro::time::{Epoch, TimeError};
    use std::f64::consts::TAU;

    fn gbt() -> Observer {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        Observer::new(registry.location("gbt").expect("gbt is bundled"))
    }

    fn wrap(angle: f64) -> f64 {
        (angle + TAU / 2.0).rem_euclid(TAU) - TAU / 2.0
    }

    const MJD_2024_03_01: f64 = 60_370.0;

    #[test]
    fn rise_and_set_sit_on_the_horizon() {
        let observer = gbt();
        let target = SkyCoord::parse("19:39:38.56", "+21:34:59.1").expect("valid");
        let horizon = 5.5_f64.to_radians();
        let start = Epoch::from_mjd(MJD_2024_03_01);

        let rise = observer
            .rise_time(target, start, horizon, Which::Next)
            .expect("rises");
        let set = observer
            .set_time(target, rise, horizon, Which::Next)
            .expect("sets");

        assert!(rise > start);
        assert!(set > rise);
        assert!(set.mjd() - rise.mjd() < 1.0);
        assert!((observer.altitude(target, rise) - horizon).abs() < 1e-5);
        assert!((observer.altitude(target, set) - horizon).abs() < 1e-5);

        let middle = Epoch::from_mjd(0.5 * (rise.mjd() + set.mjd()));
        assert!(observer.altitude(target, middle) > horizon);
    }

    #[test]
    fn rise_hour_angle_matches_spherical_trigonometry() {
        let observer = gbt();
        let target = SkyCoord::parse("05:34:31.97", "+22:00:52.1").expect("valid");
        let start = Epoch::from_mjd(MJD_2024_03_01);
        let rise = observer
            .rise_time(target, start, 0.0, Which::Next)
            .expect("rises");

        let apparent = target.apparent_at(rise);
        let latitude = observer.location().geodetic().latitude;
        let cos_h0 = -latitude.tan() * apparent.dec.tan();
        let expected_hour_angle = -cos_h0.acos();
        let hour_angle = wrap(observer.local_sidereal_time(rise) - apparent.ra);
        assert!(
            (hour_angle - expected_hour_angle).abs() < 1e-4,
            "hour_angle={hour_angle} expected={expected_hour_angle}"
        );
    }

    #[test]
    fn previous_rise_precedes_an_up_source() {
        let observer = gbt();
        let target = SkyCoord::parse("19:39:38.56", "+21:34:59.1").expect("valid");
        let start = Epoch::from_mjd(MJD_2024_03_01);
        let rise = observer
            .rise_time(target, start, 0.0, Which::Next)
            .expect("rises");
        let while_up = rise.plus_days(2.0 / 24.0);
        assert!(observer.is_up(target, while_up, 0.0));

        let previous = observer
            .rise_time(target, while_up, 0.0, Which::Previous)
            .expect("rose earlier");
        assert!((previous.mjd() - rise.mjd()).abs() < 1e-5);
    }

    #[test]
    fn circumpolar_and_hidden_sources_are_reported() {
        let observer = gbt();
        let start = Epoch::from_mjd(MJD_2024_03_01);
        let polaris = SkyCoord::from_degrees(37.95, 89.26);
        assert!(matches!(
            observer.rise_time(polaris, start, 0.0, Which::Next),
            Err(RiseSetError::NeverSets { .. })
        ));

        let southern = SkyCoord::from_degrees(80.0, -80.0);
        assert!(matches!(
            observer.set_time(southern, start, 0.0, Which::Next),
            Err(RiseSetError::NeverRises { .. })
        ));
    }

    #[test]
    fn rise_set_brackets_the_query_time_when_up() {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        let catalog = SourceCatalog::builtin().expect("bundled catalog is valid");
        let first = rise_set(
            &RiseSetQuery {
                source: "B1937+21",
                observatory: "GBT",
                when: Some(Epoch::from_mjd(MJD_2024_03_01)),
                ..RiseSetQuery::default()
            },
            registry,
            catalog,
        )
        .expect("rises at gbt");
        assert_eq!(first.elevation_limit_deg, 5.5);
        assert!(first.rise.mjd() > MJD_2024_03_01);

        let during = Epoch::from_mjd(0.5 * (first.rise.mjd() + first.set.mjd()));
        let second = rise_set(
            &RiseSetQuery {
                source: "B1937+21",
                observatory: "GBT",
                when: Some(during),
                ..RiseSetQuery::default()
            },
            registry,
            catalog,
        )
        .expect("rises at gbt");
        assert!(second.rise <= during && during <= second.set);
        assert!((second.rise.mjd() - first.rise.mjd()).abs() < 1e-5);
    }

    #[test]
    fn transit_falls_midway_between_rise_and_set() {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        let catalog = SourceCatalog::builtin().expect("bundled catalog is valid");
        let result = rise_set(
            &RiseSetQuery {
                source: "19:39:38.56 +21:34:59.1",
                observatory: "parkes",
                elevation_limit_deg: Some(30.0),
                when: Some(Epoch::from_mjd(MJD_2024_03_01)),
            },
            registry,
            catalog,
        )
        .expect("rises at parkes");

        let transit_lst = wrap(result.rise_lst + wrap(result.set_lst - result.rise_lst) / 2.0);
        let ra_of_date = result.source.position.apparent_at(result.rise).ra;
        assert!(
            wrap(transit_lst - ra_of_date).abs() < 0.25_f64.to_radians(),
            "transit={transit_lst} ra={ra_of_date}"
        );
    }

    #[test]
    fn arecibo_uses_its_dish_limit_and_explicit_limits_win() {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        let catalog = SourceCatalog::builtin().expect("bundled catalog is valid");
        let query = RiseSetQuery {
            source: "J1939+2134",
            observatory: "ao",
            when: Some(Epoch::from_mjd(MJD_2024_03_01)),
            ..RiseSetQuery::default()
        };

        let dish = rise_set(&query, registry, catalog).expect("transits high at arecibo");
        assert_eq!(dish.elevation_limit_deg, 69.0);
        assert!(dish.set.mjd() - dish.rise.mjd() < 0.15);

        let horizon = rise_set(
            &RiseSetQuery {
                elevation_limit_deg: Some(0.0),
                ..query
            },
            registry,
            catalog,
        )
        .expect("rises at arecibo");
        assert!(horizon.set.mjd() - horizon.rise.mjd() > 0.4);
    }

    #[test]
    fn unknown_inputs_surface_lookup_errors() {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        let catalog = SourceCatalog::builtin().expect("bundled catalog is valid");
        let err = rise_set(
            &RiseSetQuery {
                source: "crab",
                observatory: "Narnia",
                ..RiseSetQuery::default()
            },
            registry,
            catalog,
        )
        .expect_err("unknown observatory");
        assert_eq!(err.to_string(), "observatory 'Narnia' not found");

        let err = rise_set(
            &RiseSetQuery {
                source: "crab",
                observatory: "gbt",
                elevation_limit_deg: Some(120.0),
                ..RiseSetQuery::default()
            },
            registry,
            catalog,
        )
        .expect_err("bad limit");
        assert_eq!(err, RiseSetError::InvalidElevationLimit(120.0));
    }

    #[test]
    fn rejects_epochs_without_a_utc_date() {
        let registry = ObservatoryRegistry::builtin().expect("bundled tables are valid");
        let catalog = SourceCatalog::builtin().expect("bundled catalog is valid");
        let query = |when| RiseSetQuery {
            source: "crab",
            observatory: "parkes",
            when: Some(when),
            ..RiseSetQuery::default()
        };

        let err = rise_set(&query(Epoch::from_mjd(1e10)), registry, catalog)
            .expect_err("far future");
        assert_eq!(err, RiseSetError::Time(TimeError::OutOfRange(1e10)));

        let err = rise_set(&query(Epoch::from_mjd(f64::NAN)), registry, catalog)
            .expect_err("not a number");
        assert!(matches!(err, RiseSetError::Time(TimeError::OutOfRange(_))));
    }

    #[test]
    fn bisect_stops_when_the_midpoint_cannot_move() {
        let earlier = Epoch::from_mjd(1e10);
        let later = earlier.plus_days(1.0 / 144.0);
        assert!(later.mjd() - earlier.mjd() > TIME_TOLERANCE_DAYS);

        let found = bisect(earlier, later, |_| false);
        assert!(found >= earlier && found <= later);

        let start = Epoch::from_mjd(60_370.0);
        let found = bisect(start, start.plus_days(1.0), |t| t.mjd() >= 60_370.25);
        assert!((found.mjd() - 60_370.25).abs() <= TIME_TOLERANCE_DAYS);
    }
}
