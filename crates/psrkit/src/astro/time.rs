use std::f64::consts::TAU;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const MJD_UNIX_EPOCH: f64 = 40_587.0;
const MJD_J2000: f64 = 51_544.5;
const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;
const TENTHS_PER_DAY: i64 = 864_000;
pub(crate) const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);

#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("unsupported time format: {0}")]
    Unparseable(String),
    #[error("MJD {0} is outside the representable range")]
    OutOfRange(f64),
    #[error("received negative hour angle {0} rad")]
    NegativeAngle(f64),
    #[error("hour angle {0} is not finite")]
    NonFiniteAngle(f64),
}

/// A UTC instant stored as a Modified Julian Date.
///
/// UT1 is taken to equal UTC everywhere; the sub-second difference is below
/// what the rise and set search resolves.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Epoch {
    mjd: f64,
}

impl Epoch {
    #[must_use]
    pub const fn from_mjd(mjd: f64) -> Self {
        Self { mjd }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        let seconds = datetime.unix_timestamp_nanos() as f64 / 1e9;
        Self {
            mjd: MJD_UNIX_EPOCH + seconds / SECONDS_PER_DAY,
        }
    }

    /// Parses an MJD number, an RFC 3339 timestamp, or a UTC
    /// `YYYY-MM-DD[ T]HH:MM:SS[.fff]` / `YYYY-MM-DD` string.
    pub fn parse(raw: &str) -> Result<Self, TimeError> {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return Err(TimeError::Unparseable(raw.to_string()));
        }
        if let Ok(mjd) = candidate.parse::<f64>()
            && mjd.is_finite()
        {
            return Ok(Self::from_mjd(mjd));
        }
        if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
            return Ok(Self::from_datetime(parsed));
        }

        let spaced = candidate.replacen('T', " ", 1);
        let with_time = format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
        );
        if let Ok(parsed) = PrimitiveDateTime::parse(&spaced, with_time) {
            return Ok(Self::from_datetime(parsed.assume_utc()));
        }
        if let Ok(date) = Date::parse(candidate, format_description!("[year]-[month]-[day]")) {
            return Ok(Self::from_datetime(date.midnight().assume_utc()));
        }

        Err(TimeError::Unparseable(candidate.to_string()))
    }

    #[must_use]
    pub const fn mjd(self) -> f64 {
        self.mjd
    }

    #[must_use]
    pub fn julian_centuries_j2000(self) -> f64 {
        (self.mjd - MJD_J2000) / DAYS_PER_CENTURY
    }

    #[must_use]
    pub fn plus_days(self, days: f64) -> Self {
        Self::from_mjd(self.mjd + days)
    }

    pub fn to_datetime(self) -> Result<OffsetDateTime, TimeError> {
        let nanos = ((self.mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY * 1e9).round();
        if !nanos.is_finite() {
            return Err(TimeError::OutOfRange(self.mjd));
        }
        OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
            .map(|datetime| datetime.to_offset(UtcOffset::UTC))
            .map_err(|_| TimeError::OutOfRange(self.mjd))
    }

    /// Renders `YYYY-MM-DD HH:MM:SS.fff`, rounded to the millisecond.
    pub fn iso(self) -> Result<String, TimeError> {
        let millis = ((self.mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY * 1e3).round();
        if !millis.is_finite() {
            return Err(TimeError::OutOfRange(self.mjd));
        }
        let nanos = (millis as i128)
            .checked_mul(1_000_000)
            .ok_or(TimeError::OutOfRange(self.mjd))?;
        let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimeError::OutOfRange(self.mjd))?;
        Ok(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
            dt.millisecond()
        ))
    }
}

/// Greenwich mean sidereal time (IAU 1982), radians in [0, 2π).
#[must_use]
pub fn gmst(epoch: Epoch) -> f64 {
    let t = epoch.julian_centuries_j2000();
    let days = epoch.mjd() - MJD_J2000;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * days + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    degrees.to_radians().rem_euclid(TAU)
}

/// Nutation angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nutation {
    pub dpsi: f64,
    pub deps: f64,
    pub mean_obliquity: f64,
}

impl Nutation {
    #[must_use]
    pub fn true_obliquity(self) -> f64 {
        self.mean_obliquity + self.deps
    }

    /// Equation of the equinoxes, radians.
    #[must_use]
    pub fn equation_of_equinoxes(self) -> f64 {
        self.dpsi * self.true_obliquity().cos()
    }
}

/// Keeps the four largest terms of the IAU 1980 series, good to about
/// half an arcsecond.
#[must_use]
pub fn nutation(epoch: Epoch) -> Nutation {
    let t = epoch.julian_centuries_j2000();
    let omega = (125.044_52 - 1_934.136_261 * t).to_radians();
    let sun = (280.466_5 + 36_000.769_8 * t).to_radians();
    let moon = (218.316_5 + 481_267.881_3 * t).to_radians();

    let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * sun).sin() - 0.23 * (2.0 * moon).sin()
        + 0.21 * (2.0 * omega).sin();
    let deps = 9.20 * omega.cos() + 0.57 * (2.0 * sun).cos() + 0.10 * (2.0 * moon).cos()
        - 0.09 * (2.0 * omega).cos();

    Nutation {
        dpsi: dpsi * ARCSEC,
        deps: deps * ARCSEC,
        mean_obliquity: mean_obliquity(epoch),
    }
}

#[must_use]
pub fn mean_obliquity(epoch: Epoch) -> f64 {
    let t = epoch.julian_centuries_j2000();
    let arcsec = 84_381.448 - 46.815_0 * t - 0.000_59 * t * t + 0.001_813 * t * t * t;
    arcsec * ARCSEC
}

/// Greenwich apparent sidereal time, radians in [0, 2π).
#[must_use]
pub fn gast(epoch: Epoch) -> f64 {
    (gmst(epoch) + nutation(epoch).equation_of_equinoxes()).rem_euclid(TAU)
}

/// Apparent local sidereal time for an east-positive longitude in radians.
#[must_use]
pub fn local_sidereal_time(epoch: Epoch, longitude: f64) -> f64 {
    (gast(epoch) + longitude).rem_euclid(TAU)
}

/// Renders a sidereal time angle (radians) as `HH:MM:SS.s`.
pub fn format_sidereal_time(angle: f64) -> Result<String, TimeError> {
    if !angle.is_finite() {
        return Err(TimeError::NonFiniteAngle(angle));
    }
    if angle < 0.0 {
        return Err(TimeError::NegativeAngle(angle));
    }
    let tenths = (angle / TAU * TENTHS_PER_DAY as f64).round() as i64 % TENTHS_PER_DAY;
    let hours = tenths / 36_000;
    let minutes = tenths / 600 % 60;
    let seconds = tenths % 600;
    Ok(format!(
        "{:02}:{:02}:{:02}.{}",
        hours,
        minutes,
        seconds / 10,
        seconds % 10
    ))
}
