use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::time::{ARCSEC, Epoch, nutation};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("cannot parse angle `{0}`")]
    Unparseable(String),
    #[error("minutes and seconds must be below 60 in `{0}`")]
    FieldOverflow(String),
    #[error("right ascension out of range: `{0}`")]
    RightAscensionRange(String),
    #[error("declination out of range: `{0}`")]
    DeclinationRange(String),
    #[error("expected a coordinate pair `RA DEC`, got `{0}`")]
    NotAPair(String),
}

/// An ICRS (J2000) sky position, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyCoord {
    pub ra: f64,
    pub dec: f64,
}

impl SkyCoord {
    #[must_use]
    pub const fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    #[must_use]
    pub fn from_degrees(ra: f64, dec: f64) -> Self {
        Self::new(ra.to_radians(), dec.to_radians())
    }

    /// Parses right ascension and declination.
    ///
    /// Sexagesimal right ascension (`05:34:31.97`, `5h34m31.97s`) is read
    /// as hours unless written with `d`/`°`; a bare decimal is degrees.
    /// Declination is always degrees.
    pub fn parse(ra: &str, dec: &str) -> Result<Self, CoordinateError> {
        let ra_angle = parse_angle(ra)?;
        let ra_degrees = if ra_angle.sexagesimal && !ra_angle.degree_marked {
            ra_angle.value * 15.0
        } else {
            ra_angle.value
        };
        if !(0.0..360.0).contains(&ra_degrees) {
            return Err(CoordinateError::RightAscensionRange(ra.trim().to_string()));
        }

        let dec_degrees = parse_angle(dec)?.value;
        if !(-90.0..=90.0).contains(&dec_degrees) {
            return Err(CoordinateError::DeclinationRange(dec.trim().to_string()));
        }

        Ok(Self::from_degrees(ra_degrees, dec_degrees))
    }

    /// Parses `"RA DEC"`, where each half is a single token or both are
    /// written as three space-separated fields.
    pub fn parse_pair(raw: &str) -> Result<Self, CoordinateError> {
        let tokens = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>();
        match tokens.as_slice() {
            [ra, dec] => Self::parse(ra, dec),
            [rh, rm, rs, dd, dm, ds] => {
                Self::parse(&format!("{rh} {rm} {rs}"), &format!("{dd} {dm} {ds}"))
            }
            _ => Err(CoordinateError::NotAPair(raw.trim().to_string())),
        }
    }

    #[must_use]
    pub fn ra_degrees(self) -> f64 {
        self.ra.to_degrees()
    }

    #[must_use]
    pub fn dec_degrees(self) -> f64 {
        self.dec.to_degrees()
    }

    /// Mean place of date, IAU 1976 precession from J2000.
    #[must_use]
    pub fn precess_to(self, epoch: Epoch) -> Self {
        let t = epoch.julian_centuries_j2000();
        let zeta = (2306.2181 * t + 0.30188 * t * t + 0.017_998 * t * t * t) * ARCSEC;
        let z = (2306.2181 * t + 1.09468 * t * t + 0.018_203 * t * t * t) * ARCSEC;
        let theta = (2004.3109 * t - 0.42665 * t * t - 0.041_833 * t * t * t) * ARCSEC;

        let (sin_dec, cos_dec) = self.dec.sin_cos();
        let (sin_ra, cos_ra) = (self.ra + zeta).sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();

        let a = cos_dec * sin_ra;
        let b = cos_theta * cos_dec * cos_ra - sin_theta * sin_dec;
        let c = sin_theta * cos_dec * cos_ra + cos_theta * sin_dec;

        Self {
            ra: (a.atan2(b) + z).rem_euclid(TAU),
            dec: c.clamp(-1.0, 1.0).asin(),
        }
    }

    /// Place of date corrected for precession and nutation.
    #[must_use]
    pub fn apparent_at(self, epoch: Epoch) -> Self {
        let mean = self.precess_to(epoch);
        let nutation = nutation(epoch);
        let eps = nutation.true_obliquity();
        let (sin_ra, cos_ra) = mean.ra.sin_cos();
        let tan_dec = mean.dec.tan();

        let dra = (eps.cos() + eps.sin() * sin_ra * tan_dec) * nutation.dpsi
            - cos_ra * tan_dec * nutation.deps;
        let ddec = eps.sin() * cos_ra * nutation.dpsi + sin_ra * nutation.deps;

        Self {
            ra: (mean.ra + dra).rem_euclid(TAU),
            dec: (mean.dec + ddec).clamp(-FRAC_PI_2, FRAC_PI_2),
        }
    }
}

/// Geocentric position of a site on the Earth, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EarthLocation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// WGS84 geodetic coordinates; angles in radians, height in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl EarthLocation {
    #[must_use]
    pub const fn from_geocentric(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn from_geodetic(longitude: f64, latitude: f64, height: f64) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let (sin_lat, cos_lat) = latitude.sin_cos();
        let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        Self {
            x: (n + height) * cos_lat * longitude.cos(),
            y: (n + height) * cos_lat * longitude.sin(),
            z: (n * (1.0 - e2) + height) * sin_lat,
        }
    }

    #[must_use]
    pub fn geodetic(self) -> Geodetic {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let b = WGS84_A * (1.0 - WGS84_F);
        let longitude = self.y.atan2(self.x);
        let p = self.x.hypot(self.y);

        if p < 1e-6 {
            let latitude = if self.z < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
            return Geodetic {
                longitude,
                latitude,
                height: self.z.abs() - b,
            };
        }

        let mut latitude = self.z.atan2(p * (1.0 - e2));
        let mut height = 0.0;
        for _ in 0..10 {
            let sin_lat = latitude.sin();
            let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            height = p / latitude.cos() - n;
            latitude = self.z.atan2(p * (1.0 - e2 * n / (n + height)));
        }

        Geodetic {
            longitude,
            latitude,
            height,
        }
    }
}

/// Renders radians as `HH:MM:SS.ss` hours.
#[must_use]
pub fn format_hms(angle: f64) -> String {
    let hundredths_per_day = 8_640_000_i64;
    let total = (angle.rem_euclid(TAU) / TAU * hundredths_per_day as f64).round() as i64
        % hundredths_per_day;
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total / 360_000,
        total / 6_000 % 60,
        total / 100 % 60,
        total % 100
    )
}

/// Renders radians as signed `+DD:MM:SS.s` degrees.
#[must_use]
pub fn format_dms(angle: f64) -> String {
    let sign = if angle < 0.0 { '-' } else { '+' };
    let tenths = (angle.abs().to_degrees() * 36_000.0).round() as i64;
    format!(
        "{sign}{:02}:{:02}:{:02}.{}",
        tenths / 36_000,
        tenths / 600 % 60,
        tenths / 10 % 60,
        tenths % 10
    )
}

struct ParsedAngle {
    value: f64,
    sexagesimal: bool,
    degree_marked: bool,
}

fn angle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^([+-])?\s*(\d+(?:\.\d*)?)(?:\s*([:hHdD°]|\s)\s*(\d+(?:\.\d*)?))?(?:\s*[:mM'\s]\s*(\d+(?:\.\d*)?))?\s*[sSmM'"]?$"#,
        )
        .expect("angle regex should compile")
    })
}

fn parse_angle(raw: &str) -> Result<ParsedAngle, CoordinateError> {
    let trimmed = raw.trim();
    let unparseable = || CoordinateError::Unparseable(trimmed.to_string());
    let captures = angle_pattern().captures(trimmed).ok_or_else(unparseable)?;

    let field = |index: usize| -> Result<Option<f64>, CoordinateError> {
        captures
            .get(index)
            .map(|m| m.as_str().parse::<f64>().map_err(|_| unparseable()))
            .transpose()
    };
    let whole = field(2)?.ok_or_else(unparseable)?;
    let minutes = field(4)?;
    let seconds = field(5)?;
    if seconds.is_some() && minutes.is_none() {
        return Err(unparseable());
    }
    if minutes.is_some_and(|m| m >= 60.0) || seconds.is_some_and(|s| s >= 60.0) {
        return Err(CoordinateError::FieldOverflow(trimmed.to_string()));
    }

    let magnitude = whole + minutes.unwrap_or(0.0) / 60.0 + seconds.unwrap_or(0.0) / 3600.0;
    let negative = captures.get(1).is_some_and(|m| m.as_str() == "-");
    let separator = captures.get(3).map(|m| m.as_str());

    Ok(ParsedAngle {
        value: if negative { -magnitude } else { magnitude },
        sexagesimal: minutes.is_some(),
        degree_marked: matches!(separator, Some("d" | "D" | "°")),
    })
}

#[cfg(test)]
mod tests {
    use super::{CoordinateError, EarthLocation, SkyCoord, format_dms, format_hms};
    use crate::astro::time::Epoch;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn parses_sexagesimal_and_decimal_positions() {
        let crab = SkyCoord::parse("05:34:31.97", "+22:00:52.1").expect("valid");
        assert!(close(crab.ra_degrees(), 83.633_208, 1e-5));
        assert!(close(crab.dec_degrees(), 22.014_472, 1e-5));

        let lettered = SkyCoord::parse("5h34m31.97s", "22d00m52.1s").expect("valid");
        assert!(close(lettered.ra, crab.ra, 1e-12));
        assert!(close(lettered.dec, crab.dec, 1e-12));

        let decimal = SkyCoord::parse("83.633208", "22.014472").expect("valid");
        assert!(close(decimal.ra, crab.ra, 1e-7));

        let southern = SkyCoord::parse("04 37 15.90", "-47 15 09.1").expect("valid");
        assert!(close(southern.dec_degrees(), -47.252_528, 1e-5));

        let just_south = SkyCoord::parse("00:00:00", "-00:30:00").expect("valid");
        assert!(close(just_south.dec_degrees(), -0.5, 1e-12));
    }

    #[test]
    fn rejects_malformed_or_out_of_range_angles() {
        assert!(matches!(
            SkyCoord::parse("crab", "+22"),
            Err(CoordinateError::Unparseable(_))
        ));
        assert!(matches!(
            SkyCoord::parse("05:61:00", "+22"),
            Err(CoordinateError::FieldOverflow(_))
        ));
        assert!(matches!(
            SkyCoord::parse("24:00:00", "+22"),
            Err(CoordinateError::RightAscensionRange(_))
        ));
        assert!(matches!(
            SkyCoord::parse("10:00:00", "+91:00:00"),
            Err(CoordinateError::DeclinationRange(_))
        ));
    }

    #[test]
    fn parses_coordinate_pairs() {
        let joined = SkyCoord::parse_pair("19:39:38.56 +21:34:59.1").expect("valid pair");
        let spaced = SkyCoord::parse_pair("19 39 38.56 +21 34 59.1").expect("valid pair");
        assert!(close(joined.ra, spaced.ra, 1e-12));
        assert!(close(joined.dec, spaced.dec, 1e-12));

        assert!(SkyCoord::parse_pair("294.9,21.58").is_ok());
        assert!(matches!(
            SkyCoord::parse_pair("B1937+21"),
            Err(CoordinateError::NotAPair(_))
        ));
    }

    #[test]
    fn precession_moves_positions_by_the_expected_amount() {
        // Meeus example 21.b: theta Persei, J2000 -> 2028 Nov 13.19 TD.
        let star = SkyCoord::from_degrees(41.054_063, 49.227_750);
        let epoch = Epoch::from_mjd(62_088.19);
        let precessed = star.precess_to(epoch);
        assert!(close(precessed.ra_degrees(), 41.547_214, 2e-5));
        assert!(close(precessed.dec_degrees(), 49.348_483, 2e-5));

        let unchanged = star.precess_to(Epoch::from_mjd(51_544.5));
        assert!(close(unchanged.ra, star.ra, 1e-12));
        assert!(close(unchanged.dec, star.dec, 1e-12));
    }

    #[test]
    fn geodetic_round_trips_through_geocentric() {
        let gbt = EarthLocation::from_geocentric(882_589.289, -4_924_872.368, 3_943_729.418);
        let geodetic = gbt.geodetic();
        assert!(close(geodetic.longitude.to_degrees(), -79.8398, 1e-3));
        assert!(close(geodetic.latitude.to_degrees(), 38.4331, 1e-3));
        assert!(close(geodetic.height, 824.0, 10.0));

        let back = EarthLocation::from_geodetic(
            geodetic.longitude,
            geodetic.latitude,
            geodetic.height,
        );
        assert!(close(back.x, gbt.x, 1e-3));
        assert!(close(back.y, gbt.y, 1e-3));
        assert!(close(back.z, gbt.z, 1e-3));
    }

    #[test]
    fn formats_hours_and_degrees() {
        let crab = SkyCoord::parse("05:34:31.97", "+22:00:52.1").expect("valid");
        assert_eq!(format_hms(crab.ra), "05:34:31.97");
        assert_eq!(format_dms(crab.dec), "+22:00:52.1");
        assert_eq!(format_dms(-0.5_f64.to_radians()), "-00:30:00.0");
    }
}
