//! # Ephemeris Provider Contract
//!
//! The moon state pipeline never does orbital theory itself. Everything it
//! needs from an ephemeris is expressed by the [`Ephemeris`] trait: a time
//! handle, an observer, body vectors, coordinate transforms, illumination and
//! the three bounded event searches (rise/set, transit, quarter phases).
//!
//! ## Time Handle
//! [`AstroTime`] pairs a UTC instant with its day number since J2000.0 on the
//! UT scale and the matching Terrestrial Time value. Providers use TT for
//! body positions and UT for Earth rotation.
//!
//! ## Failure Model
//! - `Err(EphemerisError)`: the provider could not produce a value at all
//! - `Ok(None)` from a search: no event inside the requested window
//!
//! The bundled implementation is [`MeeusEphemeris`], a low-precision analytic
//! model good to a few arcminutes.

use crate::Location;
use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

pub mod meeus;

pub use meeus::MeeusEphemeris;

/// Kilometers per astronomical unit (IAU 2012).
pub const KM_PER_AU: f64 = 149_597_870.7;

/// Unix timestamp of the J2000.0 epoch, 2000-01-01T12:00:00Z.
const J2000_UNIX_SECONDS: f64 = 946_728_000.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Errors reported by an ephemeris provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    /// A computed quantity came out as NaN or infinite
    #[error("{quantity} is not a finite number ({value})")]
    NonFinite { quantity: &'static str, value: f64 },

    /// A computed quantity is finite but physically impossible
    #[error("{quantity} out of range ({value})")]
    OutOfRange { quantity: &'static str, value: f64 },

    /// A bounded search gave up before bracketing its event
    #[error("{what} search did not converge")]
    NoConvergence { what: &'static str },

    /// A chained quarter search skipped or repeated a quarter
    #[error("expected {expected:?} after previous quarter, found {found:?}")]
    UnexpectedQuarter { expected: Quarter, found: Quarter },

    /// The instant cannot be represented as a UTC timestamp
    #[error("instant out of representable range")]
    TimeOutOfRange,
}

/// Reject NaN and infinities coming out of a provider.
pub(crate) fn ensure_finite(quantity: &'static str, value: f64) -> Result<f64, EphemerisError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EphemerisError::NonFinite { quantity, value })
    }
}

/// Provider-facing time handle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AstroTime {
    utc: DateTime<Utc>,
    ut: f64,
    tt: f64,
}

impl AstroTime {
    pub fn new(utc: DateTime<Utc>) -> Self {
        let unix = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
        let ut = (unix - J2000_UNIX_SECONDS) / SECONDS_PER_DAY;
        let year = f64::from(utc.year()) + f64::from(utc.ordinal0()) / 365.25;
        let tt = ut + delta_t_seconds(year) / SECONDS_PER_DAY;
        Self { utc, ut, tt }
    }

    /// Build a time handle from a UT day number relative to J2000.0.
    ///
    /// Precision is one millisecond, which is far below any search tolerance.
    pub fn from_ut_days(ut: f64) -> Result<Self, EphemerisError> {
        let ut = ensure_finite("ut day number", ut)?;
        let millis = ((ut * SECONDS_PER_DAY + J2000_UNIX_SECONDS) * 1000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return Err(EphemerisError::TimeOutOfRange);
        }
        DateTime::from_timestamp_millis(millis as i64)
            .map(Self::new)
            .ok_or(EphemerisError::TimeOutOfRange)
    }

    pub fn add_days(&self, days: f64) -> Result<Self, EphemerisError> {
        Self::from_ut_days(self.ut + days)
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.utc
    }

    /// Days since J2000.0, UT scale.
    pub fn ut(&self) -> f64 {
        self.ut
    }

    /// Days since J2000.0, TT scale.
    pub fn tt(&self) -> f64 {
        self.tt
    }
}

/// ΔT = TT − UT in seconds (Espenak & Meeus polynomials).
fn delta_t_seconds(year: f64) -> f64 {
    let t = year - 2000.0;
    if (1986.0..2005.0).contains(&year) {
        63.86 + 0.3345 * t - 0.060374 * t.powi(2)
            + 0.0017275 * t.powi(3)
            + 0.000651814 * t.powi(4)
            + 0.00002373599 * t.powi(5)
    } else if (2005.0..2050.0).contains(&year) {
        62.92 + 0.32217 * t + 0.005589 * t * t
    } else {
        let u = (year - 1820.0) / 100.0;
        -20.0 + 32.0 * u * u
    }
}

/// Geographic observer on the reference ellipsoid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    /// Geodetic latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Height above the ellipsoid in meters
    pub height_m: f64,
}

impl From<&Location> for Observer {
    fn from(location: &Location) -> Self {
        Observer {
            latitude: location.latitude,
            longitude: location.longitude,
            height_m: 0.0,
        }
    }
}

/// Cartesian position vector in astronomical units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GeoVector {
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Equatorial coordinates of date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Equatorial {
    /// Right ascension in sidereal hours
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
    /// Distance in AU
    pub dist: f64,
}

/// Horizon coordinates, refraction applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Horizontal {
    /// Degrees east of true north
    pub azimuth: f64,
    /// Degrees above the horizon
    pub altitude: f64,
}

/// Which horizon crossing a rise/set search looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Rise,
    Set,
}

/// The four canonical phase quarters, in cycle order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quarter {
    New,
    FirstQuarter,
    Full,
    LastQuarter,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [
        Quarter::New,
        Quarter::FirstQuarter,
        Quarter::Full,
        Quarter::LastQuarter,
    ];

    pub fn index(self) -> usize {
        match self {
            Quarter::New => 0,
            Quarter::FirstQuarter => 1,
            Quarter::Full => 2,
            Quarter::LastQuarter => 3,
        }
    }

    pub fn from_index(index: usize) -> Quarter {
        Self::ALL[index % 4]
    }

    pub fn next(self) -> Quarter {
        Self::from_index(self.index() + 1)
    }

    /// Moon−Sun elongation at which this quarter occurs.
    pub fn target_angle(self) -> f64 {
        90.0 * self.index() as f64
    }
}

/// A quarter-phase event found by a search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoonQuarter {
    pub quarter: Quarter,
    pub time: AstroTime,
}

/// Primitive operations the moon pipeline consumes.
///
/// All angles are degrees except right ascension (hours). Searches are
/// bounded: they return `Ok(None)` rather than looping past their window.
pub trait Ephemeris: Send + Sync {
    /// Geocentric Moon position vector in AU.
    fn geo_vector(&self, time: &AstroTime) -> Result<GeoVector, EphemerisError>;

    /// Topocentric equatorial coordinates of date, aberration included.
    fn equator(&self, observer: &Observer, time: &AstroTime) -> Result<Equatorial, EphemerisError>;

    /// Geocentric apparent ecliptic longitude of the Moon.
    fn ecliptic_longitude(&self, time: &AstroTime) -> Result<f64, EphemerisError>;

    /// Azimuth/altitude of the given equatorial direction, with normal refraction.
    fn horizon(
        &self,
        observer: &Observer,
        time: &AstroTime,
        ra: f64,
        dec: f64,
    ) -> Result<Horizontal, EphemerisError>;

    /// Moon−Sun ecliptic elongation, 0 = new, 180 = full.
    fn phase_angle(&self, time: &AstroTime) -> Result<f64, EphemerisError>;

    /// Illuminated fraction of the lunar disk, 0..=1.
    fn illumination_fraction(&self, time: &AstroTime) -> Result<f64, EphemerisError>;

    /// Next upper-limb horizon crossing in `direction` within `window_days`,
    /// scanning at `resolution_minutes`.
    fn search_rise_set(
        &self,
        observer: &Observer,
        start: &AstroTime,
        direction: Direction,
        window_days: f64,
        resolution_minutes: f64,
    ) -> Result<Option<AstroTime>, EphemerisError>;

    /// Next local hour angle zero crossing (upper culmination) within `window_days`.
    fn search_transit(
        &self,
        observer: &Observer,
        start: &AstroTime,
        window_days: f64,
    ) -> Result<Option<AstroTime>, EphemerisError>;

    /// First quarter-phase event of any kind after `start`.
    fn search_moon_quarter(&self, start: &AstroTime) -> Result<MoonQuarter, EphemerisError>;

    /// The quarter-phase event following `previous`.
    fn next_moon_quarter(&self, previous: &MoonQuarter) -> Result<MoonQuarter, EphemerisError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn j2000_epoch_is_day_zero() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let time = AstroTime::new(epoch);
        assert!(time.ut().abs() < 1e-12);
        // ΔT around 2000 is roughly one minute
        assert!((time.tt() * SECONDS_PER_DAY - 64.0).abs() < 5.0);
    }

    #[test]
    fn add_days_moves_utc() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 6, 30, 0).unwrap();
        let later = AstroTime::new(start).add_days(1.5).unwrap();
        assert_eq!(later.utc(), Utc.with_ymd_and_hms(2024, 3, 16, 18, 30, 0).unwrap());
    }

    #[test]
    fn non_finite_day_number_is_rejected() {
        assert!(matches!(
            AstroTime::from_ut_days(f64::NAN),
            Err(EphemerisError::NonFinite { .. })
        ));
        assert_eq!(
            AstroTime::from_ut_days(1e300),
            Err(EphemerisError::TimeOutOfRange)
        );
    }

    #[test]
    fn quarter_cycle_wraps() {
        assert_eq!(Quarter::LastQuarter.next(), Quarter::New);
        assert_eq!(Quarter::New.next(), Quarter::FirstQuarter);
        assert_eq!(Quarter::Full.target_angle(), 180.0);
    }

    #[test]
    fn observer_from_location_sits_on_ellipsoid() {
        let paris = Location {
            city: "Paris".to_string(),
            latitude: 48.8566,
            longitude: 2.3522,
        };
        let observer = Observer::from(&paris);
        assert_eq!(observer.latitude, 48.8566);
        assert_eq!(observer.height_m, 0.0);
    }
}
