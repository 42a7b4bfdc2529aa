//! # Moon Tracker Core Library
//!
//! This library turns an observer location and an instant into a complete,
//! immutable description of the Moon: where it is, how much of it is lit,
//! which zodiac sign it sits in, and when it next rises, sets, transits and
//! reaches each quarter phase.
//!
//! ## Design Philosophy
//!
//! ### Stateless Pipeline
//! - **One entry point**: [`assembler::MoonStateAssembler::compute`] returns a
//!   `Result<MoonState, CalculationError>`; callers own any loading/retry state
//! - **No caching**: every call recomputes from scratch, so a stale cache can
//!   never show the wrong moon
//! - **Swappable ephemeris**: all orbital math sits behind the
//!   [`ephemeris::Ephemeris`] trait
//!
//! ### Failure Policy
//! - Position, phase and zodiac failures abort the whole call
//! - A rise/set/transit search that finds nothing leaves only that field `None`
//! - A failed quarter-phase chain swaps in the fixed weekly approximation, all
//!   four dates at once
//!
//! ### Data Flow
//! 1. **Observer**: `Location` → `Observer` + `AstroTime`
//! 2. **Resolve**: position, phase, event times, next phases
//! 3. **Derive**: zodiac placement from ecliptic longitude
//! 4. **Assemble**: one `MoonState`, replaced wholesale on the next refresh
//!
//! ## Core Types
//! - [`Location`]: named observer site
//! - [`MoonState`]: everything the presentation layer needs, in one value

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod assembler;
pub mod config;
pub mod ephemeris;
pub mod event_times;
pub mod fallback;
pub mod geocode;
pub mod next_phases;
pub mod phase;
pub mod position;
pub mod refresh;
pub mod renderer;
pub mod zodiac;

#[cfg(test)]
mod testing;

pub use assembler::{CalculationError, MoonStateAssembler};
pub use zodiac::ZodiacSign;

/// A named observer site.
///
/// Produced by geocoding or device geolocation, consumed read-only by the
/// pipeline. Use [`Location::new`] to get range checking.
///
/// # Example
/// ```
/// use moon_tracker_lib::Location;
///
/// let paris = Location::new("Paris", 48.8566, 2.3522).unwrap();
/// assert_eq!(paris.city, "Paris");
/// assert!(Location::new("Nowhere", 91.0, 0.0).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    /// Degrees, north positive, -90..=90
    pub latitude: f64,
    /// Degrees, east positive, -180..=180
    pub longitude: f64,
}

impl Location {
    pub fn new(
        city: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, CalculationError> {
        let location = Location {
            city: city.into(),
            latitude,
            longitude,
        };
        location.validate()?;
        Ok(location)
    }

    /// Check that both coordinates are finite and in range.
    pub fn validate(&self) -> Result<(), CalculationError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(CalculationError::InvalidLocation {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Where the Moon is, geocentric and as seen by the observer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoonPosition {
    /// Geocentric apparent ecliptic longitude, always in [0, 360)
    pub ecliptic_longitude: f64,
    /// Not computed; always 0
    pub ecliptic_latitude: f64,
    /// Geocentric distance in km
    pub distance_km: f64,
    /// Degrees east of north, [0, 360)
    pub azimuth: f64,
    /// Degrees above the horizon, refraction included
    pub altitude: f64,
    /// Topocentric right ascension in hours, [0, 24)
    pub right_ascension: f64,
    /// Topocentric declination in degrees
    pub declination: f64,
}

/// Illumination and position in the synodic cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    /// Lit fraction of the disk, 0..=100
    pub illumination_pct: f64,
    /// Moon−Sun elongation, [0, 360); 0 = new, 180 = full
    pub phase_angle_deg: f64,
    /// Eighth of the cycle, 0..=7; 0 = new, 4 = full
    pub phase_index: u8,
}

/// Next rise, set and transit after the requested instant.
///
/// `None` means the search found no event in its one-day window, which is
/// normal at high latitudes and on the day the Moon skips a rise or set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoonTimes {
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    pub transit: Option<DateTime<Utc>>,
}

/// Zodiac sign and position within it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZodiacPosition {
    pub sign: ZodiacSign,
    /// Degrees into the sign, one decimal, [0, 30)
    pub degrees_in_sign: f64,
}

/// Upcoming quarter-phase dates. Always fully populated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextPhases {
    pub new_moon: DateTime<Utc>,
    pub first_quarter: DateTime<Utc>,
    pub full_moon: DateTime<Utc>,
    pub last_quarter: DateTime<Utc>,
    /// True when the dates come from the weekly approximation instead of a search.
    /// Internal only: never rendered or serialized.
    #[serde(skip)]
    pub approximate: bool,
}

/// Complete moon description for one location and instant.
///
/// Never mutated: a refresh builds a new value and replaces the old one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoonState {
    pub instant: DateTime<Utc>,
    pub location: Location,
    pub position: MoonPosition,
    pub phase: MoonPhase,
    pub zodiac: ZodiacPosition,
    pub times: MoonTimes,
    pub next_phases: NextPhases,
}
