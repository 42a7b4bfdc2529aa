//! # Moon Position
//!
//! Collects the provider's geocentric vector, topocentric equatorial
//! coordinates, horizon transform and ecliptic longitude into a
//! [`MoonPosition`].
//!
//! Ecliptic longitude is taken straight from the provider rather than
//! re-derived from the vector. Ecliptic latitude is not computed and stays 0.

use crate::ephemeris::{
    ensure_finite, meeus::normalize_degrees, AstroTime, Ephemeris, EphemerisError, Observer,
    KM_PER_AU,
};
use crate::MoonPosition;

/// Mean Earth–Moon distance, km.
pub const MEAN_DISTANCE_KM: f64 = 384_402.0;

/// Apparent lunar diameter at mean distance, arcminutes.
const MEAN_ANGULAR_SIZE_ARCMIN: f64 = 31.1;

/// Resolve the Moon's position for an observer at `time`.
pub fn resolve<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    observer: &Observer,
    time: &AstroTime,
) -> Result<MoonPosition, EphemerisError> {
    let vector = ephemeris.geo_vector(time)?;
    let equatorial = ephemeris.equator(observer, time)?;
    let ecliptic_longitude = ensure_finite("ecliptic longitude", ephemeris.ecliptic_longitude(time)?)?;
    let ra = ensure_finite("right ascension", equatorial.ra)?;
    let dec = ensure_finite("declination", equatorial.dec)?;
    let horizon = ephemeris.horizon(observer, time, ra, dec)?;

    let distance_km = ensure_finite("distance", vector.length() * KM_PER_AU)?;
    if distance_km <= 0.0 {
        return Err(EphemerisError::OutOfRange {
            quantity: "distance",
            value: distance_km,
        });
    }

    Ok(MoonPosition {
        ecliptic_longitude: normalize_degrees(ecliptic_longitude),
        ecliptic_latitude: 0.0,
        distance_km,
        azimuth: normalize_degrees(ensure_finite("azimuth", horizon.azimuth)?),
        altitude: ensure_finite("altitude", horizon.altitude)?,
        right_ascension: ra.rem_euclid(24.0),
        declination: dec,
    })
}

/// Apparent lunar diameter in arcminutes, inversely proportional to distance.
pub fn angular_size_arcmin(distance_km: f64) -> f64 {
    MEAN_ANGULAR_SIZE_ARCMIN * MEAN_DISTANCE_KM / distance_km
}
