//! # Geocoding Collaborator
//!
//! Turning a place name into coordinates (and back) belongs to an external
//! service; this module only fixes the contract the rest of the crate talks
//! to, plus the label rules every implementation shares:
//!
//! - Forward lookups name the place after the first comma-separated segment
//!   of the service's display name
//! - Reverse lookups prefer city, then town, then village, then the first
//!   display-name segment, then a generic label
//!
//! [`PlaceBook`] is the offline implementation backed by the `[[places]]`
//! table of the configuration file.

use crate::config::PlaceConfig;
use crate::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used when a reverse lookup has nothing better.
pub const UNKNOWN_PLACE: &str = "Unknown location";

/// Reverse lookups farther than this from every known place get the generic label.
const REVERSE_MATCH_RADIUS_KM: f64 = 50.0;

const EARTH_MEAN_RADIUS_KM: f64 = 6_371.0;

/// Errors surfaced by a geocoder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    /// The service answered but knows no such place
    #[error("place not found: {0}")]
    NotFound(String),

    /// The service itself failed
    #[error("geocoding service error: {0}")]
    Service(String),
}

/// One geocoding answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "fullName")]
    pub full_name: String,
}

impl From<GeocodeResult> for Location {
    fn from(result: GeocodeResult) -> Self {
        Location {
            city: result.city,
            latitude: result.latitude,
            longitude: result.longitude,
        }
    }
}

/// Address parts a reverse lookup may return.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub display_name: Option<String>,
}

/// Forward and reverse lookup contract.
pub trait Geocoder {
    fn geocode(&self, name: &str) -> Result<GeocodeResult, GeocodeError>;
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeocodeResult, GeocodeError>;
}

/// First comma-separated segment of a display name, trimmed.
pub fn city_from_display_name(display_name: &str) -> &str {
    display_name.split(',').next().unwrap_or_default().trim()
}

/// Best label for a reverse lookup: city → town → village → display name → generic.
pub fn reverse_label(address: &ReverseAddress) -> String {
    fn non_empty(s: &Option<String>) -> Option<&str> {
        s.as_deref().filter(|v| !v.trim().is_empty())
    }

    non_empty(&address.city)
        .or_else(|| non_empty(&address.town))
        .or_else(|| non_empty(&address.village))
        .or_else(|| {
            address
                .display_name
                .as_deref()
                .map(city_from_display_name)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(UNKNOWN_PLACE)
        .to_string()
}

/// Great-circle distance in km (haversine).
fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Offline geocoder over a fixed list of named places.
#[derive(Clone, Debug, Default)]
pub struct PlaceBook {
    places: Vec<PlaceConfig>,
}

impl PlaceBook {
    pub fn new(places: Vec<PlaceConfig>) -> Self {
        PlaceBook { places }
    }

    fn result_for(place: &PlaceConfig) -> GeocodeResult {
        GeocodeResult {
            city: city_from_display_name(&place.name).to_string(),
            latitude: place.latitude,
            longitude: place.longitude,
            full_name: place.full_name.clone().unwrap_or_else(|| place.name.clone()),
        }
    }
}

impl Geocoder for PlaceBook {
    fn geocode(&self, name: &str) -> Result<GeocodeResult, GeocodeError> {
        let wanted = name.trim();
        self.places
            .iter()
            .find(|place| place.name.eq_ignore_ascii_case(wanted))
            .map(Self::result_for)
            .ok_or_else(|| GeocodeError::NotFound(wanted.to_string()))
    }

    fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeocodeResult, GeocodeError> {
        if !(latitude.is_finite() && longitude.is_finite()) {
            return Err(GeocodeError::Service(format!(
                "invalid coordinates {latitude}, {longitude}"
            )));
        }

        let nearest = self
            .places
            .iter()
            .map(|place| {
                let km = distance_km(latitude, longitude, place.latitude, place.longitude);
                (place, km)
            })
            .filter(|(_, km)| *km <= REVERSE_MATCH_RADIUS_KM)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let address = ReverseAddress {
            city: nearest.map(|(place, _)| place.name.clone()),
            ..ReverseAddress::default()
        };
        let full_name = nearest
            .and_then(|(place, _)| place.full_name.clone())
            .unwrap_or_else(|| reverse_label(&address));

        Ok(GeocodeResult {
            city: reverse_label(&address),
            latitude,
            longitude,
            full_name,
        })
    }
}
