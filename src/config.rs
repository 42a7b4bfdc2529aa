//! # Configuration Management
//!
//! This module handles loading and saving `moon-config.toml`: the default
//! observer location, the refresh period and the offline place list used by
//! [`crate::geocode::PlaceBook`].
//!
//! A missing or malformed file is never fatal; the defaults (Paris, 60 s)
//! are used instead and the reason is logged.

use crate::geocode::PlaceBook;
use crate::{CalculationError, Location};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration file name, relative to the working directory.
pub const CONFIG_FILE: &str = "moon-config.toml";

/// Errors raised while writing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Application configuration loaded from moon-config.toml
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Location shown when no other is requested
    pub location: LocationConfig,
    /// Background recompute settings
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Named places known to the offline geocoder
    #[serde(default)]
    pub places: Vec<PlaceConfig>,
}

/// Default observer location
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// Seconds between recomputes while watching
    pub interval_seconds: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_seconds: 60,
        }
    }
}

/// One `[[places]]` entry.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PlaceConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Longer label, e.g. "Paris, Île-de-France, France"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            location: LocationConfig {
                city: "Paris".to_string(),
                latitude: 48.8566,
                longitude: 2.3522,
            },
            refresh: RefreshConfig::default(),
            places: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from moon-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        city = %config.location.city,
                        places = config.places.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file format, using defaults (Paris)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults (Paris)");
                Self::default()
            }
        }
    }

    /// Save configuration as pretty TOML at `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// The configured default location, range-checked
    pub fn to_location(&self) -> Result<Location, CalculationError> {
        Location::new(
            self.location.city.clone(),
            self.location.latitude,
            self.location.longitude,
        )
    }

    /// Refresh period; zero is bumped to one second
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_seconds.max(1))
    }

    /// Offline geocoder over `[[places]]`, with the default location included
    pub fn place_book(&self) -> PlaceBook {
        let mut places = self.places.clone();
        let known = places
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&self.location.city));
        if !known {
            places.push(PlaceConfig {
                name: self.location.city.clone(),
                latitude: self.location.latitude,
                longitude: self.location.longitude,
                full_name: None,
            });
        }
        PlaceBook::new(places)
    }
}
