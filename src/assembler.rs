//! # Moon State Assembly
//!
//! The pipeline's single public entry point. One call builds the observer and
//! time handle, runs every resolver and returns one immutable [`MoonState`].
//!
//! ## Error Handling
//! - Position and phase failures propagate as [`CalculationError`]; no partial
//!   state is ever returned
//! - Event-time misses are absorbed per field by [`event_times::resolve`]
//! - Quarter-chain failures are absorbed wholesale by [`next_phases::resolve`]

use crate::ephemeris::{AstroTime, Ephemeris, EphemerisError, MeeusEphemeris, Observer};
use crate::{event_times, next_phases, phase, position, zodiac, Location, MoonState};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a moon state could not be computed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    /// Position, phase or zodiac inputs could not be computed
    #[error("calculation failed: {0}")]
    Ephemeris(#[from] EphemerisError),

    /// Coordinates outside the valid range
    #[error("invalid location: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },
}

/// Computes [`MoonState`] values against a shared ephemeris.
///
/// Cheap to clone; holds no per-call state, so concurrent calls for different
/// locations need no coordination.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use moon_tracker_lib::{Location, MoonStateAssembler};
///
/// let assembler = MoonStateAssembler::default();
/// let paris = Location::new("Paris", 48.8566, 2.3522).unwrap();
/// let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
///
/// let state = assembler.compute(&paris, Some(at)).unwrap();
/// assert!((0.0..=100.0).contains(&state.phase.illumination_pct));
/// ```
#[derive(Clone)]
pub struct MoonStateAssembler {
    ephemeris: Arc<dyn Ephemeris>,
}

impl Default for MoonStateAssembler {
    fn default() -> Self {
        Self::new(Arc::new(MeeusEphemeris::new()))
    }
}

impl std::fmt::Debug for MoonStateAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoonStateAssembler").finish_non_exhaustive()
    }
}

impl MoonStateAssembler {
    pub fn new(ephemeris: Arc<dyn Ephemeris>) -> Self {
        MoonStateAssembler { ephemeris }
    }

    /// Compute the moon state for `location` at `instant`.
    /// If `instant` is `None`, fall back to `Utc::now()`.
    pub fn compute(
        &self,
        location: &Location,
        instant: Option<DateTime<Utc>>,
    ) -> Result<MoonState, CalculationError> {
        location.validate()?;
        let instant = instant.unwrap_or_else(Utc::now);
        let observer = Observer::from(location);
        let time = AstroTime::new(instant);
        let ephemeris = self.ephemeris.as_ref();

        let position = position::resolve(ephemeris, &observer, &time)?;
        let phase = phase::resolve(ephemeris, &time)?;
        let zodiac = zodiac::resolve(position.ecliptic_longitude);
        let times = event_times::resolve(ephemeris, &observer, &time);
        let next_phases = next_phases::resolve(ephemeris, &time);

        debug!(
            city = %location.city,
            %instant,
            sign = zodiac.sign.name(),
            illumination = phase.illumination_pct,
            "moon state computed"
        );

        Ok(MoonState {
            instant,
            location: location.clone(),
            position,
            phase,
            zodiac,
            times,
            next_phases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Outcome, ScriptedEphemeris};
    use crate::ZodiacSign;
    use chrono::TimeZone;

    fn paris() -> Location {
        Location::new("Paris", 48.8566, 2.3522).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn assembles_every_part() {
        let eph = ScriptedEphemeris::new().with_ecliptic_longitude(135.44);
        let state = MoonStateAssembler::new(Arc::new(eph))
            .compute(&paris(), Some(noon()))
            .unwrap();
        assert_eq!(state.instant, noon());
        assert_eq!(state.location, paris());
        assert_eq!(state.zodiac.sign, ZodiacSign::Leo);
        assert_eq!(state.zodiac.degrees_in_sign, 15.4);
        assert_eq!(state.phase.phase_index, 2);
        assert!(state.times.rise.is_some());
        assert!(!state.next_phases.approximate);
    }

    #[test]
    fn position_failure_aborts_the_call() {
        let eph = ScriptedEphemeris::new().with_ecliptic_longitude(f64::INFINITY);
        let result = MoonStateAssembler::new(Arc::new(eph)).compute(&paris(), Some(noon()));
        assert!(matches!(result, Err(CalculationError::Ephemeris(_))));
    }

    #[test]
    fn phase_failure_aborts_the_call() {
        let eph = ScriptedEphemeris::new().with_phase_angle(f64::NAN);
        let result = MoonStateAssembler::new(Arc::new(eph)).compute(&paris(), Some(noon()));
        assert!(matches!(result, Err(CalculationError::Ephemeris(_))));
    }

    #[test]
    fn search_failures_do_not_abort() {
        let eph = ScriptedEphemeris::new()
            .with_searches(Outcome::Fails, Outcome::Missing, Outcome::Fails)
            .with_quarter_failure_at(0);
        let state = MoonStateAssembler::new(Arc::new(eph))
            .compute(&paris(), Some(noon()))
            .unwrap();
        assert_eq!(state.times.rise, None);
        assert_eq!(state.times.set, None);
        assert_eq!(state.times.transit, None);
        assert!(state.next_phases.approximate);
    }

    #[test]
    fn invalid_location_is_rejected_before_any_math() {
        let eph = Arc::new(ScriptedEphemeris::new());
        let bad = Location {
            city: "Nowhere".to_string(),
            latitude: 48.0,
            longitude: f64::NAN,
        };
        let result = MoonStateAssembler::new(eph.clone()).compute(&bad, Some(noon()));
        assert!(matches!(
            result,
            Err(CalculationError::InvalidLocation { .. })
        ));
        assert_eq!(
            eph.search_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }
}
