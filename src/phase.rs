//! # Moon Phase
//!
//! Converts the provider's phase angle and illuminated fraction into a
//! [`MoonPhase`] with a discrete eighth-of-cycle index, plus the static
//! phase name table used for display.

use crate::ephemeris::{ensure_finite, meeus::normalize_degrees, AstroTime, Ephemeris, EphemerisError};
use crate::MoonPhase;

/// Display name, glyph and traditional meaning for each phase index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseName {
    pub name: &'static str,
    pub glyph: char,
    /// One-line astrological reading of the phase
    pub influence: &'static str,
    /// Suggested activities while the phase lasts
    pub advice: [&'static str; 3],
}

/// Phase names indexed by [`MoonPhase::phase_index`].
pub const PHASE_NAMES: [PhaseName; 8] = [
    PhaseName {
        name: "New Moon",
        glyph: '🌑',
        influence: "New beginnings, deep introspection",
        advice: ["Plan new projects", "Manifestation rituals", "Introspective meditation"],
    },
    PhaseName {
        name: "Waxing Crescent",
        glyph: '🌒',
        influence: "Growth, positive intentions",
        advice: ["Act on your intentions", "Start new cycles", "Cultivate optimism"],
    },
    PhaseName {
        name: "First Quarter",
        glyph: '🌓',
        influence: "Action, important decisions",
        advice: ["Make important decisions", "Overcome obstacles", "Assert your will"],
    },
    PhaseName {
        name: "Waxing Gibbous",
        glyph: '🌔',
        influence: "Refinement, necessary adjustments",
        advice: ["Adjust and refine your projects", "Patience and perseverance", "Prepare for completion"],
    },
    PhaseName {
        name: "Full Moon",
        glyph: '🌕',
        influence: "Fulfilment, revelations",
        advice: ["Celebration and gratitude", "Mindfulness rituals", "Emotional release"],
    },
    PhaseName {
        name: "Waning Gibbous",
        glyph: '🌖',
        influence: "Gratitude, sharing knowledge",
        advice: ["Share what you have learned", "Teaching and guidance", "Spiritual generosity"],
    },
    PhaseName {
        name: "Last Quarter",
        glyph: '🌗',
        influence: "Letting go, forgiveness",
        advice: ["Let go of what no longer serves", "Forgiveness and reconciliation", "Energetic cleansing"],
    },
    PhaseName {
        name: "Waning Crescent",
        glyph: '🌘',
        influence: "Rest, preparing for renewal",
        advice: ["Rest and recovery", "Prepare for renewal", "Review and introspection"],
    },
];

/// Full-moon visual magnitude at mean distance.
const FULL_MOON_MAGNITUDE: f64 = -12.6;

/// Eighth of the synodic cycle for a phase angle.
///
/// `round(angle * 8 / 360) mod 8`, so an angle just below 360° lands in the
/// same new-moon bucket as 0°.
pub fn phase_index(phase_angle_deg: f64) -> u8 {
    ((phase_angle_deg * 8.0 / 360.0).round() as i64).rem_euclid(8) as u8
}

pub fn phase_name(index: u8) -> PhaseName {
    PHASE_NAMES[usize::from(index) % PHASE_NAMES.len()]
}

/// Resolve the Moon's phase at `time`.
pub fn resolve<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    time: &AstroTime,
) -> Result<MoonPhase, EphemerisError> {
    let angle = normalize_degrees(ensure_finite("phase angle", ephemeris.phase_angle(time)?)?);
    let fraction = ensure_finite(
        "illumination fraction",
        ephemeris.illumination_fraction(time)?,
    )?;

    Ok(MoonPhase {
        illumination_pct: fraction.clamp(0.0, 1.0) * 100.0,
        phase_angle_deg: angle,
        phase_index: phase_index(angle),
    })
}

/// Rough apparent visual magnitude from phase angle and distance.
///
/// Returns `None` at the quarters, where the `log10(|cos(angle)|)` term is
/// undefined.
pub fn apparent_magnitude(phase_angle_deg: f64, distance_km: f64) -> Option<f64> {
    let phase_effect = phase_angle_deg.to_radians().cos().abs();
    if phase_effect < 1e-12 || distance_km <= 0.0 {
        return None;
    }
    let distance_effect = 5.0 * (distance_km / crate::position::MEAN_DISTANCE_KM).log10();
    Some(FULL_MOON_MAGNITUDE - 2.5 * phase_effect.log10() + distance_effect)
}
