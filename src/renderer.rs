//! # Moon State Rendering
//!
//! This module renders a [`MoonState`] for terminal output: a small ASCII
//! disk showing the lit part of the Moon followed by a text report of the
//! phase, zodiac placement, sky position, event times, upcoming quarters and
//! the astrological reading for the current sign and phase.
//!
//! Searched and approximate quarter dates are rendered identically.

use crate::phase::{apparent_magnitude, phase_name};
use crate::position::angular_size_arcmin;
use crate::zodiac::{influenced_signs, recommendations};
use crate::MoonState;
use chrono::{DateTime, Utc};

const DISK_ROWS: usize = 11;
/// Terminal cells are about twice as tall as wide
const DISK_COLS: usize = DISK_ROWS * 2;
const BAR_WIDTH: usize = 20;

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "unknown".to_string(),
    }
}

fn illumination_bar(pct: f64) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// ASCII picture of the disk as seen from the northern hemisphere.
///
/// Sampled at cell centres. `#` is lit, `.` is the dark limb. Waxing phases
/// are lit on the right.
fn disk_rows(phase_angle_deg: f64) -> Vec<String> {
    let cos_phase = phase_angle_deg.to_radians().cos();
    let waxing = phase_angle_deg.rem_euclid(360.0) < 180.0;
    let half_rows = DISK_ROWS as f64 / 2.0;
    let half_cols = DISK_COLS as f64 / 2.0;

    (0..DISK_ROWS)
        .map(|row| {
            let y = (row as f64 + 0.5 - half_rows) / half_rows;
            (0..DISK_COLS)
                .map(|col| {
                    let x = (col as f64 + 0.5 - half_cols) / half_cols;
                    if x * x + y * y > 1.0 {
                        return ' ';
                    }
                    // Terminator sits at x = ±cos(phase) * half-chord
                    let chord = (1.0 - y * y).sqrt();
                    let lit = if waxing {
                        x > cos_phase * chord
                    } else {
                        x < -cos_phase * chord
                    };
                    if lit {
                        '#'
                    } else {
                        '.'
                    }
                })
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Full text report for one moon state.
pub fn render_report(state: &MoonState) -> String {
    let phase = phase_name(state.phase.phase_index);
    let sign = state.zodiac.sign;
    let related: Vec<&str> = influenced_signs(sign)
        .into_iter()
        .filter(|s| *s != sign)
        .map(|s| s.name())
        .collect();
    let magnitude = apparent_magnitude(state.phase.phase_angle_deg, state.position.distance_km)
        .map(|m| format!("{m:.1}"))
        .unwrap_or_else(|| "n/a".to_string());

    let mut lines = Vec::new();
    lines.push(format!(
        "{} ({:.4}, {:.4}) at {}",
        state.location.city,
        state.location.latitude,
        state.location.longitude,
        state.instant.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(String::new());
    lines.extend(disk_rows(state.phase.phase_angle_deg));
    lines.push(String::new());
    lines.push(format!("Phase:        {} {}", phase.glyph, phase.name));
    lines.push(format!("              {}", phase.influence));
    lines.push(format!(
        "Illumination: {} {:.1}%",
        illumination_bar(state.phase.illumination_pct),
        state.phase.illumination_pct
    ));
    lines.push(format!("Phase angle:  {:.1}°", state.phase.phase_angle_deg));
    lines.push(format!(
        "Zodiac:       {} {} {:.1}° ({:?}; with {})",
        sign.glyph(),
        sign.name(),
        state.zodiac.degrees_in_sign,
        sign.element(),
        related.join(", ")
    ));
    lines.push(format!(
        "Sky:          azimuth {:.1}°, altitude {:.1}°",
        state.position.azimuth, state.position.altitude
    ));
    lines.push(format!(
        "Equatorial:   RA {:.3}h, Dec {:.2}°",
        state.position.right_ascension, state.position.declination
    ));
    lines.push(format!(
        "Distance:     {:.0} km, {:.1}′ across, magnitude {}",
        state.position.distance_km,
        angular_size_arcmin(state.position.distance_km),
        magnitude
    ));
    lines.push(String::new());
    lines.push(format!("Rise:         {}", format_time(state.times.rise)));
    lines.push(format!("Transit:      {}", format_time(state.times.transit)));
    lines.push(format!("Set:          {}", format_time(state.times.set)));
    lines.push(String::new());

    let next = &state.next_phases;
    lines.push(format!("New Moon:      {}", format_time(Some(next.new_moon))));
    lines.push(format!("First Quarter: {}", format_time(Some(next.first_quarter))));
    lines.push(format!("Full Moon:     {}", format_time(Some(next.full_moon))));
    lines.push(format!("Last Quarter:  {}", format_time(Some(next.last_quarter))));
    lines.push(String::new());

    lines.push(format!("Moon in {}:", sign.name()));
    lines.extend(sign.influences().iter().map(|line| format!("  * {line}")));
    lines.push("Recommendations:".to_string());
    lines.extend(
        recommendations(state.phase.phase_index, state.times.rise)
            .into_iter()
            .map(|line| format!("  * {line}")),
    );

    lines.join("\n")
}

/// Print the report to stdout.
pub fn draw_ascii(state: &MoonState) {
    println!("{}", render_report(state));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::{
        Location, MoonPhase, MoonPosition, MoonTimes, NextPhases, ZodiacPosition, ZodiacSign,
    };
    use chrono::TimeZone;

    fn test_state(phase_angle_deg: f64, next_phases: NextPhases) -> MoonState {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        MoonState {
            instant,
            location: Location::new("Paris", 48.8566, 2.3522).unwrap(),
            position: MoonPosition {
                ecliptic_longitude: 75.3,
                ecliptic_latitude: 0.0,
                distance_km: 384_402.0,
                azimuth: 120.0,
                altitude: 30.0,
                right_ascension: 5.1,
                declination: 24.0,
            },
            phase: MoonPhase {
                illumination_pct: 42.0,
                phase_angle_deg,
                phase_index: crate::phase::phase_index(phase_angle_deg),
            },
            zodiac: ZodiacPosition {
                sign: ZodiacSign::Gemini,
                degrees_in_sign: 15.3,
            },
            times: MoonTimes {
                rise: Some(instant),
                set: None,
                transit: None,
            },
            next_phases,
        }
    }

    #[test]
    fn test_report_contents() {
        let phases = fallback::approximate(Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()));
        let report = render_report(&test_state(80.0, phases));

        assert!(report.contains("Paris"));
        assert!(report.contains("Gemini"));
        assert!(report.contains("Air"));
        assert!(report.contains("Libra, Aquarius"));
        assert!(report.contains("First Quarter"));
        assert!(report.contains("Rise:         2024-03-15 12:00 UTC"));
        assert!(report.contains("Set:          unknown"));
        assert!(report.contains("New Moon:      2024-03-22 00:00 UTC"));
        assert!(report.contains("31.1′"));
        assert!(report.contains("Action, important decisions"));
        assert!(report.contains("  * Stimulates communication and intellectual exchange"));
        assert!(report.contains("  * Meditate at moonrise (12:00 UTC) to channel lunar energy"));
        assert!(report.contains("  * Make important decisions"));
    }

    #[test]
    fn test_unknown_moonrise_in_recommendations() {
        let mut state = test_state(180.0, fallback::approximate(None));
        state.times.rise = None;
        let report = render_report(&state);
        assert!(report.contains("Rise:         unknown"));
        assert!(report.contains("  * Meditate at moonrise to channel lunar energy"));
        assert!(report.contains("  * Celebration and gratitude"));
    }

    #[test]
    fn test_approximate_dates_render_like_searched_ones() {
        let mut phases = fallback::approximate(Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()));
        let approximate = render_report(&test_state(80.0, phases));
        phases.approximate = false;
        let searched = render_report(&test_state(80.0, phases));
        assert_eq!(approximate, searched);
    }

    #[test]
    fn test_quadrature_has_no_magnitude() {
        let phases = fallback::approximate(None);
        let report = render_report(&test_state(90.0, phases));
        assert!(report.contains("magnitude n/a"));
    }

    #[test]
    fn test_disk_extremes() {
        let full = disk_rows(180.0).concat();
        assert!(full.contains('#'));
        assert!(!full.contains('.'));

        let new = disk_rows(0.0).concat();
        assert!(new.contains('.'));
        assert!(!new.contains('#'));
    }

    #[test]
    fn test_disk_lit_side_follows_phase() {
        let middle = DISK_ROWS / 2;
        let waxing = &disk_rows(90.0)[middle];
        let waning = &disk_rows(270.0)[middle];
        assert!(waxing.starts_with('.'));
        assert!(waxing.ends_with('#'));
        assert!(waning.starts_with('#'));
        assert!(waning.ends_with('.'));
    }

    #[test]
    fn test_illumination_bar_width() {
        assert_eq!(illumination_bar(0.0).chars().count(), BAR_WIDTH + 2);
        assert_eq!(illumination_bar(100.0), format!("[{}]", "█".repeat(BAR_WIDTH)));
        assert_eq!(illumination_bar(150.0), illumination_bar(100.0));
    }
}
