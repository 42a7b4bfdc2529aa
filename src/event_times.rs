//! # Rise, Set and Transit Times
//!
//! Three independent, bounded searches forward from the requested instant:
//!
//! | Event   | Provider search              | Window | Resolution |
//! |---------|------------------------------|--------|------------|
//! | Rise    | upper limb crosses upward    | 1 day  | 10 min     |
//! | Set     | upper limb crosses downward  | 1 day  | 10 min     |
//! | Transit | local hour angle reaches 0   | 1 day  | provider   |
//!
//! A search that errors or finds nothing sets only its own field to `None`.
//! There is no retry and no estimated substitute: near the poles, or on the
//! one day a month the Moon skips a rise or set, "unknown" is the right answer.

use crate::ephemeris::{AstroTime, Direction, Ephemeris, EphemerisError, Observer};
use crate::MoonTimes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Search window for every event, in days.
pub const SEARCH_WINDOW_DAYS: f64 = 1.0;

/// Scan step for rise/set, in minutes.
pub const RESOLUTION_MINUTES: f64 = 10.0;

/// Resolve the next rise, set and transit after `time`.
pub fn resolve<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    observer: &Observer,
    time: &AstroTime,
) -> MoonTimes {
    MoonTimes {
        rise: settle(
            "moonrise",
            ephemeris.search_rise_set(
                observer,
                time,
                Direction::Rise,
                SEARCH_WINDOW_DAYS,
                RESOLUTION_MINUTES,
            ),
        ),
        set: settle(
            "moonset",
            ephemeris.search_rise_set(
                observer,
                time,
                Direction::Set,
                SEARCH_WINDOW_DAYS,
                RESOLUTION_MINUTES,
            ),
        ),
        transit: settle(
            "transit",
            ephemeris.search_transit(observer, time, SEARCH_WINDOW_DAYS),
        ),
    }
}

/// Collapse one search result into its field value, logging misses.
fn settle(
    event: &'static str,
    result: Result<Option<AstroTime>, EphemerisError>,
) -> Option<DateTime<Utc>> {
    match result {
        Ok(Some(time)) => Some(time.utc()),
        Ok(None) => {
            debug!(event, "no event inside the search window");
            None
        }
        Err(error) => {
            warn!(event, %error, "event search failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Outcome, ScriptedEphemeris};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::Ordering;

    fn setup() -> (Observer, AstroTime) {
        (
            Observer {
                latitude: 48.8566,
                longitude: 2.3522,
                height_m: 0.0,
            },
            AstroTime::new(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()),
        )
    }

    #[test]
    fn all_found() {
        let (observer, time) = setup();
        let eph = ScriptedEphemeris::new();
        let times = resolve(&eph, &observer, &time);
        assert_eq!(times.rise, Some(time.utc() + Duration::hours(6)));
        assert_eq!(times.set, Some(time.utc() + Duration::hours(18)));
        assert_eq!(times.transit, Some(time.utc() + Duration::hours(12)));
    }

    #[test]
    fn failure_is_isolated_to_its_field() {
        let (observer, time) = setup();
        let eph = ScriptedEphemeris::new().with_searches(
            Outcome::Fails,
            Outcome::Found(0.75),
            Outcome::Missing,
        );
        let times = resolve(&eph, &observer, &time);
        assert_eq!(times.rise, None);
        assert_eq!(times.set, Some(time.utc() + Duration::hours(18)));
        assert_eq!(times.transit, None);
        // Every search still ran exactly once
        assert_eq!(eph.search_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn everything_missing_is_still_a_value() {
        let (observer, time) = setup();
        let eph = ScriptedEphemeris::new().with_searches(
            Outcome::Missing,
            Outcome::Missing,
            Outcome::Fails,
        );
        assert_eq!(resolve(&eph, &observer, &time), MoonTimes::default());
    }
}
