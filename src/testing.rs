//! Scripted ephemeris for unit tests: fixed values plus failure injection.

use crate::ephemeris::{
    AstroTime, Direction, Ephemeris, EphemerisError, Equatorial, GeoVector, Horizontal,
    MoonQuarter, Observer, Quarter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// What a scripted search does.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Outcome {
    /// Event found this many days after the search start
    Found(f64),
    /// Window searched, nothing there
    Missing,
    /// Provider error
    Fails,
}

#[derive(Debug)]
pub(crate) struct ScriptedEphemeris {
    pub phase_angle: f64,
    pub illumination: f64,
    pub ecliptic_longitude: f64,
    pub vector: GeoVector,
    pub equatorial: Equatorial,
    pub horizontal: Horizontal,
    pub rise: Outcome,
    pub set: Outcome,
    pub transit: Outcome,
    /// First quarter reported by `search_moon_quarter`
    pub first_quarter: Quarter,
    /// Quarter-chain call (0 = initial search) that fails, if any
    pub quarter_failure_at: Option<usize>,
    /// Report the same quarter again instead of advancing
    pub quarter_repeats: bool,
    pub quarter_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    /// Threads `phase_angle` was called on
    pub phase_threads: Mutex<Vec<ThreadId>>,
}

impl ScriptedEphemeris {
    pub fn new() -> Self {
        ScriptedEphemeris {
            phase_angle: 90.0,
            illumination: 0.5,
            ecliptic_longitude: 100.0,
            vector: GeoVector {
                x: 0.0025,
                y: 0.0,
                z: 0.0,
            },
            equatorial: Equatorial {
                ra: 6.5,
                dec: 12.0,
                dist: 0.0025,
            },
            horizontal: Horizontal {
                azimuth: 120.0,
                altitude: 30.0,
            },
            rise: Outcome::Found(0.25),
            set: Outcome::Found(0.75),
            transit: Outcome::Found(0.5),
            first_quarter: Quarter::Full,
            quarter_failure_at: None,
            quarter_repeats: false,
            quarter_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            phase_threads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_phase_angle(mut self, angle: f64) -> Self {
        self.phase_angle = angle;
        self
    }

    pub fn with_illumination(mut self, fraction: f64) -> Self {
        self.illumination = fraction;
        self
    }

    pub fn with_ecliptic_longitude(mut self, longitude: f64) -> Self {
        self.ecliptic_longitude = longitude;
        self
    }

    pub fn with_searches(mut self, rise: Outcome, set: Outcome, transit: Outcome) -> Self {
        self.rise = rise;
        self.set = set;
        self.transit = transit;
        self
    }

    pub fn with_quarter_failure_at(mut self, call: usize) -> Self {
        self.quarter_failure_at = Some(call);
        self
    }

    fn outcome(&self, outcome: Outcome, start: &AstroTime) -> Result<Option<AstroTime>, EphemerisError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        match outcome {
            Outcome::Found(days) => start.add_days(days).map(Some),
            Outcome::Missing => Ok(None),
            Outcome::Fails => Err(EphemerisError::NoConvergence { what: "scripted" }),
        }
    }

    fn quarter_call(&self) -> Result<usize, EphemerisError> {
        let call = self.quarter_calls.fetch_add(1, Ordering::SeqCst);
        if self.quarter_failure_at == Some(call) {
            return Err(EphemerisError::NoConvergence {
                what: "scripted quarter",
            });
        }
        Ok(call)
    }
}

impl Ephemeris for ScriptedEphemeris {
    fn geo_vector(&self, _time: &AstroTime) -> Result<GeoVector, EphemerisError> {
        Ok(self.vector)
    }

    fn equator(&self, _observer: &Observer, _time: &AstroTime) -> Result<Equatorial, EphemerisError> {
        Ok(self.equatorial)
    }

    fn ecliptic_longitude(&self, _time: &AstroTime) -> Result<f64, EphemerisError> {
        Ok(self.ecliptic_longitude)
    }

    fn horizon(
        &self,
        _observer: &Observer,
        _time: &AstroTime,
        _ra: f64,
        _dec: f64,
    ) -> Result<Horizontal, EphemerisError> {
        Ok(self.horizontal)
    }

    fn phase_angle(&self, _time: &AstroTime) -> Result<f64, EphemerisError> {
        if let Ok(mut threads) = self.phase_threads.lock() {
            threads.push(thread::current().id());
        }
        Ok(self.phase_angle)
    }

    fn illumination_fraction(&self, _time: &AstroTime) -> Result<f64, EphemerisError> {
        Ok(self.illumination)
    }

    fn search_rise_set(
        &self,
        _observer: &Observer,
        start: &AstroTime,
        direction: Direction,
        _window_days: f64,
        _resolution_minutes: f64,
    ) -> Result<Option<AstroTime>, EphemerisError> {
        match direction {
            Direction::Rise => self.outcome(self.rise, start),
            Direction::Set => self.outcome(self.set, start),
        }
    }

    fn search_transit(
        &self,
        _observer: &Observer,
        start: &AstroTime,
        _window_days: f64,
    ) -> Result<Option<AstroTime>, EphemerisError> {
        self.outcome(self.transit, start)
    }

    fn search_moon_quarter(&self, start: &AstroTime) -> Result<MoonQuarter, EphemerisError> {
        self.quarter_call()?;
        Ok(MoonQuarter {
            quarter: self.first_quarter,
            time: start.add_days(3.0)?,
        })
    }

    fn next_moon_quarter(&self, previous: &MoonQuarter) -> Result<MoonQuarter, EphemerisError> {
        self.quarter_call()?;
        let quarter = if self.quarter_repeats {
            previous.quarter
        } else {
            previous.quarter.next()
        };
        Ok(MoonQuarter {
            quarter,
            time: previous.time.add_days(7.4)?,
        })
    }
}
