//! # Next Quarter Phases
//!
//! The provider can only answer "first quarter event after an instant" and
//! "the quarter after this quarter", so the four upcoming dates come from a
//! chain of four dependent calls issued in order:
//!
//! 1. `search_moon_quarter(instant)`
//! 2. `next_moon_quarter(step 1)`
//! 3. `next_moon_quarter(step 2)`
//! 4. `next_moon_quarter(step 3)`
//!
//! Each event lands in the field matching the quarter the provider reports,
//! so the result is correct whichever quarter comes first.
//!
//! Any failure anywhere in the chain discards the partial results and returns
//! [`fallback::approximate`] instead. Searched and approximate dates are never
//! mixed in one record.

use crate::ephemeris::{AstroTime, Ephemeris, EphemerisError, MoonQuarter, Quarter};
use crate::{fallback, NextPhases};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

/// Why the quarter chain could not produce four searched dates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuarterChainError {
    /// A provider call failed at the given chain step (0 = initial search)
    #[error("quarter search failed at step {step}: {source}")]
    Search {
        step: usize,
        #[source]
        source: EphemerisError,
    },

    /// The provider reported the same quarter twice in one chain
    #[error("{0:?} reported twice in one quarter chain")]
    Duplicate(Quarter),
}

/// Next new, first-quarter, full and last-quarter dates after `time`.
pub fn resolve<E: Ephemeris + ?Sized>(ephemeris: &E, time: &AstroTime) -> NextPhases {
    search_chain(ephemeris, time).unwrap_or_else(|error| {
        warn!(%error, "quarter chain failed, using weekly approximation");
        fallback::approximate(Some(time.utc()))
    })
}

/// Run the four-step chain. All or nothing.
pub fn search_chain<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    time: &AstroTime,
) -> Result<NextPhases, QuarterChainError> {
    let mut slots: [Option<DateTime<Utc>>; 4] = [None; 4];

    let mut event = ephemeris
        .search_moon_quarter(time)
        .map_err(|source| QuarterChainError::Search { step: 0, source })?;
    place(&mut slots, &event)?;

    for step in 1..Quarter::ALL.len() {
        event = ephemeris
            .next_moon_quarter(&event)
            .map_err(|source| QuarterChainError::Search { step, source })?;
        place(&mut slots, &event)?;
    }

    match slots {
        [Some(new_moon), Some(first_quarter), Some(full_moon), Some(last_quarter)] => {
            Ok(NextPhases {
                new_moon,
                first_quarter,
                full_moon,
                last_quarter,
                approximate: false,
            })
        }
        // Four distinct quarters always fill every slot
        _ => Err(QuarterChainError::Duplicate(event.quarter)),
    }
}

fn place(
    slots: &mut [Option<DateTime<Utc>>; 4],
    event: &MoonQuarter,
) -> Result<(), QuarterChainError> {
    let slot = &mut slots[event.quarter.index()];
    if slot.is_some() {
        return Err(QuarterChainError::Duplicate(event.quarter));
    }
    *slot = Some(event.time.utc());
    Ok(())
}
