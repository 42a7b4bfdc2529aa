//! # Fallback Quarter-Phase Dates
//!
//! When the chained quarter search cannot deliver all four events, the
//! scheduler shows these instead. The model is deliberately naive: one
//! quarter per week, in fixed order, counted from the requested instant.
//!
//! | Field           | Offset   |
//! |-----------------|----------|
//! | `new_moon`      | +7 days  |
//! | `first_quarter` | +14 days |
//! | `full_moon`     | +21 days |
//! | `last_quarter`  | +28 days |
//!
//! ### Accuracy Trade-offs
//! - ✅ **Always available**: pure date arithmetic, cannot fail
//! - ✅ **Plausible spacing**: a quarter is ~7.4 days, so the gaps look right
//! - ❌ **Wrong anchor**: the dates ignore the actual lunar cycle
//!
//! The result carries `approximate = true` so callers can tell it apart from
//! searched dates, even though displays render both the same way.

use crate::NextPhases;
use chrono::{DateTime, Duration, Utc};

/// Days between successive approximate quarters.
const DAYS_PER_QUARTER: i64 = 7;

/// Weekly approximation of the next four quarter phases after `now`.
/// If `now` is `None`, fall back to `Utc::now()`.
pub fn approximate(now: Option<DateTime<Utc>>) -> NextPhases {
    let now = now.unwrap_or_else(Utc::now);
    let week = |n: i64| now + Duration::days(DAYS_PER_QUARTER * n);

    NextPhases {
        new_moon: week(1),
        first_quarter: week(2),
        full_moon: week(3),
        last_quarter: week(4),
        approximate: true,
    }
}
