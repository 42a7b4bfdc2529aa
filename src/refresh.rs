//! # Periodic Refresh
//!
//! Keeps a displayed [`MoonState`] current by recomputing it for the same
//! location on a fixed period (60 s by default).
//!
//! ## Ownership
//! - At most one background task per scheduler
//! - [`RefreshScheduler::track`] cancels the previous task before starting a
//!   new one, so a location change never leaves two timers running
//! - [`RefreshScheduler::stop`] and `Drop` abort the task
//! - The task also exits by itself once every receiver is gone
//!
//! Each new state replaces the previous one wholesale through a
//! `tokio::sync::watch` channel. A failed recompute keeps the previous state.
//! Recomputes run on the blocking pool, not on the async workers.

use crate::{Location, MoonState, MoonStateAssembler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default recompute period.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

struct RefreshTask {
    location: Location,
    handle: JoinHandle<()>,
}

/// Owner of the single recurring recompute task.
pub struct RefreshScheduler {
    assembler: MoonStateAssembler,
    period: Duration,
    task: Option<RefreshTask>,
}

impl RefreshScheduler {
    pub fn new(assembler: MoonStateAssembler, period: Duration) -> Self {
        RefreshScheduler {
            assembler,
            period,
            task: None,
        }
    }

    /// Start refreshing `initial.location`, replacing any tracked location.
    ///
    /// The receiver starts out holding `initial`. Must be called from within a
    /// Tokio runtime.
    pub fn track(&mut self, initial: MoonState) -> watch::Receiver<Arc<MoonState>> {
        self.stop();

        let location = initial.location.clone();
        let (tx, rx) = watch::channel(Arc::new(initial));
        let handle = tokio::spawn(refresh_loop(
            self.assembler.clone(),
            location.clone(),
            self.period,
            tx,
        ));

        info!(city = %location.city, period_secs = self.period.as_secs(), "tracking location");
        self.task = Some(RefreshTask { location, handle });
        rx
    }

    /// Cancel the running task, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
            debug!(city = %task.location.city, "refresh cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    pub fn tracked_location(&self) -> Option<&Location> {
        self.task.as_ref().map(|task| &task.location)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refresh_loop(
    assembler: MoonStateAssembler,
    location: Location,
    period: Duration,
    tx: watch::Sender<Arc<MoonState>>,
) {
    // First tick one period out; the caller already holds a fresh state
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => break,
        }

        // The event searches are CPU-bound; keep them off the async workers
        let job = {
            let assembler = assembler.clone();
            let location = location.clone();
            task::spawn_blocking(move || assembler.compute(&location, None))
        };

        match job.await {
            Ok(Ok(state)) => {
                debug!(city = %location.city, instant = %state.instant, "moon state refreshed");
                if tx.send(Arc::new(state)).is_err() {
                    break;
                }
            }
            Ok(Err(error)) => {
                warn!(city = %location.city, %error, "refresh failed, keeping previous state");
            }
            Err(error) => {
                warn!(city = %location.city, %error, "refresh task panicked, keeping previous state");
            }
        }
    }

    debug!(city = %location.city, "refresh loop finished");
}
