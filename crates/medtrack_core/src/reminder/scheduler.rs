//! Reminder scheduler owning the scan and midnight timers.
//!
//! # Invariants
//! - `enable` always cancels running timers before starting new ones, so
//!   enabling twice never leaves two scan loops alive.
//! - `disable` and `Drop` release both timer threads.

use crate::clock::Clock;
use crate::reminder::timer::{spawn_midnight, spawn_repeating, TimerHandle};
use log::info;
use std::sync::Arc;
use std::time::Duration;

/// Fixed period between reminder scans.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Single-owner reminder timer lifecycle.
#[derive(Debug)]
pub struct ReminderScheduler {
    interval: Duration,
    scan_timer: Option<TimerHandle>,
    midnight_timer: Option<TimerHandle>,
}

impl Default for ReminderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::with_interval(SCAN_INTERVAL)
    }

    /// Scheduler with a custom scan period (tests use milliseconds).
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            scan_timer: None,
            midnight_timer: None,
        }
    }

    /// Starts scanning now and every interval, plus the midnight reset.
    ///
    /// Any previously running timers are cancelled first.
    ///
    /// # Errors
    /// - Returns an error when a timer thread cannot be spawned; no timer is
    ///   left running in that case.
    pub fn enable<S, M>(
        &mut self,
        clock: Arc<dyn Clock>,
        on_scan: S,
        on_midnight: M,
    ) -> std::io::Result<()>
    where
        S: FnMut() + Send + 'static,
        M: FnMut() + Send + 'static,
    {
        self.disable();

        let scan = spawn_repeating("reminder-scan", self.interval, on_scan)?;
        let midnight = spawn_midnight("reminder-midnight", clock, on_midnight)?;
        self.scan_timer = Some(scan);
        self.midnight_timer = Some(midnight);

        info!(
            "event=reminder_scheduler module=reminder status=enabled interval_ms={}",
            self.interval.as_millis()
        );
        Ok(())
    }

    /// Cancels both timers. No-op when already stopped.
    pub fn disable(&mut self) {
        let was_running = self.is_running();
        if let Some(mut timer) = self.scan_timer.take() {
            timer.cancel();
        }
        if let Some(mut timer) = self.midnight_timer.take() {
            timer.cancel();
        }
        if was_running {
            info!("event=reminder_scheduler module=reminder status=disabled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.scan_timer.is_some() || self.midnight_timer.is_some()
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.disable();
    }
}
