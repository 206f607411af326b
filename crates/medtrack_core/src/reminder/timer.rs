//! Cancellable background timers.
//!
//! Each timer runs on its own named thread and waits on a cancel channel,
//! so cancellation wakes it immediately instead of waiting out a sleep.
//! Dropping the handle cancels the timer and joins its thread.

use crate::clock::Clock;
use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, error};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle owning one timer thread.
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Stops the timer and waits for its thread to exit.
    ///
    /// Must not be called from inside the timer's own callback.
    pub fn cancel(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.cancel.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(
                    "event=timer_cancel module=reminder status=error timer={} error_code=callback_panicked",
                    self.name
                );
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn spawn_timer(
    name: &'static str,
    body: impl FnOnce(mpsc::Receiver<()>) + Send + 'static,
) -> std::io::Result<TimerHandle> {
    let (cancel, cancelled) = mpsc::channel();
    let thread = thread::Builder::new()
        .name(format!("medtrack-{name}"))
        .spawn(move || body(cancelled))?;
    debug!("event=timer_start module=reminder status=ok timer={}", name);
    Ok(TimerHandle {
        name,
        cancel: Some(cancel),
        thread: Some(thread),
    })
}

/// Runs `tick` immediately and then every `interval` until cancelled.
///
/// # Errors
/// - Returns an error when the timer thread cannot be spawned.
pub fn spawn_repeating<F>(
    name: &'static str,
    interval: Duration,
    mut tick: F,
) -> std::io::Result<TimerHandle>
where
    F: FnMut() + Send + 'static,
{
    spawn_timer(name, move |cancelled| loop {
        tick();
        match cancelled.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    })
}

/// Fires `on_midnight` at each next local midnight until cancelled.
///
/// The one-shot delay is recomputed from `clock` after every firing, so the
/// timer re-arms daily instead of drifting on a fixed 24h interval.
///
/// # Errors
/// - Returns an error when the timer thread cannot be spawned.
pub fn spawn_midnight<F>(
    name: &'static str,
    clock: Arc<dyn Clock>,
    mut on_midnight: F,
) -> std::io::Result<TimerHandle>
where
    F: FnMut() + Send + 'static,
{
    spawn_timer(name, move |cancelled| loop {
        let delay = duration_until_next_midnight(clock.now());
        match cancelled.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => on_midnight(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    })
}

/// Time left until the next local midnight strictly after `now`.
pub fn duration_until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = now
        .date()
        .succ_opt()
        .and_then(|date| date.and_hms_opt(0, 0, 0));
    match next_midnight {
        Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
        // Last representable day; wait a day and recompute.
        None => TimeDelta::days(1).to_std().unwrap_or(Duration::from_secs(86_400)),
    }
}

#[cfg(test)]
mod tests {
    use super::{duration_until_next_midnight, spawn_midnight, spawn_repeating};
    use crate::clock::{Clock, FixedClock};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn next_midnight_delay_is_computed_from_local_time() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(23, 59, 30)
            .unwrap();
        assert_eq!(duration_until_next_midnight(now), Duration::from_secs(30));

        let midnight = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            duration_until_next_midnight(midnight),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn repeating_timer_ticks_immediately_and_stops_on_cancel() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut handle = spawn_repeating("test-repeat", Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(60));
        handle.cancel();
        let after_cancel = ticks.load(Ordering::SeqCst);
        assert!(after_cancel >= 2, "expected several ticks, got {after_cancel}");
        assert!(!handle.is_active());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn midnight_timer_rearms_after_firing() {
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap(),
        ));
        // Keep the clock one second before midnight so every arm is short.
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let shared: Arc<dyn Clock> = clock;
        let handle = spawn_midnight("test-midnight", shared, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(2_300));
        drop(handle);
        assert!(fired.load(Ordering::SeqCst) >= 2);
    }
}
