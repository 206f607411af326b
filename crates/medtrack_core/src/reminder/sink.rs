//! Notification sink boundary.
//!
//! Core only produces `ReminderEvent`s; whether they become a sound, an OS
//! notification or a banner is decided by the sink implementation.

use crate::reminder::scanner::ReminderEvent;
use log::info;
use std::sync::Mutex;

/// Consumer of reminder events.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, event: &ReminderEvent);

    fn deliver_all(&self, events: &[ReminderEvent]) {
        for event in events {
            self.deliver(event);
        }
    }
}

/// Sink that only records delivery metadata in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn deliver(&self, event: &ReminderEvent) {
        info!(
            "event=reminder_deliver module=reminder status=ok key={} minutes_until={}",
            event.key(),
            event.minutes_until_dose
        );
    }
}

/// Sink that keeps delivered events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ReminderEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the delivered events.
    pub fn take(&self) -> Vec<ReminderEvent> {
        let mut guard = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl NotificationSink for CollectingSink {
    fn deliver(&self, event: &ReminderEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
