//! Dose reminders.
//!
//! # Responsibility
//! - Find doses coming due within the configured lead time, exactly once.
//! - Drive periodic scans and the midnight reset from cancellable timers.
//! - Hand reminder events to an external notification sink.
//!
//! # Invariants
//! - A dose key is emitted at most once until the notified set is reset.
//! - At most one scan timer and one midnight timer are alive per scheduler.

pub mod scanner;
pub mod scheduler;
pub mod sink;
pub mod timer;
