//! Read-only projections over schedules and dose logs.

pub mod day_stats;
