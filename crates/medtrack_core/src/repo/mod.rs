//! Persistence provider contracts and implementations.
//!
//! # Responsibility
//! - Load and save the whole `AppData` document.
//! - Isolate SQLite and JSON encoding details from the tracker service.
//!
//! # Invariants
//! - Loading never fails: absent or malformed data yields `AppData::default()`.
//! - Saving replaces the stored document as a whole.

pub mod data_repo;
