//! JSON import/export of the full tracker document.
//!
//! # Invariants
//! - Import is all-or-nothing: a document is either fully valid and adopted,
//!   or rejected with a reason and nothing changes.

pub mod document;
