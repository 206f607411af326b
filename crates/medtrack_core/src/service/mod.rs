//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate resolver, store, scanner and repository into use-cases.
//! - Enforce the editability gate on every mutation entry point.
//! - Keep CLI and other hosts decoupled from storage details.

pub mod tracker_service;
