//! Web imputation engine.
//!
//! Drives the search -> extract -> validate pipeline for missing financial
//! fields. The search capability is injected through `SearchProvider`; when
//! none is configured every field fails gracefully with a recorded reason
//! instead of aborting the session.

pub mod cache;
pub mod engine;

pub use cache::SearchCache;
pub use engine::ImputationEngine;
