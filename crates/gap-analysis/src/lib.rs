//! Gap Analyzer
//!
//! Inspects a structured financial-data bundle against a strategy's
//! required-field schema and reports missing fields with priority and
//! downstream impact.

pub mod analyzer;
pub mod requirements;

pub use analyzer::DataGapAnalyzer;
pub use requirements::requirements_for;
