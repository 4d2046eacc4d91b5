//! Enhanced metric calculation over primary plus imputed data.
//!
//! Recomputes strategy metrics from financial statements, filling holes with
//! web-imputed values where the statements come up short. Every metric
//! carries its own confidence, provenance, and interpretation; calculation
//! failures surface as per-metric errors, never as a panic or an aborted
//! report.

pub mod calculator;
pub mod formulas;

pub use calculator::{EnhancedMetricCalculator, MetricMethod, MetricReport, MetricValue};
pub use formulas::{MarginOfSafety, TrendDirection};
