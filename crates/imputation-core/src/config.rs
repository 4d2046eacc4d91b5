//! Tunable constants shared across the imputation pipeline.
//!
//! The threshold and bias values come from scoring calibration; they are
//! exposed as named constants so callers can see (and tests can pin) the
//! exact gates in effect.

/// A field counts as successfully imputed only when its final confidence
/// exceeds this gate.
pub const MIN_CONFIDENCE_GATE: f64 = 0.3;

/// Priority bias added to critical missing fields at gap-analysis time.
pub const CRITICAL_PRIORITY_BIAS: i32 = 30;
/// Priority bias added to important missing fields at gap-analysis time.
pub const IMPORTANT_PRIORITY_BIAS: i32 = 15;

/// Search priority for fields without an explicit per-strategy entry.
pub const DEFAULT_QUERY_PRIORITY: i32 = 5;

/// US corporate tax rate used for NOPAT when the effective rate is
/// unavailable or outside the plausible [0, 0.6] range.
pub const DEFAULT_TAX_RATE: f64 = 0.21;

/// Years of history considered for long-run CAGRs.
pub const HISTORY_YEARS: usize = 10;
/// Years considered for margin-trend analysis.
pub const TREND_YEARS: usize = 5;

/// Candidate score weights: extraction confidence, source credibility, and a
/// flat bonus for having found any value at all.
pub const EXTRACTION_WEIGHT: f64 = 0.4;
pub const CREDIBILITY_WEIGHT: f64 = 0.4;
pub const CANDIDATE_BASE_SCORE: f64 = 0.2;

/// Confidence multipliers applied after range validation of the top candidate.
pub const VALID_CONFIDENCE_BOOST: f64 = 1.1;
pub const INVALID_CONFIDENCE_PENALTY: f64 = 0.8;

/// How many structured search hits are consumed per query.
pub const MAX_HITS_PER_QUERY: usize = 3;
