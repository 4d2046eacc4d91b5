//! Pattern Library and Query Generator
//!
//! Per-metric regex extraction patterns with magnitude/percentage
//! normalization, plus the search-query templates used to hunt for missing
//! fields on the web.

pub mod normalize;
pub mod patterns;
pub mod queries;

pub use normalize::normalize_value;
pub use patterns::{extract_metric, ExtractedCandidate};
pub use queries::QueryGenerator;
