use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Importance tier of a required field within a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    Important,
    Optional,
}

impl Criticality {
    /// Search-priority bias applied when a field of this tier is missing.
    pub fn priority_bias(&self) -> i32 {
        match self {
            Criticality::Critical => crate::config::CRITICAL_PRIORITY_BIAS,
            Criticality::Important => crate::config::IMPORTANT_PRIORITY_BIAS,
            Criticality::Optional => 0,
        }
    }
}

/// Analysis strategy the required-field schema is defined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    PhilTown,
    HighGrowth,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::PhilTown => "phil_town",
            Strategy::HighGrowth => "high_growth",
        }
    }
}

/// Static schema entry describing one field a strategy needs.
#[derive(Debug, Clone)]
pub struct FieldRequirement {
    pub field_name: &'static str,
    /// Keys the fetch layer would normally populate this field under.
    pub sources: &'static [&'static str],
    /// Secondary keys the field can be derived from.
    pub fallbacks: &'static [&'static str],
    pub description: &'static str,
    /// What breaks downstream when this field is missing.
    pub impact: &'static str,
    pub criticality: Criticality,
}

/// Missing-field report for one (ticker, strategy) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub strategy: Strategy,
    pub ticker: String,
    pub critical_missing: Vec<String>,
    pub important_missing: Vec<String>,
    pub optional_missing: Vec<String>,
    /// Field -> search priority (generator priority + tier bias).
    pub search_priority: HashMap<String, i32>,
    /// Field -> human-readable downstream impact.
    pub impact_assessment: HashMap<String, String>,
}

impl GapAnalysis {
    pub fn new(strategy: Strategy, ticker: impl Into<String>) -> Self {
        Self {
            strategy,
            ticker: ticker.into(),
            critical_missing: Vec::new(),
            important_missing: Vec::new(),
            optional_missing: Vec::new(),
            search_priority: HashMap::new(),
            impact_assessment: HashMap::new(),
        }
    }

    pub fn total_missing(&self) -> usize {
        self.critical_missing.len() + self.important_missing.len() + self.optional_missing.len()
    }

    pub fn all_missing(&self) -> impl Iterator<Item = &String> {
        self.critical_missing
            .iter()
            .chain(self.important_missing.iter())
            .chain(self.optional_missing.iter())
    }
}

/// Quality summary of the locally available (pre-imputation) data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityAssessment {
    pub completeness_score: f64,
    pub reliability_score: f64,
    pub missing_critical_fields: Vec<String>,
    pub missing_optional_fields: Vec<String>,
    /// Section -> provider label.
    pub data_sources: HashMap<String, String>,
}

/// Coarse classification of a web source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    SecFiling,
    FinancialNews,
    FinancialWebsite,
    AnalystReport,
    CompanyPresentation,
    ForumDiscussion,
    GovernmentData,
}

/// How a candidate value was pulled out of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    RegexPattern,
    HtmlTable,
    JsonApi,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::RegexPattern => "regex_pattern",
            ExtractionMethod::HtmlTable => "html_table",
            ExtractionMethod::JsonApi => "json_api",
        }
    }
}

/// Metric families the pattern library can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Roic,
    Ebit,
    Debt,
    EpsGrowth,
    SalesGrowth,
    NetMargin,
    PeRatio,
    PsRatio,
    Roe,
    InsiderOwnership,
    DividendYield,
    MarketCap,
}

impl MetricKind {
    /// Map a requirement field name to its extraction family. Fields with no
    /// textual phrasing (pure statement line items) return None and simply
    /// yield no candidates.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "roic" => Some(MetricKind::Roic),
            "ebit" => Some(MetricKind::Ebit),
            "debt" | "total_debt" | "long_term_debt" | "debt_payoff" | "debt_to_ebitda" => {
                Some(MetricKind::Debt)
            }
            "eps_growth" => Some(MetricKind::EpsGrowth),
            "sales_growth" => Some(MetricKind::SalesGrowth),
            "net_margin" | "net_margin_trend" => Some(MetricKind::NetMargin),
            "pe_ratio" | "per_ratio" => Some(MetricKind::PeRatio),
            "psr_ratio" => Some(MetricKind::PsRatio),
            "roe" => Some(MetricKind::Roe),
            "insider_ownership" => Some(MetricKind::InsiderOwnership),
            "dividend_yield" => Some(MetricKind::DividendYield),
            "market_cap" => Some(MetricKind::MarketCap),
            _ => None,
        }
    }
}

/// One web hit consumed during imputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source_type: SourceType,
    /// Source trust rating in [0, 1].
    pub credibility_score: Option<f64>,
    /// Relevance to the issuing query in [0, 1].
    pub relevance_score: f64,
    pub publish_date: Option<DateTime<Utc>>,
    /// Raw values extracted from this result's content.
    pub extracted_values: Vec<f64>,
}

/// Result of the field-specific sanity check on a candidate value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub validation_score: f64,
    pub notes: Option<String>,
}

/// One candidate value for a field, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDataPoint {
    pub field_name: String,
    pub raw_value: String,
    pub normalized_value: f64,
    pub extraction_method: ExtractionMethod,
    pub source_url: String,
    /// Text surrounding the match, for credibility context scoring.
    pub source_context: String,
    /// Extraction confidence in [0, 1].
    pub extraction_confidence: f64,
    pub validation: Option<ValidationOutcome>,
}

/// Full record of one field's imputation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationAttempt {
    pub ticker: String,
    pub field_name: String,
    pub search_queries: Vec<String>,
    pub search_results: Vec<SearchResult>,
    pub extracted_data_points: Vec<ExtractedDataPoint>,
    pub final_value: Option<f64>,
    /// Overall confidence in [0, 1].
    pub confidence: f64,
    pub success: bool,
    pub failure_reasons: Vec<String>,
    pub processing_time_ms: u64,
}

impl ImputationAttempt {
    pub fn new(ticker: impl Into<String>, field: impl Into<String>, queries: Vec<String>) -> Self {
        Self {
            ticker: ticker.into(),
            field_name: field.into(),
            search_queries: queries,
            search_results: Vec::new(),
            extracted_data_points: Vec::new(),
            final_value: None,
            confidence: 0.0,
            success: false,
            failure_reasons: Vec::new(),
            processing_time_ms: 0,
        }
    }
}

/// Session-level quality aggregate, all components clamped to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: f64,
    pub accuracy: f64,
    pub reliability: f64,
    pub timeliness: f64,
    pub consistency: f64,
    pub overall_quality: f64,
    pub quality_notes: Vec<String>,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            completeness: 0.0,
            accuracy: 0.0,
            reliability: 0.0,
            // Web data is assumed recent.
            timeliness: 0.8,
            consistency: 0.0,
            overall_quality: 0.0,
            quality_notes: Vec::new(),
        }
    }
}

/// Final per-field imputation result exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldImputation {
    pub field_name: String,
    pub imputed_value: Option<f64>,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub alternative_values: Vec<f64>,
    pub validation_notes: Option<String>,
    pub extraction_method: Option<ExtractionMethod>,
}

/// Per-field search execution summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub field_name: String,
    pub queries_executed: usize,
    pub sources_found: usize,
    pub extraction_success: bool,
    pub search_duration_ms: u64,
    pub errors: Vec<String>,
}

/// Complete output of one imputation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationOutput {
    pub ticker: String,
    pub requested_fields: Vec<String>,
    pub strategy: Strategy,
    pub imputation_results: HashMap<String, FieldImputation>,
    pub search_summary: HashMap<String, SearchSummary>,
    pub data_quality_assessment: QualityMetrics,
    /// Successful fields / requested fields, as a percentage.
    pub overall_success_rate: f64,
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_bias_matches_config() {
        assert_eq!(Criticality::Critical.priority_bias(), 30);
        assert_eq!(Criticality::Important.priority_bias(), 15);
        assert_eq!(Criticality::Optional.priority_bias(), 0);
    }

    #[test]
    fn strategy_wire_format_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&Strategy::PhilTown).unwrap(),
            "\"phil_town\""
        );
        let strategy: Strategy = serde_json::from_str("\"high_growth\"").unwrap();
        assert_eq!(strategy, Strategy::HighGrowth);
    }

    #[test]
    fn metric_kind_field_mapping() {
        assert_eq!(MetricKind::from_field("roic"), Some(MetricKind::Roic));
        assert_eq!(MetricKind::from_field("per_ratio"), Some(MetricKind::PeRatio));
        assert_eq!(MetricKind::from_field("total_debt"), Some(MetricKind::Debt));
        assert_eq!(MetricKind::from_field("total_stockholder_equity"), None);
    }
}
