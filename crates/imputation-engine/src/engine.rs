//! Per-field search, extraction, validation, and session aggregation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use extraction_patterns::{extract_metric, QueryGenerator};
use imputation_core::config::{
    CANDIDATE_BASE_SCORE, CREDIBILITY_WEIGHT, EXTRACTION_WEIGHT, INVALID_CONFIDENCE_PENALTY,
    MAX_HITS_PER_QUERY, MIN_CONFIDENCE_GATE, VALID_CONFIDENCE_BOOST,
};
use imputation_core::{
    ExtractedDataPoint, ExtractionMethod, FieldImputation, GapAnalysis, ImputationAttempt,
    ImputationError, ImputationOutput, MetricKind, QualityMetrics, SearchProvider, SearchResponse,
    SearchResult, SearchSummary, SourceType, Strategy, ValidationOutcome,
};
use source_credibility::SourceCredibilityScorer;

use crate::cache::SearchCache;

/// Default number of queries executed per field before giving up.
const DEFAULT_MAX_QUERIES_PER_FIELD: usize = 3;

/// Characters of content kept around an extracted value for provenance.
const SNIPPET_WINDOW: usize = 50;

/// Orchestrates imputation of missing fields from web search results.
pub struct ImputationEngine {
    provider: Arc<dyn SearchProvider>,
    scorer: SourceCredibilityScorer,
    query_generator: QueryGenerator,
    cache: Option<SearchCache>,
    max_queries_per_field: usize,
}

impl ImputationEngine {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            scorer: SourceCredibilityScorer::new(),
            query_generator: QueryGenerator::new(),
            cache: None,
            max_queries_per_field: DEFAULT_MAX_QUERIES_PER_FIELD,
        }
    }

    pub fn with_cache(mut self, cache: SearchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_queries(mut self, max_queries_per_field: usize) -> Self {
        self.max_queries_per_field = max_queries_per_field;
        self
    }

    /// Run one imputation session over every missing field in the gap report.
    ///
    /// Field failures never abort the session; each failed field carries its
    /// own reasons in the attempt record and search summary.
    pub async fn impute_missing_data(
        &self,
        ticker: &str,
        gaps: &GapAnalysis,
    ) -> ImputationOutput {
        let session_start = Instant::now();
        let requested: Vec<String> = gaps.all_missing().cloned().collect();

        info!(
            ticker,
            strategy = gaps.strategy.as_str(),
            fields = requested.len(),
            "imputation session starting"
        );

        let mut imputation_results = HashMap::new();
        let mut search_summary = HashMap::new();
        let mut attempts = Vec::new();

        for field in &requested {
            let (attempt, summary) = self.impute_field(ticker, field, gaps.strategy).await;
            imputation_results.insert(field.clone(), field_result(&attempt));
            search_summary.insert(field.clone(), summary);
            attempts.push(attempt);
        }

        let quality = session_quality(&attempts, requested.len());
        let successes = attempts.iter().filter(|a| a.success).count();
        let overall_success_rate = if requested.is_empty() {
            0.0
        } else {
            successes as f64 / requested.len() as f64 * 100.0
        };

        info!(
            ticker,
            successes,
            requested = requested.len(),
            "imputation session finished"
        );

        ImputationOutput {
            ticker: ticker.to_string(),
            requested_fields: requested,
            strategy: gaps.strategy,
            imputation_results,
            search_summary,
            data_quality_assessment: quality,
            overall_success_rate,
            execution_time_ms: session_start.elapsed().as_millis() as u64,
        }
    }

    async fn impute_field(
        &self,
        ticker: &str,
        field: &str,
        strategy: Strategy,
    ) -> (ImputationAttempt, SearchSummary) {
        let field_start = Instant::now();
        let mut queries = self.query_generator.generate(ticker, field, strategy);
        queries.truncate(self.max_queries_per_field);

        let mut attempt = ImputationAttempt::new(ticker, field, queries.clone());
        let mut errors = Vec::new();
        let mut queries_executed = 0;

        debug!(ticker, field, "querying");
        for query in &queries {
            queries_executed += 1;
            match self.run_search(query).await {
                Ok(response) => {
                    let results = self.collect_results(query, response, field);
                    attempt.search_results.extend(results);
                }
                Err(err) => {
                    warn!(ticker, field, query, %err, "search failed");
                    errors.push(err.to_string());
                    attempt.failure_reasons.push(err.to_string());
                }
            }
        }

        debug!(
            ticker,
            field,
            sources = attempt.search_results.len(),
            "extracting"
        );
        attempt.extracted_data_points = self.extract_points(field, &attempt.search_results);

        if attempt.extracted_data_points.is_empty() {
            attempt
                .failure_reasons
                .push("No data points extracted from search results".to_string());
        } else {
            debug!(
                ticker,
                field,
                candidates = attempt.extracted_data_points.len(),
                "validating"
            );
            self.select_best(field, &mut attempt);
        }

        attempt.processing_time_ms = field_start.elapsed().as_millis() as u64;

        if attempt.success {
            info!(
                ticker,
                field,
                value = attempt.final_value,
                confidence = attempt.confidence,
                "field imputed"
            );
        } else {
            debug!(ticker, field, reasons = ?attempt.failure_reasons, "field failed");
        }

        let summary = SearchSummary {
            field_name: field.to_string(),
            queries_executed,
            sources_found: attempt.search_results.len(),
            extraction_success: attempt.success,
            search_duration_ms: attempt.processing_time_ms,
            errors,
        };
        (attempt, summary)
    }

    async fn run_search(&self, query: &str) -> Result<SearchResponse, ImputationError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(query).await {
                debug!(query, "search cache hit");
                return Ok(hit);
            }
        }

        let response = self.provider.search(query).await?;
        if let Some(cache) = &self.cache {
            cache.insert(query.to_string(), response.clone()).await;
        }
        Ok(response)
    }

    /// Turn one raw search response into scored `SearchResult` records.
    fn collect_results(
        &self,
        query: &str,
        response: SearchResponse,
        field: &str,
    ) -> Vec<SearchResult> {
        match response {
            SearchResponse::Text(content) => vec![SearchResult {
                url: format!("search://{}", query.replace(' ', "+")),
                title: query.to_string(),
                content,
                source_type: SourceType::FinancialWebsite,
                credibility_score: None,
                relevance_score: 0.7,
                publish_date: None,
                extracted_values: Vec::new(),
            }],
            SearchResponse::Structured(hits) => hits
                .into_iter()
                .take(MAX_HITS_PER_QUERY)
                .map(|hit| {
                    let credibility = self.scorer.score(&hit.url, &hit.content, field);
                    SearchResult {
                        source_type: self.scorer.source_type_from_url(&hit.url),
                        credibility_score: Some(credibility),
                        relevance_score: 0.8,
                        publish_date: None,
                        extracted_values: Vec::new(),
                        url: hit.url,
                        title: hit.title,
                        content: hit.content,
                    }
                })
                .collect(),
        }
    }

    fn extract_points(&self, field: &str, results: &[SearchResult]) -> Vec<ExtractedDataPoint> {
        let Some(metric) = MetricKind::from_field(field) else {
            return Vec::new();
        };

        let mut seen: HashSet<(String, u64)> = HashSet::new();
        let mut points = Vec::new();

        for result in results {
            for candidate in extract_metric(&result.content, metric) {
                if !seen.insert((result.url.clone(), candidate.value.to_bits())) {
                    continue;
                }
                points.push(ExtractedDataPoint {
                    field_name: field.to_string(),
                    raw_value: candidate.raw.clone(),
                    normalized_value: candidate.value,
                    extraction_method: ExtractionMethod::RegexPattern,
                    source_url: result.url.clone(),
                    source_context: snippet_around(&result.content, &candidate.raw),
                    extraction_confidence: f64::from(candidate.confidence) / 100.0,
                    validation: None,
                });
            }
        }
        points
    }

    /// Score all candidates, validate the best one, and settle the attempt.
    fn select_best(&self, field: &str, attempt: &mut ImputationAttempt) {
        let mut scored: Vec<(usize, f64)> = attempt
            .extracted_data_points
            .iter()
            .enumerate()
            .map(|(i, point)| (i, self.candidate_score(point, &attempt.search_results)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (best_idx, best_score) = scored[0];
        let value = attempt.extracted_data_points[best_idx].normalized_value;

        let validation = validate_value(field, value);
        let confidence = if validation.is_valid {
            (best_score * VALID_CONFIDENCE_BOOST).min(1.0)
        } else {
            best_score * INVALID_CONFIDENCE_PENALTY
        };
        let validation_note = validation.notes.clone();
        attempt.extracted_data_points[best_idx].validation = Some(validation);

        attempt.final_value = Some(value);
        attempt.confidence = confidence;
        attempt.success = confidence > MIN_CONFIDENCE_GATE;
        if !attempt.success {
            attempt.failure_reasons.push(validation_note.unwrap_or_else(|| {
                format!("Best candidate confidence {confidence:.2} below threshold")
            }));
        }
    }

    fn candidate_score(&self, point: &ExtractedDataPoint, results: &[SearchResult]) -> f64 {
        let credibility = results
            .iter()
            .find(|r| r.url == point.source_url)
            .and_then(|r| r.credibility_score)
            .unwrap_or(0.5);

        point.extraction_confidence * EXTRACTION_WEIGHT
            + credibility * CREDIBILITY_WEIGHT
            + CANDIDATE_BASE_SCORE
    }
}

/// Field-specific plausibility band. Fields without a band pass validation
/// at reduced strength.
fn expected_range(field: &str) -> Option<(f64, f64)> {
    match field {
        "roic" | "roe" => Some((-1.0, 2.0)),
        "eps_growth" | "sales_growth" => Some((-1.0, 5.0)),
        "pe_ratio" | "per_ratio" => Some((0.0, 1000.0)),
        "net_margin" | "net_margin_trend" => Some((-2.0, 1.0)),
        "insider_ownership" => Some((0.0, 1.0)),
        "dividend_yield" => Some((0.0, 0.25)),
        _ => None,
    }
}

fn validate_value(field: &str, value: f64) -> ValidationOutcome {
    match expected_range(field) {
        Some((lo, hi)) if value >= lo && value <= hi => ValidationOutcome {
            is_valid: true,
            validation_score: 0.9,
            notes: Some(format!("Value {value} within expected range [{lo}, {hi}]")),
        },
        Some((lo, hi)) => ValidationOutcome {
            is_valid: false,
            validation_score: 0.2,
            notes: Some(format!("Value {value} outside expected range [{lo}, {hi}]")),
        },
        None => ValidationOutcome {
            is_valid: true,
            validation_score: 0.7,
            notes: Some(format!("No range check defined for {field}")),
        },
    }
}

fn snippet_around(content: &str, raw: &str) -> String {
    let Some(pos) = content.find(raw) else {
        return String::new();
    };
    let mut lo = pos.saturating_sub(SNIPPET_WINDOW);
    while lo > 0 && !content.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (pos + raw.len() + SNIPPET_WINDOW).min(content.len());
    while hi < content.len() && !content.is_char_boundary(hi) {
        hi += 1;
    }
    content[lo..hi].to_string()
}

/// Caller-facing view of one attempt.
fn field_result(attempt: &ImputationAttempt) -> FieldImputation {
    let mut sources: Vec<String> = Vec::new();
    for point in &attempt.extracted_data_points {
        if !sources.contains(&point.source_url) {
            sources.push(point.source_url.clone());
        }
    }

    let alternative_values: Vec<f64> = attempt
        .extracted_data_points
        .iter()
        .map(|p| p.normalized_value)
        .filter(|v| Some(*v) != attempt.final_value)
        .collect();

    let validation_notes = Some(validation_notes(attempt, sources.len()));

    FieldImputation {
        field_name: attempt.field_name.clone(),
        imputed_value: if attempt.success {
            attempt.final_value
        } else {
            None
        },
        confidence: attempt.confidence,
        sources,
        alternative_values,
        validation_notes,
        extraction_method: if attempt.extracted_data_points.is_empty() {
            None
        } else {
            Some(ExtractionMethod::RegexPattern)
        },
    }
}

/// Human-readable summary of how an attempt went.
fn validation_notes(attempt: &ImputationAttempt, source_count: usize) -> String {
    if !attempt.success {
        if attempt.failure_reasons.is_empty() {
            return "Imputation failed".to_string();
        }
        return attempt.failure_reasons.join("; ");
    }

    let confidence_label = if attempt.confidence >= 0.7 {
        "high"
    } else if attempt.confidence >= 0.5 {
        "medium"
    } else {
        "low"
    };
    let mut notes = format!(
        "Imputed from {source_count} source(s) with {confidence_label} confidence"
    );
    if let Some(range_note) = attempt
        .extracted_data_points
        .iter()
        .find_map(|p| p.validation.as_ref())
        .and_then(|v| v.notes.as_deref())
    {
        notes.push_str("; ");
        notes.push_str(range_note);
    }
    notes
}

/// Session-level quality aggregate over all attempts.
fn session_quality(attempts: &[ImputationAttempt], requested: usize) -> QualityMetrics {
    let mut quality = QualityMetrics::default();
    if requested == 0 {
        return quality;
    }

    let successes: Vec<&ImputationAttempt> = attempts.iter().filter(|a| a.success).collect();
    quality.completeness = successes.len() as f64 / requested as f64;
    quality.accuracy = if successes.is_empty() {
        0.0
    } else {
        successes.iter().map(|a| a.confidence).sum::<f64>() / successes.len() as f64
    };
    quality.reliability = quality.accuracy * 0.9;

    let multi_source = successes.iter().any(|a| {
        a.extracted_data_points
            .iter()
            .map(|p| p.source_url.as_str())
            .collect::<HashSet<_>>()
            .len()
            > 1
    });
    quality.consistency = if multi_source { 0.8 } else { 0.6 };

    quality.overall_quality = quality.completeness * 0.3
        + quality.accuracy * 0.3
        + quality.reliability * 0.2
        + quality.timeliness * 0.1
        + quality.consistency * 0.1;

    quality
        .quality_notes
        .push(format!("{}/{} fields imputed", successes.len(), requested));
    if successes.len() < requested {
        quality
            .quality_notes
            .push("Some fields could not be imputed from web sources".to_string());
    }

    quality
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use imputation_core::{NullSearchProvider, SearchHit};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedProvider {
        response: SearchResponse,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(response: SearchResponse) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FixedProvider {
        async fn search(&self, _query: &str) -> Result<SearchResponse, ImputationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn gaps_for(field: &str, strategy: Strategy) -> GapAnalysis {
        let mut gaps = GapAnalysis::new(strategy, "TEST");
        gaps.critical_missing.push(field.to_string());
        gaps
    }

    #[tokio::test]
    async fn missing_provider_fails_gracefully() {
        let engine = ImputationEngine::new(Arc::new(NullSearchProvider));
        let gaps = gaps_for("eps_growth", Strategy::PhilTown);

        let output = engine.impute_missing_data("AAPL", &gaps).await;

        let result = &output.imputation_results["eps_growth"];
        assert_eq!(result.imputed_value, None);
        assert_eq!(output.overall_success_rate, 0.0);

        let summary = &output.search_summary["eps_growth"];
        assert!(summary
            .errors
            .iter()
            .any(|e| e.contains("search tool not available")));
        assert!(!summary.extraction_success);
    }

    #[tokio::test]
    async fn text_response_yields_imputed_percentage() {
        let provider = FixedProvider::new(SearchResponse::Text(
            "Per the annual report, ROIC: 18.5% for fiscal year".to_string(),
        ));
        let engine = ImputationEngine::new(Arc::new(provider));
        let gaps = gaps_for("roic", Strategy::PhilTown);

        let output = engine.impute_missing_data("AAPL", &gaps).await;

        let result = &output.imputation_results["roic"];
        assert_eq!(result.imputed_value, Some(0.185));
        assert!(result.confidence > MIN_CONFIDENCE_GATE);
        assert_eq!(result.extraction_method, Some(ExtractionMethod::RegexPattern));
        assert_eq!(output.overall_success_rate, 100.0);
    }

    #[tokio::test]
    async fn credible_source_wins_over_forum() {
        let hits = vec![
            SearchHit {
                url: "https://reddit.com/r/stocks/thread".to_string(),
                title: "what do you think".to_string(),
                content: "P/E Ratio: 12".to_string(),
            },
            SearchHit {
                url: "https://sec.gov/filings/aapl-10k".to_string(),
                title: "Annual report".to_string(),
                content: "From the SEC filing income statement, P/E Ratio: 14".to_string(),
            },
        ];
        let provider = FixedProvider::new(SearchResponse::Structured(hits));
        let engine = ImputationEngine::new(Arc::new(provider));
        let gaps = gaps_for("pe_ratio", Strategy::HighGrowth);

        let output = engine.impute_missing_data("AAPL", &gaps).await;

        let result = &output.imputation_results["pe_ratio"];
        assert_eq!(result.imputed_value, Some(14.0));
        assert!(result.alternative_values.contains(&12.0));
        assert_eq!(result.sources.len(), 2);
        // Two distinct sources back the winner's field.
        assert_eq!(output.data_quality_assessment.consistency, 0.8);
    }

    #[tokio::test]
    async fn out_of_range_value_is_penalized() {
        let provider = FixedProvider::new(SearchResponse::Text(
            "Insider Ownership: 340% reported".to_string(),
        ));
        let engine = ImputationEngine::new(Arc::new(provider));
        let gaps = gaps_for("insider_ownership", Strategy::PhilTown);

        let output = engine.impute_missing_data("AAPL", &gaps).await;

        let result = &output.imputation_results["insider_ownership"];
        let notes = result.validation_notes.as_deref().unwrap_or("");
        assert!(notes.contains("outside expected range"));
    }

    #[tokio::test]
    async fn cache_short_circuits_repeat_queries() {
        let provider = Arc::new(FixedProvider::new(SearchResponse::Text(
            "ROE: 22.0%".to_string(),
        )));
        let engine = ImputationEngine::new(provider.clone())
            .with_cache(SearchCache::new(64, Duration::from_secs(300)));
        let gaps = gaps_for("roe", Strategy::HighGrowth);

        engine.impute_missing_data("MSFT", &gaps).await;
        let first_round = provider.calls.load(Ordering::SeqCst);
        engine.impute_missing_data("MSFT", &gaps).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), first_round);
    }

    #[tokio::test]
    async fn query_cap_is_caller_configurable() {
        let provider = Arc::new(FixedProvider::new(SearchResponse::Text(
            "ROE: 22.0%".to_string(),
        )));
        let engine = ImputationEngine::new(provider.clone()).with_max_queries(1);
        let gaps = gaps_for("roe", Strategy::HighGrowth);

        let output = engine.impute_missing_data("MSFT", &gaps).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(output.search_summary["roe"].queries_executed, 1);
    }

    #[tokio::test]
    async fn no_extractable_content_records_reason() {
        let provider = FixedProvider::new(SearchResponse::Text(
            "nothing numeric in here".to_string(),
        ));
        let engine = ImputationEngine::new(Arc::new(provider));
        let gaps = gaps_for("roic", Strategy::PhilTown);

        let output = engine.impute_missing_data("AAPL", &gaps).await;

        assert_eq!(output.imputation_results["roic"].imputed_value, None);
        assert_eq!(
            output.data_quality_assessment.completeness, 0.0
        );
    }
}
