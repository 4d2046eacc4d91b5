//! Missing-field detection and local data-quality scoring.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tracing::debug;

use extraction_patterns::QueryGenerator;
use imputation_core::{
    Criticality, DataQualityAssessment, FinancialDataBundle, GapAnalysis, StatementKind, Strategy,
};

use crate::requirements::requirements_for;

/// Compares a bundle against a strategy's requirement schema and scores the
/// quality of whatever data is locally present.
#[derive(Debug, Clone, Default)]
pub struct DataGapAnalyzer {
    query_generator: QueryGenerator,
}

impl DataGapAnalyzer {
    pub fn new() -> Self {
        Self {
            query_generator: QueryGenerator::new(),
        }
    }

    /// Report every required field the bundle cannot satisfy, with the search
    /// priority and downstream impact of each gap.
    ///
    /// A field is satisfied when any of its source or fallback keys carries
    /// data. Pure inspection: repeated calls on the same bundle yield the
    /// same report.
    pub fn analyze(
        &self,
        ticker: &str,
        bundle: &FinancialDataBundle,
        strategy: Strategy,
    ) -> GapAnalysis {
        let mut analysis = GapAnalysis::new(strategy, ticker);

        for req in requirements_for(strategy) {
            if bundle.any_available(req.sources) || bundle.any_available(req.fallbacks) {
                continue;
            }

            let field = req.field_name.to_string();
            let priority = self.query_generator.priority(req.field_name, strategy)
                + req.criticality.priority_bias();
            analysis.search_priority.insert(field.clone(), priority);
            analysis
                .impact_assessment
                .insert(field.clone(), req.impact.to_string());

            match req.criticality {
                Criticality::Critical => analysis.critical_missing.push(field),
                Criticality::Important => analysis.important_missing.push(field),
                Criticality::Optional => analysis.optional_missing.push(field),
            }
        }

        debug!(
            ticker,
            strategy = strategy.as_str(),
            critical = analysis.critical_missing.len(),
            important = analysis.important_missing.len(),
            optional = analysis.optional_missing.len(),
            "gap analysis complete"
        );

        analysis
    }

    /// Score the locally available data: completeness against the schema with
    /// per-tier penalties, and reliability blending source trust, statement
    /// freshness, and cross-statement consistency.
    pub fn assess_quality(
        &self,
        bundle: &FinancialDataBundle,
        gaps: &GapAnalysis,
    ) -> DataQualityAssessment {
        let requirements = requirements_for(gaps.strategy);
        let required = requirements.len() as f64;
        let available = required - gaps.total_missing() as f64;

        let mut completeness = if required > 0.0 { available / required } else { 0.0 };
        completeness -= 0.15 * gaps.critical_missing.len() as f64;
        completeness -= 0.08 * gaps.important_missing.len() as f64;
        completeness -= 0.03 * gaps.optional_missing.len() as f64;
        let completeness = completeness.max(0.0);

        // Single upstream provider, so source trust is a constant midpoint.
        let source_score = 0.5;
        let reliability =
            0.7 * source_score + freshness_score(bundle) * 0.3 + consistency_score(bundle) * 0.2;

        let mut data_sources = HashMap::new();
        for kind in StatementKind::ALL {
            if !bundle.statement(kind).is_empty() {
                let section = match kind {
                    StatementKind::Financials => "financials",
                    StatementKind::BalanceSheet => "balance_sheet",
                    StatementKind::CashFlow => "cash_flow",
                };
                data_sources.insert(section.to_string(), "market_data_provider".to_string());
            }
        }
        if !bundle.info.is_empty() {
            data_sources.insert("info".to_string(), "market_data_provider".to_string());
        }

        // Everything below critical lands in the optional bucket.
        let mut missing_optional_fields = gaps.important_missing.clone();
        missing_optional_fields.extend(gaps.optional_missing.iter().cloned());

        DataQualityAssessment {
            completeness_score: completeness,
            reliability_score: reliability,
            missing_critical_fields: gaps.critical_missing.clone(),
            missing_optional_fields,
            data_sources,
        }
    }

    /// Top search queries for the missing fields, highest priority first,
    /// three queries per field.
    pub fn search_recommendations(
        &self,
        ticker: &str,
        gaps: &GapAnalysis,
    ) -> Vec<(String, Vec<String>)> {
        let mut fields: Vec<&String> = gaps.all_missing().collect();
        fields.sort_by_key(|f| std::cmp::Reverse(gaps.search_priority.get(*f).copied().unwrap_or(0)));

        fields
            .into_iter()
            .map(|field| {
                let mut queries = self.query_generator.generate(ticker, field, gaps.strategy);
                queries.truncate(3);
                (field.clone(), queries)
            })
            .collect()
    }
}

/// Age bucket of the newest statement period across all statements.
/// No dated statements at all scores the midpoint.
fn freshness_score(bundle: &FinancialDataBundle) -> f64 {
    let current_year = Utc::now().year();
    let mut best: Option<f64> = None;

    for kind in StatementKind::ALL {
        if let Some(latest) = bundle.statement(kind).latest_period() {
            let age = current_year - latest.year();
            let score = match age {
                0 => 1.0,
                1 => 0.8,
                2 => 0.6,
                _ => 0.3,
            };
            best = Some(best.map_or(score, |b: f64| b.max(score)));
        }
    }

    best.unwrap_or(0.5)
}

/// More populated statements means more opportunities for cross-checking.
fn consistency_score(bundle: &FinancialDataBundle) -> f64 {
    match bundle.populated_statements() {
        3 => 0.9,
        2 => 0.8,
        _ => 0.6,
    }
}
