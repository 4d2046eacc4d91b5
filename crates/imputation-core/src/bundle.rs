//! Structured financial-statement snapshot consumed by the core.
//!
//! The fetch layer owns the raw data; the core treats the bundle as
//! read-only input and only ever produces derived copies. All shape
//! questions ("is this a scalar, a row, a dated series?") are answered here
//! through typed accessors so downstream code never branches on runtime
//! shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One financial statement: line-item rows across fiscal periods.
///
/// Periods are ordered newest first, matching how statement columns arrive
/// from upstream fetchers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementTable {
    /// Fiscal period end dates, newest first.
    periods: Vec<NaiveDate>,
    /// Line-item name -> one value per period (same order as `periods`).
    rows: HashMap<String, Vec<Option<f64>>>,
}

impl StatementTable {
    pub fn new(periods: Vec<NaiveDate>) -> Self {
        Self {
            periods,
            rows: HashMap::new(),
        }
    }

    /// Insert a row; values must be aligned with the table's periods.
    pub fn insert_row(&mut self, line_item: impl Into<String>, values: Vec<Option<f64>>) {
        self.rows.insert(line_item.into(), values);
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.rows.is_empty()
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Most recent fiscal period, if any.
    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.periods.first().copied()
    }

    /// Whether the row exists and carries at least one non-null value.
    pub fn has_data(&self, line_item: &str) -> bool {
        self.rows
            .get(line_item)
            .map(|vals| vals.iter().any(|v| v.is_some()))
            .unwrap_or(false)
    }

    /// Dated, non-null values for a line item, newest first.
    pub fn series(&self, line_item: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let vals = self.rows.get(line_item)?;
        let points: Vec<(NaiveDate, f64)> = self
            .periods
            .iter()
            .zip(vals.iter())
            .filter_map(|(date, v)| v.map(|v| (*date, v)))
            .collect();
        if points.is_empty() {
            None
        } else {
            Some(points)
        }
    }

    /// Value of a line item at the most recent period. Point-in-time: returns
    /// None if the newest period is null, even when older periods have data.
    pub fn latest(&self, line_item: &str) -> Option<f64> {
        self.rows.get(line_item).and_then(|vals| vals.first().copied().flatten())
    }
}

/// Which of the three statements a line item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Financials,
    BalanceSheet,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::Financials,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
    ];
}

/// Snapshot of everything the fetch layer knows about one ticker.
///
/// Any section may be empty; the core must tolerate all subsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialDataBundle {
    /// Scalar quoted metrics keyed by provider field name
    /// (e.g. `trailingPE`, `marketCap`, `heldPercentInsiders`).
    pub info: HashMap<String, f64>,
    pub financials: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow: StatementTable,
}

impl FinancialDataBundle {
    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.info.get(key).copied()
    }

    pub fn statement(&self, kind: StatementKind) -> &StatementTable {
        match kind {
            StatementKind::Financials => &self.financials,
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    /// A source key is available if it is present as a scalar or as a row
    /// with at least one non-null value in any statement.
    pub fn has_source(&self, key: &str) -> bool {
        if self.info.contains_key(key) {
            return true;
        }
        StatementKind::ALL
            .iter()
            .any(|kind| self.statement(*kind).has_data(key))
    }

    /// First available key from a list of candidates.
    pub fn any_available(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_source(k))
    }

    /// Number of non-empty statement tables (used for consistency scoring).
    pub fn populated_statements(&self) -> usize {
        StatementKind::ALL
            .iter()
            .filter(|kind| !self.statement(**kind).is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    #[test]
    fn series_skips_null_periods() {
        let mut table = StatementTable::new(vec![date(2024), date(2023), date(2022)]);
        table.insert_row("Total Revenue", vec![Some(120.0), None, Some(100.0)]);

        let series = table.series("Total Revenue").unwrap();
        assert_eq!(series, vec![(date(2024), 120.0), (date(2022), 100.0)]);
    }

    #[test]
    fn latest_is_point_in_time() {
        let mut table = StatementTable::new(vec![date(2024), date(2023)]);
        table.insert_row("Long Term Debt", vec![None, Some(50.0)]);

        // Newest period has no value, so latest is None even though 2023 does.
        assert_eq!(table.latest("Long Term Debt"), None);
        assert!(table.has_data("Long Term Debt"));
    }

    #[test]
    fn has_source_checks_scalars_and_statements() {
        let mut bundle = FinancialDataBundle::default();
        bundle.info.insert("trailingPE".to_string(), 22.5);

        let mut financials = StatementTable::new(vec![date(2024)]);
        financials.insert_row("Net Income", vec![Some(10.0)]);
        financials.insert_row("EBIT", vec![None]);
        bundle.financials = financials;

        assert!(bundle.has_source("trailingPE"));
        assert!(bundle.has_source("Net Income"));
        // Row exists but every period is null.
        assert!(!bundle.has_source("EBIT"));
        assert!(!bundle.has_source("marketCap"));
    }
}
