//! Pure metric formulas over dated statement series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use imputation_core::config::{DEFAULT_TAX_RATE, HISTORY_YEARS, TREND_YEARS};
use imputation_core::{FinancialDataBundle, ImputationError, StatementKind, StatementTable};

/// Line-item aliases, tried in order.
const EBIT_ROWS: &[&str] = &["EBIT", "Operating Income"];
const NET_INCOME_ROWS: &[&str] = &[
    "Net Income",
    "Net Income Common Stockholders",
    "Net Income Continuous Operations",
];
const EQUITY_ROWS: &[&str] = &[
    "Stockholders Equity",
    "Common Stock Equity",
    "Total Equity Gross Minority Interest",
];
const REVENUE_ROWS: &[&str] = &["Total Revenue", "Revenue", "Sales"];
const OCF_ROWS: &[&str] = &["Operating Cash Flow", "Cash Flow From Operations"];
const CAPEX_ROWS: &[&str] = &["Capital Expenditure", "CapEx"];

/// Sticker-price projection parameters.
const YEARS_TO_PROJECT: i32 = 10;
const MIN_ACCEPTABLE_RETURN: f64 = 0.15;
const GROWTH_RATE_CAP: f64 = 0.15;
const FUTURE_PE_CAP: f64 = 30.0;
const DEFAULT_FUTURE_PE: f64 = 15.0;

/// Direction of a margin series over the trend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Expanding,
    Contracting,
    Stable,
}

/// Compound annual growth rate over a dated series.
///
/// The series may arrive in either order; it is sorted oldest-first before
/// computing. Growth is undefined across a zero or sign-changing span, so
/// those are rejected rather than producing a misleading number.
pub fn calculate_cagr(series: &[(NaiveDate, f64)]) -> Result<f64, ImputationError> {
    if series.len() < 2 {
        return Err(ImputationError::InsufficientData(format!(
            "CAGR needs at least 2 data points, got {}",
            series.len()
        )));
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|(date, _)| *date);

    let (_, start) = sorted[0];
    let (_, end) = sorted[sorted.len() - 1];
    if start == 0.0 || start * end < 0.0 {
        return Err(ImputationError::CalculationError(
            "growth is undefined across a zero or sign-changing span".to_string(),
        ));
    }

    let periods = (sorted.len() - 1) as f64;
    Ok((end / start).powf(1.0 / periods) - 1.0)
}

/// Average ROIC over up to `HISTORY_YEARS` fiscal periods, plus the
/// per-period series (newest first).
///
/// NOPAT is EBIT taxed at the period's effective rate when plausible, the
/// statutory default otherwise. Invested capital is equity plus long-term
/// debt, falling back to total minus current debt.
pub fn calculate_roic(
    bundle: &FinancialDataBundle,
) -> Result<(f64, Vec<(NaiveDate, f64)>), ImputationError> {
    let financials = bundle.statement(StatementKind::Financials);
    let balance = bundle.statement(StatementKind::BalanceSheet);

    let mut series = Vec::new();
    for date in financials.periods().iter().take(HISTORY_YEARS) {
        let Some(ebit) = ebit_for_period(financials, *date) else {
            continue;
        };
        let Some(capital) = invested_capital(balance, *date) else {
            continue;
        };
        if capital <= 0.0 {
            continue;
        }

        let nopat = ebit * (1.0 - effective_tax_rate(financials, *date));
        series.push((*date, nopat / capital));
    }

    if series.is_empty() {
        return Err(ImputationError::InsufficientData(
            "no fiscal period has both EBIT and invested capital".to_string(),
        ));
    }

    let average = series.iter().map(|(_, v)| v).sum::<f64>() / series.len() as f64;
    Ok((average, series))
}

fn ebit_for_period(financials: &StatementTable, date: NaiveDate) -> Option<f64> {
    if let Some(ebit) = row_value(financials, EBIT_ROWS, date) {
        return Some(ebit);
    }
    // Rebuild from components: NI + interest + tax.
    let net_income = row_value(financials, NET_INCOME_ROWS, date)?;
    let interest = row_value(financials, &["Interest Expense"], date).unwrap_or(0.0);
    let tax = row_value(financials, &["Tax Provision"], date).unwrap_or(0.0);
    Some(net_income + interest + tax)
}

fn effective_tax_rate(financials: &StatementTable, date: NaiveDate) -> f64 {
    let rate = row_value(financials, &["Tax Provision"], date)
        .zip(row_value(financials, &["Pretax Income"], date))
        .and_then(|(tax, pretax)| (pretax != 0.0).then(|| tax / pretax));

    match rate {
        Some(r) if (0.0..=0.6).contains(&r) => r,
        _ => DEFAULT_TAX_RATE,
    }
}

fn invested_capital(balance: &StatementTable, date: NaiveDate) -> Option<f64> {
    let equity = row_value(balance, EQUITY_ROWS, date)?;
    let long_term_debt = row_value(balance, &["Long Term Debt"], date).or_else(|| {
        let total = row_value(balance, &["Total Debt"], date)?;
        let current = row_value(balance, &["Current Debt"], date).unwrap_or(0.0);
        Some(total - current)
    });
    Some(equity + long_term_debt.unwrap_or(0.0))
}

/// Sticker-price valuation: project EPS forward, discount back at the
/// minimum acceptable return, and demand a 50% discount to that price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginOfSafety {
    pub current_eps: f64,
    pub projected_growth_rate: f64,
    pub future_eps: f64,
    pub future_pe: f64,
    pub sticker_price: f64,
    pub mos_price: f64,
    pub current_price: Option<f64>,
}

/// Margin-of-safety price from trailing EPS, taking the more conservative
/// of the historical EPS CAGR and the analyst growth estimate.
///
/// The projection only makes sense off positive earnings, so a missing or
/// negative trailing EPS is an error rather than a zero sticker price.
pub fn margin_of_safety(
    bundle: &FinancialDataBundle,
    eps_cagr: Option<f64>,
) -> Result<MarginOfSafety, ImputationError> {
    let current_eps = bundle
        .scalar("trailingEps")
        .filter(|eps| *eps > 0.0)
        .ok_or_else(|| {
            ImputationError::InsufficientData(
                "projection needs a positive trailing EPS".to_string(),
            )
        })?;

    let growth = [eps_cagr, bundle.scalar("earningsGrowth")]
        .into_iter()
        .flatten()
        .fold(None::<f64>, |lowest, g| {
            Some(lowest.map_or(g, |l| l.min(g)))
        })
        .ok_or_else(|| {
            ImputationError::InsufficientData("no usable growth rate".to_string())
        })?
        .clamp(0.0, GROWTH_RATE_CAP);

    let future_eps = current_eps * (1.0 + growth).powi(YEARS_TO_PROJECT);

    // Rule-of-thumb P/E is twice the growth rate in percent, never paying
    // more than the market does today.
    let mut future_pe = 2.0 * growth * 100.0;
    if let Some(trailing) = bundle.scalar("trailingPE").filter(|pe| *pe > 0.0) {
        future_pe = future_pe.min(trailing);
    }
    let future_pe = if future_pe > 0.0 {
        future_pe.min(FUTURE_PE_CAP)
    } else {
        bundle
            .scalar("forwardPE")
            .filter(|pe| *pe > 0.0)
            .unwrap_or(DEFAULT_FUTURE_PE)
    };

    let sticker_price =
        future_eps * future_pe / (1.0 + MIN_ACCEPTABLE_RETURN).powi(YEARS_TO_PROJECT);
    let mos_price = sticker_price * 0.5;

    let current_price = ["regularMarketPrice", "currentPrice", "previousClose"]
        .iter()
        .find_map(|key| bundle.scalar(key));

    Ok(MarginOfSafety {
        current_eps,
        projected_growth_rate: growth,
        future_eps,
        future_pe,
        sticker_price,
        mos_price,
        current_price,
    })
}

/// Net margin of the most recent period and the trend over up to
/// `TREND_YEARS` most recent periods, judged earliest vs latest.
pub fn net_margin_trend(
    bundle: &FinancialDataBundle,
) -> Result<(f64, TrendDirection), ImputationError> {
    let financials = bundle.statement(StatementKind::Financials);

    let mut margins: Vec<(NaiveDate, f64)> = Vec::new();
    for date in financials.periods().iter().take(TREND_YEARS) {
        let income = row_value(financials, NET_INCOME_ROWS, *date);
        let revenue = row_value(financials, REVENUE_ROWS, *date);
        if let (Some(income), Some(revenue)) = (income, revenue) {
            if revenue != 0.0 {
                margins.push((*date, income / revenue));
            }
        }
    }

    let latest = margins
        .first()
        .map(|(_, m)| *m)
        .ok_or_else(|| {
            ImputationError::InsufficientData("no period has both net income and revenue".to_string())
        })?;
    let earliest = margins[margins.len() - 1].1;

    let direction = if latest > earliest {
        TrendDirection::Expanding
    } else if latest < earliest {
        TrendDirection::Contracting
    } else {
        TrendDirection::Stable
    };
    Ok((latest, direction))
}

/// Free cash flow per period (operating cash flow plus capital expenditure,
/// which statements report as a negative outflow), newest first.
pub fn free_cash_flow_series(bundle: &FinancialDataBundle) -> Vec<(NaiveDate, f64)> {
    let cash_flow = bundle.statement(StatementKind::CashFlow);
    cash_flow
        .periods()
        .iter()
        .take(HISTORY_YEARS)
        .filter_map(|date| {
            let ocf = row_value(cash_flow, OCF_ROWS, *date)?;
            let capex = row_value(cash_flow, CAPEX_ROWS, *date).unwrap_or(0.0);
            Some((*date, ocf + capex))
        })
        .collect()
}

/// Book value per share across periods, against current share count.
pub fn bvps_series(bundle: &FinancialDataBundle) -> Vec<(NaiveDate, f64)> {
    let Some(shares) = bundle.scalar("sharesOutstanding").filter(|s| *s > 0.0) else {
        return Vec::new();
    };
    bundle
        .statement(StatementKind::BalanceSheet)
        .periods()
        .iter()
        .take(HISTORY_YEARS)
        .filter_map(|date| {
            row_value(bundle.statement(StatementKind::BalanceSheet), EQUITY_ROWS, *date)
                .map(|equity| (*date, equity / shares))
        })
        .collect()
}

/// Years to retire long-term debt from the latest free cash flow.
pub fn debt_payoff_years(bundle: &FinancialDataBundle) -> Result<f64, ImputationError> {
    let balance = bundle.statement(StatementKind::BalanceSheet);
    let debt = balance
        .latest("Long Term Debt")
        .or_else(|| balance.latest("Total Debt"))
        .ok_or_else(|| {
            ImputationError::InsufficientData("no debt figure on the balance sheet".to_string())
        })?;

    let fcf = free_cash_flow_series(bundle)
        .first()
        .map(|(_, v)| *v)
        .ok_or_else(|| {
            ImputationError::InsufficientData("no free cash flow available".to_string())
        })?;
    if fcf <= 0.0 {
        return Err(ImputationError::CalculationError(
            "free cash flow is not positive".to_string(),
        ));
    }
    Ok(debt / fcf)
}

/// Dated series for the first matching row alias, newest first.
pub fn aliased_series(
    table: &StatementTable,
    aliases: &[&str],
) -> Option<Vec<(NaiveDate, f64)>> {
    aliases.iter().find_map(|alias| table.series(alias))
}

/// Revenue series for growth calculations.
pub fn revenue_series(bundle: &FinancialDataBundle) -> Option<Vec<(NaiveDate, f64)>> {
    aliased_series(bundle.statement(StatementKind::Financials), REVENUE_ROWS)
}

/// Diluted (or basic) EPS series for growth calculations.
pub fn eps_series(bundle: &FinancialDataBundle) -> Option<Vec<(NaiveDate, f64)>> {
    aliased_series(
        bundle.statement(StatementKind::Financials),
        &["Diluted EPS", "Basic EPS"],
    )
}

fn row_value(table: &StatementTable, aliases: &[&str], date: NaiveDate) -> Option<f64> {
    for alias in aliases {
        if let Some(series) = table.series(alias) {
            if let Some((_, value)) = series.iter().find(|(d, _)| *d == date) {
                return Some(*value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    #[test]
    fn cagr_rejects_short_series() {
        let err = calculate_cagr(&[(date(2024), 100.0)]).unwrap_err();
        assert!(matches!(err, ImputationError::InsufficientData(_)));
    }

    #[test]
    fn cagr_rejects_zero_start_and_sign_cross() {
        assert!(calculate_cagr(&[(date(2020), 0.0), (date(2024), 50.0)]).is_err());
        assert!(calculate_cagr(&[(date(2020), -10.0), (date(2024), 50.0)]).is_err());
    }

    #[test]
    fn cagr_handles_any_input_order() {
        // 100 -> 121 over two periods is 10% per period.
        let newest_first = [(date(2024), 121.0), (date(2023), 110.0), (date(2022), 100.0)];
        let cagr = calculate_cagr(&newest_first).unwrap();
        assert!((cagr - 0.1).abs() < 1e-9);

        let mut oldest_first = newest_first;
        oldest_first.reverse();
        assert_eq!(calculate_cagr(&oldest_first).unwrap(), cagr);
    }

    fn roic_bundle(effective_rate_plausible: bool) -> FinancialDataBundle {
        let mut bundle = FinancialDataBundle::default();

        let mut financials = StatementTable::new(vec![date(2024)]);
        financials.insert_row("Operating Income", vec![Some(100.0)]);
        financials.insert_row("Pretax Income", vec![Some(100.0)]);
        let tax = if effective_rate_plausible { 25.0 } else { 80.0 };
        financials.insert_row("Tax Provision", vec![Some(tax)]);
        bundle.financials = financials;

        let mut balance = StatementTable::new(vec![date(2024)]);
        balance.insert_row("Stockholders Equity", vec![Some(400.0)]);
        balance.insert_row("Long Term Debt", vec![Some(100.0)]);
        bundle.balance_sheet = balance;

        bundle
    }

    #[test]
    fn roic_uses_effective_tax_rate_when_plausible() {
        let (roic, series) = calculate_roic(&roic_bundle(true)).unwrap();
        // NOPAT = 100 * (1 - 0.25) = 75; capital = 500.
        assert!((roic - 0.15).abs() < 1e-9);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn roic_falls_back_to_default_tax_rate() {
        // Effective rate of 0.8 is implausible, so the 21% default applies:
        // NOPAT = 79, capital = 500.
        let (roic, _) = calculate_roic(&roic_bundle(false)).unwrap();
        assert!((roic - 0.158).abs() < 1e-9);
    }

    #[test]
    fn roic_rebuilds_ebit_from_components() {
        let mut bundle = roic_bundle(true);
        let mut financials = StatementTable::new(vec![date(2024)]);
        financials.insert_row("Net Income", vec![Some(60.0)]);
        financials.insert_row("Interest Expense", vec![Some(15.0)]);
        financials.insert_row("Tax Provision", vec![Some(25.0)]);
        financials.insert_row("Pretax Income", vec![Some(100.0)]);
        bundle.financials = financials;

        let (roic, _) = calculate_roic(&bundle).unwrap();
        // EBIT = 60 + 15 + 25 = 100, same as the direct-row case.
        assert!((roic - 0.15).abs() < 1e-9);
    }

    #[test]
    fn roic_without_statements_is_insufficient() {
        let err = calculate_roic(&FinancialDataBundle::default()).unwrap_err();
        assert!(matches!(err, ImputationError::InsufficientData(_)));
    }

    #[test]
    fn margin_of_safety_projection() {
        let mut bundle = FinancialDataBundle::default();
        bundle.info.insert("trailingEps".to_string(), 5.0);
        bundle.info.insert("earningsGrowth".to_string(), 0.10);
        bundle.info.insert("trailingPE".to_string(), 25.0);
        bundle.info.insert("regularMarketPrice".to_string(), 30.0);

        let mos = margin_of_safety(&bundle, None).unwrap();

        assert!((mos.projected_growth_rate - 0.10).abs() < 1e-9);
        // P/E from growth (2 x 10) beats the trailing 25.
        assert!((mos.future_pe - 20.0).abs() < 1e-9);
        let expected_sticker = 5.0 * 1.1f64.powi(10) * 20.0 / 1.15f64.powi(10);
        assert!((mos.sticker_price - expected_sticker).abs() < 1e-9);
        assert!((mos.mos_price - expected_sticker * 0.5).abs() < 1e-9);
        assert_eq!(mos.current_price, Some(30.0));
    }

    #[test]
    fn margin_of_safety_takes_conservative_growth_and_caps_it() {
        let mut bundle = FinancialDataBundle::default();
        bundle.info.insert("trailingEps".to_string(), 5.0);
        bundle.info.insert("earningsGrowth".to_string(), 0.30);

        // Analyst growth alone is capped at 15%, which also caps the P/E.
        let capped = margin_of_safety(&bundle, None).unwrap();
        assert!((capped.projected_growth_rate - 0.15).abs() < 1e-9);
        assert!((capped.future_pe - 30.0).abs() < 1e-9);

        // A lower historical CAGR wins over the analyst figure.
        let historical = margin_of_safety(&bundle, Some(0.05)).unwrap();
        assert!((historical.projected_growth_rate - 0.05).abs() < 1e-9);
    }

    #[test]
    fn margin_of_safety_requires_positive_eps() {
        let mut bundle = FinancialDataBundle::default();
        bundle.info.insert("trailingEps".to_string(), -1.2);
        bundle.info.insert("earningsGrowth".to_string(), 0.10);

        assert!(matches!(
            margin_of_safety(&bundle, None).unwrap_err(),
            ImputationError::InsufficientData(_)
        ));
    }

    #[test]
    fn margin_of_safety_falls_back_to_forward_pe_when_growth_is_zero() {
        let mut bundle = FinancialDataBundle::default();
        bundle.info.insert("trailingEps".to_string(), 5.0);
        bundle.info.insert("earningsGrowth".to_string(), -0.05);
        bundle.info.insert("forwardPE".to_string(), 18.0);

        let mos = margin_of_safety(&bundle, None).unwrap();

        // Negative growth floors at zero, so EPS stays flat and the
        // growth-derived P/E is unusable.
        assert!((mos.future_eps - 5.0).abs() < 1e-9);
        assert!((mos.future_pe - 18.0).abs() < 1e-9);
    }

    fn margin_bundle(values: &[(f64, f64)]) -> FinancialDataBundle {
        // values newest first as (net income, revenue).
        let periods: Vec<NaiveDate> = (0..values.len()).map(|i| date(2024 - i as i32)).collect();
        let mut financials = StatementTable::new(periods);
        financials.insert_row(
            "Net Income",
            values.iter().map(|(ni, _)| Some(*ni)).collect(),
        );
        financials.insert_row(
            "Total Revenue",
            values.iter().map(|(_, rev)| Some(*rev)).collect(),
        );
        let mut bundle = FinancialDataBundle::default();
        bundle.financials = financials;
        bundle
    }

    #[test]
    fn margin_trend_classification() {
        // 10% five years ago up to 20% now.
        let expanding = margin_bundle(&[(20.0, 100.0), (15.0, 100.0), (10.0, 100.0)]);
        let (latest, direction) = net_margin_trend(&expanding).unwrap();
        assert!((latest - 0.2).abs() < 1e-9);
        assert_eq!(direction, TrendDirection::Expanding);

        let contracting = margin_bundle(&[(10.0, 100.0), (20.0, 100.0)]);
        assert_eq!(net_margin_trend(&contracting).unwrap().1, TrendDirection::Contracting);

        let stable = margin_bundle(&[(10.0, 100.0), (10.0, 100.0)]);
        assert_eq!(net_margin_trend(&stable).unwrap().1, TrendDirection::Stable);
    }

    #[test]
    fn debt_payoff_needs_positive_fcf() {
        let mut bundle = FinancialDataBundle::default();
        let mut balance = StatementTable::new(vec![date(2024)]);
        balance.insert_row("Long Term Debt", vec![Some(300.0)]);
        bundle.balance_sheet = balance;

        let mut cash_flow = StatementTable::new(vec![date(2024)]);
        cash_flow.insert_row("Operating Cash Flow", vec![Some(120.0)]);
        cash_flow.insert_row("Capital Expenditure", vec![Some(-20.0)]);
        bundle.cash_flow = cash_flow;

        assert!((debt_payoff_years(&bundle).unwrap() - 3.0).abs() < 1e-9);

        // Burn cash and the metric becomes undefined.
        let mut burning = StatementTable::new(vec![date(2024)]);
        burning.insert_row("Operating Cash Flow", vec![Some(10.0)]);
        burning.insert_row("Capital Expenditure", vec![Some(-50.0)]);
        bundle.cash_flow = burning;
        assert!(matches!(
            debt_payoff_years(&bundle).unwrap_err(),
            ImputationError::CalculationError(_)
        ));
    }
}
