//! Search-query generation for missing financial fields.
//!
//! Templates are biased toward SEC filings, named financial sites, and
//! analyst language; fields without a template get generic queries
//! synthesized from the field name. Three universal fallbacks are always
//! appended.

use imputation_core::config::DEFAULT_QUERY_PRIORITY;
use imputation_core::Strategy;

fn templates(strategy: Strategy, field: &str) -> Option<&'static [&'static str]> {
    let list: &'static [&'static str] = match (strategy, field) {
        (Strategy::PhilTown, "roic") => &[
            "{ticker} return on invested capital ROIC",
            "{ticker} 10-K SEC filing ROIC operating income",
            "{ticker} NOPAT invested capital calculation",
            "site:sec.gov {ticker} annual report ROIC",
            "{ticker} financial metrics ROIC analysis",
        ],
        (Strategy::PhilTown, "eps_growth") => &[
            "{ticker} earnings per share growth rate historical",
            "{ticker} EPS CAGR 5 year 10 year analysis",
            "site:finance.yahoo.com {ticker} earnings growth",
            "{ticker} analyst EPS growth estimates",
            "{ticker} diluted EPS historical trend",
        ],
        (Strategy::PhilTown, "sales_growth") => &[
            "{ticker} revenue growth CAGR historical",
            "{ticker} sales growth rate annual quarterly",
            "{ticker} top line growth analysis",
            "site:morningstar.com {ticker} revenue trend",
        ],
        (Strategy::PhilTown, "debt_payoff") => &[
            "{ticker} long term debt free cash flow ratio",
            "{ticker} balance sheet debt cash flow statement",
            "{ticker} debt payoff capability years FCF",
            "site:morningstar.com {ticker} debt analysis",
        ],
        (Strategy::PhilTown, "insider_ownership") => &[
            "{ticker} insider ownership percentage management",
            "{ticker} insider trading ownership stake",
            "site:finviz.com {ticker} insider ownership",
            "{ticker} management ownership shares",
        ],
        (Strategy::PhilTown, "margin_of_safety") => &[
            "{ticker} intrinsic value sticker price calculation",
            "{ticker} margin of safety analysis",
            "{ticker} fair value vs market price",
            "{ticker} discounted cash flow valuation",
        ],
        (Strategy::HighGrowth, "net_margin_trend") => &[
            "{ticker} net profit margin trend 5 years",
            "{ticker} profitability margins expanding contracting",
            "{ticker} quarterly earnings margin analysis",
            "site:bloomberg.com {ticker} margin expansion",
        ],
        (Strategy::HighGrowth, "sales_growth") => &[
            "{ticker} revenue growth CAGR compound annual",
            "{ticker} sales growth rate quarterly annual",
            "{ticker} top line growth acceleration",
            "site:seekingalpha.com {ticker} revenue growth",
        ],
        (Strategy::HighGrowth, "roe") => &[
            "{ticker} return on equity ROE trend",
            "{ticker} ROE historical analysis",
            "{ticker} equity returns profitability",
            "site:morningstar.com {ticker} ROE metrics",
        ],
        (Strategy::HighGrowth, "debt_to_ebitda") => &[
            "{ticker} debt to EBITDA ratio",
            "{ticker} net debt EBITDA coverage",
            "{ticker} leverage ratio debt analysis",
            "{ticker} financial leverage metrics",
        ],
        (Strategy::HighGrowth, "psr_ratio") => &[
            "{ticker} price to sales ratio PSR",
            "{ticker} P/S ratio valuation metric",
            "{ticker} sales multiple valuation",
            "site:finviz.com {ticker} PSR ratio",
        ],
        (Strategy::HighGrowth, "dividend_yield") => &[
            "{ticker} dividend yield percentage annual",
            "{ticker} dividend payments yield analysis",
            "{ticker} dividend history yield trend",
            "site:dividend.com {ticker} yield",
        ],
        _ => return None,
    };
    Some(list)
}

fn static_priority(strategy: Strategy, field: &str) -> Option<i32> {
    let priority = match (strategy, field) {
        (Strategy::PhilTown, "roic") => 10,
        (Strategy::PhilTown, "eps_growth") => 9,
        (Strategy::PhilTown, "sales_growth") => 8,
        (Strategy::PhilTown, "margin_of_safety") => 8,
        (Strategy::PhilTown, "debt_payoff") => 7,
        (Strategy::PhilTown, "fcf_growth") => 7,
        (Strategy::PhilTown, "insider_ownership") => 6,
        (Strategy::PhilTown, "bvps_growth") => 6,
        (Strategy::HighGrowth, "sales_growth") => 10,
        (Strategy::HighGrowth, "net_margin_trend") => 9,
        (Strategy::HighGrowth, "roe") => 8,
        (Strategy::HighGrowth, "roic") => 8,
        (Strategy::HighGrowth, "debt_to_ebitda") => 7,
        (Strategy::HighGrowth, "psr_ratio") => 6,
        (Strategy::HighGrowth, "per_ratio") => 6,
        (Strategy::HighGrowth, "dividend_yield") => 5,
        _ => return None,
    };
    Some(priority)
}

/// Produces ranked search-query strings per (ticker, field, strategy).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGenerator;

impl QueryGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Ordered query strings for one field: strategy templates (or generic
    /// synthesis) followed by the universal fallbacks.
    pub fn generate(&self, ticker: &str, field: &str, strategy: Strategy) -> Vec<String> {
        let ticker = ticker.to_uppercase();

        let mut queries: Vec<String> = match templates(strategy, field) {
            Some(list) => list
                .iter()
                .map(|t| t.replace("{ticker}", &ticker))
                .collect(),
            None => Self::generic_queries(&ticker, field),
        };

        queries.push(format!("{ticker} {field} financial data"));
        queries.push(format!("{ticker} annual report {field}"));
        queries.push(format!("{ticker} 10-K {field} SEC filing"));

        queries
    }

    fn generic_queries(ticker: &str, field: &str) -> Vec<String> {
        let field_clean = field.replace('_', " ");
        vec![
            format!("{ticker} {field_clean} financial metric"),
            format!("{ticker} {field_clean} calculation"),
            format!("{ticker} {field_clean} annual report"),
            format!("{ticker} {field_clean} SEC filing"),
        ]
    }

    /// Search priority of a field within a strategy, 1-10. Tier bias is
    /// applied by the gap analyzer, not here.
    pub fn priority(&self, field: &str, strategy: Strategy) -> i32 {
        static_priority(strategy, field).unwrap_or(DEFAULT_QUERY_PRIORITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templated_field_gets_fallbacks_appended() {
        let generator = QueryGenerator::new();
        let queries = generator.generate("aapl", "roic", Strategy::PhilTown);

        assert_eq!(queries.len(), 8);
        assert!(queries[0].contains("AAPL"));
        assert_eq!(queries[5], "AAPL roic financial data");
        assert_eq!(queries[6], "AAPL annual report roic");
        assert_eq!(queries[7], "AAPL 10-K roic SEC filing");
    }

    #[test]
    fn unknown_field_synthesizes_generic_queries() {
        let generator = QueryGenerator::new();
        let queries = generator.generate("MSFT", "total_stockholder_equity", Strategy::PhilTown);

        assert_eq!(queries.len(), 7);
        assert_eq!(
            queries[0],
            "MSFT total stockholder equity financial metric"
        );
    }

    #[test]
    fn priority_defaults_to_five() {
        let generator = QueryGenerator::new();
        assert_eq!(generator.priority("roic", Strategy::PhilTown), 10);
        assert_eq!(generator.priority("sales_growth", Strategy::HighGrowth), 10);
        assert_eq!(generator.priority("ebit", Strategy::PhilTown), 5);
    }
}
