//! Static required-field schemas, one per strategy.
//!
//! Source keys name the statement rows or quoted-metric scalars the fetch
//! layer would populate; fallbacks are secondary keys a field can be derived
//! from. Ordering within a tier is the report ordering.

use imputation_core::{Criticality, FieldRequirement, Strategy};

const PHIL_TOWN: &[FieldRequirement] = &[
    FieldRequirement {
        field_name: "ebit",
        sources: &["Operating Income", "EBIT"],
        fallbacks: &["Net Income", "Interest Expense", "Tax Provision"],
        description: "Earnings before interest and taxes",
        impact: "Cannot calculate ROIC without EBIT or components",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "total_stockholder_equity",
        sources: &[
            "Stockholders Equity",
            "Common Stock Equity",
            "Total Equity Gross Minority Interest",
        ],
        fallbacks: &[],
        description: "Total shareholder equity",
        impact: "Required for ROIC invested capital calculation",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "diluted_eps",
        sources: &["Diluted EPS", "Basic EPS"],
        fallbacks: &["Net Income", "Diluted Average Shares"],
        description: "Earnings per share",
        impact: "Required for EPS growth and margin of safety",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "total_revenue",
        sources: &["Total Revenue", "Revenue", "Sales"],
        fallbacks: &[],
        description: "Total company revenue",
        impact: "Required for sales growth calculation",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "long_term_debt",
        sources: &["Long Term Debt", "Total Debt"],
        fallbacks: &["Current Debt"],
        description: "Long-term debt obligations",
        impact: "Affects ROIC and debt payoff calculations",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "operating_cash_flow",
        sources: &["Operating Cash Flow", "Cash Flow From Operations"],
        fallbacks: &[],
        description: "Operating cash flow",
        impact: "Required for FCF growth calculation",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "capital_expenditure",
        sources: &["Capital Expenditure", "CapEx"],
        fallbacks: &[],
        description: "Capital expenditures",
        impact: "Required for free cash flow calculation",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "insider_ownership",
        sources: &["heldPercentInsiders"],
        fallbacks: &[],
        description: "Insider ownership percentage",
        impact: "Management quality indicator",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "dividend_yield",
        sources: &["dividendYield"],
        fallbacks: &[],
        description: "Dividend yield",
        impact: "Additional return component",
        criticality: Criticality::Optional,
    },
];

const HIGH_GROWTH: &[FieldRequirement] = &[
    FieldRequirement {
        field_name: "total_revenue",
        sources: &["Total Revenue", "Revenue", "Sales"],
        fallbacks: &[],
        description: "Total company revenue",
        impact: "Required for sales growth analysis",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "net_income",
        sources: &[
            "Net Income",
            "Net Income Common Stockholders",
            "Net Income Continuous Operations",
        ],
        fallbacks: &[],
        description: "Net income",
        impact: "Required for net margin calculation",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "total_stockholder_equity",
        sources: &[
            "Stockholders Equity",
            "Common Stock Equity",
            "Total Equity Gross Minority Interest",
        ],
        fallbacks: &[],
        description: "Total shareholder equity",
        impact: "Required for ROE calculation",
        criticality: Criticality::Critical,
    },
    FieldRequirement {
        field_name: "ebitda",
        sources: &["EBITDA", "Normalized EBITDA", "ebitda"],
        fallbacks: &[],
        description: "EBITDA",
        impact: "Required for EV/EBITDA and debt ratios",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "total_debt",
        sources: &["Total Debt", "Long Term Debt"],
        fallbacks: &[],
        description: "Total debt",
        impact: "Required for debt-to-EBITDA calculation",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "cash_and_cash_equivalents",
        sources: &["Cash And Cash Equivalents", "Cash"],
        fallbacks: &[],
        description: "Cash and equivalents",
        impact: "Required for net debt calculation",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "market_cap",
        sources: &["marketCap"],
        fallbacks: &[],
        description: "Market capitalization",
        impact: "Required for valuation ratios",
        criticality: Criticality::Important,
    },
    FieldRequirement {
        field_name: "shares_outstanding",
        sources: &["sharesOutstanding"],
        fallbacks: &[],
        description: "Shares outstanding",
        impact: "Used for per-share calculations",
        criticality: Criticality::Optional,
    },
    FieldRequirement {
        field_name: "insider_ownership",
        sources: &["heldPercentInsiders"],
        fallbacks: &[],
        description: "Insider ownership percentage",
        impact: "Management alignment indicator",
        criticality: Criticality::Optional,
    },
];

/// The full requirement schema of a strategy, critical tier first.
pub fn requirements_for(strategy: Strategy) -> &'static [FieldRequirement] {
    match strategy {
        Strategy::PhilTown => PHIL_TOWN,
        Strategy::HighGrowth => HIGH_GROWTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_requirement_has_impact_text() {
        for strategy in [Strategy::PhilTown, Strategy::HighGrowth] {
            for req in requirements_for(strategy) {
                assert!(!req.impact.is_empty(), "{} lacks impact", req.field_name);
                assert!(!req.sources.is_empty(), "{} lacks sources", req.field_name);
            }
        }
    }

    #[test]
    fn tiers_are_ordered_critical_first() {
        for strategy in [Strategy::PhilTown, Strategy::HighGrowth] {
            let reqs = requirements_for(strategy);
            let first_important = reqs
                .iter()
                .position(|r| r.criticality == Criticality::Important);
            let first_optional = reqs
                .iter()
                .position(|r| r.criticality == Criticality::Optional);
            if let (Some(i), Some(o)) = (first_important, first_optional) {
                assert!(i < o);
            }
        }
    }
}
