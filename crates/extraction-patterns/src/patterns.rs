//! Regex extraction of financial metrics from free text.
//!
//! Each metric family keeps an ordered list of phrasings a value may appear
//! under. Patterns capture the numeral in group 1 and an optional unit
//! (percent sign or magnitude letter) in group 2; the raw match reported to
//! callers is the numeral alone.

use crate::normalize_value;
use imputation_core::MetricKind;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Characters of surrounding text inspected on each side of a match.
const CONTEXT_WINDOW: usize = 100;

const POSITIVE_CONTEXT: &[&str] = &[
    "financial",
    "earnings",
    "annual report",
    "sec filing",
    "income statement",
    "balance sheet",
    "cash flow",
    "investor relations",
    "quarterly",
    "fiscal year",
];

const NEGATIVE_CONTEXT: &[&str] = &[
    "target",
    "estimate",
    "projected",
    "expected",
    "forecast",
    "guidance",
    "outlook",
    "consensus",
];

struct MetricPattern {
    regex: Regex,
    /// Unambiguous label form (exact "ROIC:" / "ROE:"), worth a bonus.
    exact_label: bool,
}

fn pattern(src: &str) -> MetricPattern {
    MetricPattern {
        regex: Regex::new(&format!("(?i){src}")).expect("static metric pattern must compile"),
        exact_label: src.contains("ROIC:") || src.contains("ROE:"),
    }
}

static PATTERNS: LazyLock<HashMap<MetricKind, Vec<MetricPattern>>> = LazyLock::new(|| {
    let pct = |label: &str| format!(r"{label}[:\s]+(\d+\.?\d*)(%)?");
    let currency =
        |label: &str| format!(r"{label}[:\s]+\$?(\d+(?:,\d{{3}})*(?:\.\d+)?)([KMBT])?");
    let ratio = |label: &str| format!(r"{label}[:\s]+(\d+\.?\d*)");

    let mut table = HashMap::new();
    table.insert(
        MetricKind::Roic,
        vec![
            pattern(&pct("ROIC")),
            pattern(&pct(r"Return\s+on\s+Invested\s+Capital")),
            pattern(r"ROIC:\s*(\d+\.?\d*)(%)"),
            pattern(r"ROIC\s+of\s+(\d+\.?\d*)(%)"),
        ],
    );
    table.insert(
        MetricKind::Ebit,
        vec![
            pattern(&currency("EBIT")),
            pattern(&currency(r"Operating\s+Income")),
            pattern(&currency(r"Earnings\s+before\s+interest\s+and\s+taxes")),
        ],
    );
    table.insert(
        MetricKind::Debt,
        vec![
            pattern(&currency(r"Total\s+Debt")),
            pattern(&currency(r"Long[- ]Term\s+Debt")),
            pattern(&currency(r"Net\s+Debt")),
        ],
    );
    table.insert(
        MetricKind::EpsGrowth,
        vec![
            pattern(&pct(r"EPS\s+Growth")),
            pattern(&pct(r"Earnings\s+per\s+share\s+growth")),
            pattern(&pct(r"EPS\s+CAGR")),
            pattern(&pct(r"Diluted\s+EPS\s+growth")),
        ],
    );
    table.insert(
        MetricKind::SalesGrowth,
        vec![
            pattern(&pct(r"Revenue\s+Growth")),
            pattern(&pct(r"Sales\s+Growth")),
            pattern(&pct(r"Revenue\s+CAGR")),
            pattern(&pct(r"Top[- ]line\s+growth")),
        ],
    );
    table.insert(
        MetricKind::NetMargin,
        vec![
            pattern(&pct(r"Net\s+Margin")),
            pattern(&pct(r"Net\s+Profit\s+Margin")),
            pattern(&pct(r"Profit\s+margin")),
        ],
    );
    table.insert(
        MetricKind::PeRatio,
        vec![
            pattern(&ratio(r"P/E\s+Ratio")),
            pattern(&ratio("PE")),
            pattern(&ratio(r"Price[- ]to[- ]Earnings")),
            pattern(&ratio(r"Trailing\s+P/E")),
            pattern(&ratio(r"Forward\s+P/E")),
        ],
    );
    table.insert(
        MetricKind::PsRatio,
        vec![
            pattern(&ratio(r"P/S\s+Ratio")),
            pattern(&ratio("PSR")),
            pattern(&ratio(r"Price[- ]to[- ]Sales")),
            pattern(&ratio(r"Price/Sales")),
        ],
    );
    table.insert(
        MetricKind::Roe,
        vec![
            pattern(&pct("ROE")),
            pattern(&pct(r"Return\s+on\s+Equity")),
            pattern(r"ROE:\s*(\d+\.?\d*)(%)?"),
        ],
    );
    table.insert(
        MetricKind::InsiderOwnership,
        vec![
            pattern(&pct(r"Insider\s+Ownership")),
            pattern(&pct(r"Insiders\s+Own")),
            pattern(&pct(r"Management\s+Ownership")),
        ],
    );
    table.insert(
        MetricKind::DividendYield,
        vec![
            pattern(&pct(r"Dividend\s+Yield")),
            pattern(&pct(r"Annual\s+Yield")),
            pattern(&pct("Yield")),
        ],
    );
    table.insert(
        MetricKind::MarketCap,
        vec![
            pattern(&currency(r"Market\s+Cap")),
            pattern(&currency(r"Market\s+Capitalization")),
            pattern(&currency(r"Mkt\s+Cap")),
        ],
    );
    table
});

/// One extracted candidate value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCandidate {
    /// Value in base currency units (percentages already scaled by 1/100).
    pub value: f64,
    /// The numeral as it appeared in the text.
    pub raw: String,
    /// Extraction confidence, 10-100.
    pub confidence: u8,
}

/// Extract all candidate values for a metric from free text.
///
/// Candidates are deduplicated on exact (value, raw, confidence) equality
/// and returned sorted by confidence descending.
pub fn extract_metric(content: &str, metric: MetricKind) -> Vec<ExtractedCandidate> {
    let Some(patterns) = PATTERNS.get(&metric) else {
        return Vec::new();
    };

    let mut seen: HashSet<(u64, String, u8)> = HashSet::new();
    let mut candidates = Vec::new();

    for p in patterns {
        for caps in p.regex.captures_iter(content) {
            let Some(numeral) = caps.get(1) else { continue };
            let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let Some(value) = normalize_value(&format!("{}{}", numeral.as_str(), unit)) else {
                continue;
            };

            let whole = caps.get(0).expect("match always has a group 0");
            let window = context_window(content, whole.start(), whole.end());
            let confidence = extraction_confidence(p.exact_label, window);

            let raw = numeral.as_str().to_string();
            if seen.insert((value.to_bits(), raw.clone(), confidence)) {
                candidates.push(ExtractedCandidate {
                    value,
                    raw,
                    confidence,
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    candidates
}

fn extraction_confidence(exact_label: bool, window: &str) -> u8 {
    let mut confidence: i32 = 50;
    if exact_label {
        confidence += 20;
    }

    let window = window.to_lowercase();
    if POSITIVE_CONTEXT.iter().any(|w| window.contains(w)) {
        confidence += 10;
    }
    if NEGATIVE_CONTEXT.iter().any(|w| window.contains(w)) {
        confidence -= 15;
    }

    confidence.clamp(10, 100) as u8
}

fn context_window(content: &str, start: usize, end: usize) -> &str {
    let mut lo = start.saturating_sub(CONTEXT_WINDOW);
    while lo > 0 && !content.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + CONTEXT_WINDOW).min(content.len());
    while hi < content.len() && !content.is_char_boundary(hi) {
        hi += 1;
    }
    &content[lo..hi]
}
