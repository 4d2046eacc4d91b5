//! Source Credibility Scorer
//!
//! Rates a (URL, content) pair for trustworthiness when extracting financial
//! data: domain reputation, content-quality heuristics, recency signals, and
//! presentation quality, blended into a [0, 1] score.

use chrono::{Datelike, Utc};
use imputation_core::SourceType;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Domain reputation table, highest first. Ordered so substring fallback
/// matching is deterministic.
const DOMAIN_RANKINGS: &[(&str, f64)] = &[
    // SEC and government sources
    ("sec.gov", 100.0),
    ("edgar.sec.gov", 100.0),
    ("treasury.gov", 95.0),
    ("federalreserve.gov", 95.0),
    // Major financial press
    ("bloomberg.com", 90.0),
    ("reuters.com", 88.0),
    ("wsj.com", 87.0),
    ("ft.com", 86.0),
    ("marketwatch.com", 85.0),
    // Established financial data sites
    ("morningstar.com", 85.0),
    ("finviz.com", 83.0),
    ("finance.yahoo.com", 82.0),
    ("yahoo.com", 80.0),
    ("google.com/finance", 80.0),
    ("investing.com", 78.0),
    // Investor-relations hosts
    ("investor.", 85.0),
    // Research and analysis
    ("seekingalpha.com", 75.0),
    ("zacks.com", 72.0),
    ("fool.com", 70.0),
    ("gurufocus.com", 68.0),
    // Financial news
    ("cnbc.com", 75.0),
    ("cnn.com", 70.0),
    ("foxbusiness.com", 68.0),
    // Social / forum
    ("wikipedia.org", 60.0),
    ("reddit.com", 30.0),
    ("quora.com", 25.0),
    ("twitter.com", 25.0),
    ("facebook.com", 20.0),
];

const POSITIVE_INDICATORS: &[&str] = &[
    "annual report",
    "10-k",
    "10-q",
    "8-k",
    "sec filing",
    "earnings report",
    "financial statement",
    "investor relations",
    "quarterly report",
    "press release",
    "earnings call",
    "analyst report",
    "research note",
    "financial analysis",
];

const NEGATIVE_INDICATORS: &[&str] = &[
    "opinion",
    "blog",
    "forum",
    "comment",
    "social media",
    "unverified",
    "rumor",
    "speculation",
    "advertisement",
    "promotional",
    "sponsored",
];

const METRIC_KEYWORDS: &[&str] = &[
    "roic",
    "roe",
    "eps",
    "revenue",
    "debt",
    "margin",
    "cash flow",
    "ebitda",
    "p/e",
    "p/s",
];

static STRUCTURED_DATA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\$\d+(?:,\d{3})*(?:\.\d+)?[BMK]?", // currency with multipliers
        r"\d+\.\d+%",                        // percentages
        r":\s*\$?\d+(?:,\d{3})*",            // labeled values
        r"\|\s*\d+",                         // table-like formatting
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern must compile"))
    .collect()
});

static LABEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[A-Za-z\s]+:\s*\$?\d+",
        r"[A-Za-z\s]+\s+\$?\d+(?:,\d{3})*",
        r"\w+\s+Ratio:\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern must compile"))
    .collect()
});

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?").expect("static pattern must compile"));

/// Rates web sources for financial-data trustworthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCredibilityScorer;

impl SourceCredibilityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Credibility of a source in [0, 1]. Never fails: malformed URLs and
    /// any other internal trouble yield the neutral 0.5.
    pub fn score(&self, url: &str, content: &str, _field: &str) -> f64 {
        let domain = match Url::parse(url).ok().and_then(|u| {
            u.host_str().map(|h| h.to_lowercase())
        }) {
            Some(d) => d,
            None => {
                tracing::debug!(url, "unparseable source url, using neutral credibility");
                return 0.5;
            }
        };

        let domain_score = domain_score(&domain);
        let content_score = content_quality_score(content);
        let recency_score = recency_score(content);
        let presentation_score = presentation_score(content);

        let final_score = domain_score.clamp(0.0, 100.0) * 0.4
            + content_score.clamp(0.0, 100.0) * 0.3
            + recency_score.clamp(0.0, 100.0) * 0.15
            + presentation_score.clamp(0.0, 100.0) * 0.15;

        (final_score / 100.0).clamp(0.0, 1.0)
    }

    /// Coarse source classification used for provenance reporting.
    pub fn source_type_from_url(&self, url: &str) -> SourceType {
        let domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();

        if domain.contains("sec.gov") || domain.contains("edgar") {
            SourceType::SecFiling
        } else if ["bloomberg", "reuters", "wsj", "ft."]
            .iter()
            .any(|d| domain.contains(d))
        {
            SourceType::FinancialNews
        } else if ["morningstar", "finviz", "yahoo"]
            .iter()
            .any(|d| domain.contains(d))
        {
            SourceType::FinancialWebsite
        } else if domain.contains("investor") || domain.starts_with("ir.") {
            SourceType::CompanyPresentation
        } else if ["seekingalpha", "fool", "zacks"]
            .iter()
            .any(|d| domain.contains(d))
        {
            SourceType::AnalystReport
        } else if ["reddit", "quora", "facebook"]
            .iter()
            .any(|d| domain.contains(d))
        {
            SourceType::ForumDiscussion
        } else if domain.ends_with(".gov") {
            SourceType::GovernmentData
        } else {
            SourceType::FinancialWebsite
        }
    }
}

fn domain_score(domain: &str) -> f64 {
    // Exact match first, then substring against the table keys.
    if let Some((_, score)) = DOMAIN_RANKINGS.iter().find(|(d, _)| *d == domain) {
        return *score;
    }
    if let Some((_, score)) = DOMAIN_RANKINGS.iter().find(|(d, _)| domain.contains(d)) {
        return *score;
    }

    if domain.ends_with(".gov") {
        90.0
    } else if domain.ends_with(".edu") {
        75.0
    } else if domain.contains("investor") {
        80.0
    } else if domain.matches('.').count() == 1
        && domain.split('.').next().map(|s| s.len() > 3).unwrap_or(false)
    {
        // Simple company domain
        50.0
    } else {
        40.0
    }
}

fn content_quality_score(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let mut score = 50.0;

    let positive = POSITIVE_INDICATORS
        .iter()
        .filter(|ind| lower.contains(*ind))
        .count() as f64;
    score += (positive * 5.0).min(30.0);

    let negative = NEGATIVE_INDICATORS
        .iter()
        .filter(|ind| lower.contains(*ind))
        .count() as f64;
    score -= (negative * 5.0).min(25.0);

    if STRUCTURED_DATA_PATTERNS.iter().any(|p| p.is_match(content)) {
        score += 15.0;
    }

    let metric_count = METRIC_KEYWORDS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();
    if metric_count >= 3 {
        score += 10.0;
    }

    score
}

fn recency_score(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let mut score = 50.0;

    let current_year = Utc::now().year();
    if (current_year - 2..=current_year).any(|year| content.contains(&year.to_string())) {
        score += 20.0;
    }

    let mut keywords: Vec<String> = ["latest", "recent", "current", "updated", "ttm", "trailing twelve"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for quarter in 1..=4 {
        keywords.push(format!("q{quarter} {current_year}"));
    }
    keywords.push(format!("fiscal {current_year}"));

    if keywords.iter().any(|k| lower.contains(k.as_str())) {
        score += 10.0;
    }

    score
}

fn presentation_score(content: &str) -> f64 {
    let mut score = 50.0;

    if has_tables(content) {
        score += 20.0;
    }
    if LABEL_PATTERNS.iter().any(|p| p.is_match(content)) {
        score += 15.0;
    }
    if has_consistent_formatting(content) {
        score += 10.0;
    }
    if content.len() < 100 {
        score -= 15.0;
    }

    score
}

fn has_tables(content: &str) -> bool {
    ["|", "\t", "    ", "TABLE", "th>", "td>", "Year", "Quarter", "Metric", "Value"]
        .iter()
        .any(|ind| content.contains(ind))
}

fn has_consistent_formatting(content: &str) -> bool {
    let numbers: Vec<&str> = NUMBER_PATTERN
        .find_iter(content)
        .map(|m| m.as_str())
        .collect();
    if numbers.len() > 3 {
        let comma_grouped = numbers.iter().filter(|n| n.contains(',')).count();
        comma_grouped as f64 >= numbers.len() as f64 * 0.7
    } else {
        // Too few numbers to judge either way.
        true
    }
}
