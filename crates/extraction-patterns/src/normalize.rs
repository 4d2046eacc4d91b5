//! Numeral normalization for extracted financial values.

/// Normalize a matched numeral to base currency units.
///
/// Strips thousands separators, applies a trailing `%` (divide by 100) or a
/// single magnitude suffix K/M/B/T (1e3/1e6/1e9/1e12), and parses the rest
/// as a float. Returns None for empty, `n/a`, `-`, or unparseable input.
/// At most one of the percentage/magnitude adjustments ever applies: a
/// value carries either a `%` or a suffix, never both.
pub fn normalize_value(raw: &str) -> Option<f64> {
    let mut value = raw.replace(',', "").trim().to_string();

    if value.is_empty() || value.eq_ignore_ascii_case("n/a") || value == "-" {
        return None;
    }

    let is_percentage = value.ends_with('%');
    if is_percentage {
        value.pop();
    }

    let mut multiplier = 1.0;
    if !is_percentage {
        if let Some(last) = value.chars().last() {
            multiplier = match last.to_ascii_uppercase() {
                'K' => 1e3,
                'M' => 1e6,
                'B' => 1e9,
                'T' => 1e12,
                _ => 1.0,
            };
            if multiplier != 1.0 {
                value.pop();
            }
        }
    }

    let parsed: f64 = value.trim().parse().ok()?;
    let scaled = parsed * multiplier;

    if is_percentage {
        Some(scaled / 100.0)
    } else {
        Some(scaled)
    }
}
