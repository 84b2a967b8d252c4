//! Numeric text helpers
//!
//! Cell values are strings; these helpers decide when a string is a number
//! and format results the way the display layer expects (`15`, `2.5`, `1e+21`).

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number literal regex must compile"));

/// Check if text is a plain integer/decimal literal (`5`, `-2.5`)
///
/// Values passing this check are substituted into expressions as bare numbers;
/// anything else is substituted as a quoted string.
pub fn is_number_literal(text: &str) -> bool {
    NUMBER_LITERAL.is_match(text)
}

/// Coerce a string argument to a number
///
/// Surrounding whitespace is ignored and the empty string is zero. Text that
/// does not parse, or parses to a non-finite value, is not numeric.
pub fn coerce_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    // Rust also accepts "inf"/"NaN" spellings; reject them via the finiteness check
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => None,
    }
}

/// Format a number for display
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }

    format!("{}", n)
}
