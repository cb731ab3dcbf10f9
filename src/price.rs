//! Normalization of retailer price strings.
//!
//! Retailers print prices in German locale (`€ 1.799,00`, `€ 599,00`). Both
//! shapes are rewritten to a plain `1799.00` string and parsed as a float.
//! Anything that still fails to parse becomes `f64::INFINITY`: the price is
//! unknown, callers must not compare or display it as a real amount.

use regex::Regex;
use std::sync::LazyLock;

static THOUSANDS_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^0-9]+(\d+)\.(\d+),(\d+)").unwrap());

static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^0-9]+(\d+),(\d+)").unwrap());

/// Converts retailer price text into a comparable number, `INFINITY` when unreadable.
pub fn normalize_price(text: &str) -> f64 {
    let canonical = canonicalize(text);
    match canonical.trim().parse::<f64>() {
        Ok(price) if !price.is_nan() => price,
        _ => f64::INFINITY,
    }
}

// Only the matched prefix is rewritten; trailing text is kept and makes the parse fail.
fn canonicalize(text: &str) -> String {
    if let Some(caps) = THOUSANDS_DECIMAL.captures(text) {
        let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
        return format!("{}{}.{}{}", &caps[1], &caps[2], &caps[3], rest);
    }

    if let Some(caps) = DECIMAL_COMMA.captures(text) {
        let rest = &text[caps.get(0).map_or(0, |m| m.end())..];
        return format!("{}.{}{}", &caps[1], &caps[2], rest);
    }

    text.to_string()
}
