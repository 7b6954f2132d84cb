//! Human-readable formatting of metric card values.
//!
//! Every function here is total: non-finite input renders as `NaN`, `inf`
//! or `-inf` instead of failing.

use crate::utils::config::{BILLION, MILLION, THOUSAND};

/// Scale a number to a `K`/`M`/`B` suffix
///
/// **Public** - used by every KPI card
///
/// # Arguments
/// * `value` - Number to format; the sign is kept
/// * `decimals` - Digits after the decimal point
///
/// # Example
/// ```ignore
/// assert_eq!(format_magnitude(1500.0, 1), "1.5K");
/// assert_eq!(format_magnitude(-5000.0, 0), "-5K");
/// ```
pub fn format_magnitude(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }

    let abs = value.abs();
    if abs >= BILLION {
        format!("{:.*}B", decimals, value / BILLION)
    } else if abs >= MILLION {
        format!("{:.*}M", decimals, value / MILLION)
    } else if abs >= THOUSAND {
        format!("{:.*}K", decimals, value / THOUSAND)
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// Render a fraction as a percentage (`0.1234` -> `12.3%` at one decimal)
pub fn format_percent(fraction: f64, decimals: usize) -> String {
    if !fraction.is_finite() {
        return non_finite(fraction);
    }
    format!("{:.*}%", decimals, fraction * 100.0)
}

/// Currency prefix followed by the scaled magnitude
pub fn format_currency(value: f64, prefix: &str, decimals: usize) -> String {
    format!("{}{}", prefix, format_magnitude(value, decimals))
}

/// Rounded integer with `,` thousands separators
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }

    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3 + 1);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if value.is_sign_negative() && rounded != "0" {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Multiplier notation, e.g. ROAS `2.35x`
pub fn format_ratio(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return non_finite(value);
    }
    format!("{:.*}x", decimals, value)
}

fn non_finite(value: f64) -> String {
    // f64's Display already renders NaN, inf and -inf
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_magnitude_thresholds() {
        assert_eq!(format_magnitude(999.0, 0), "999");
        assert_eq!(format_magnitude(1500.0, 1), "1.5K");
        assert_eq!(format_magnitude(2_300_000.0, 0), "2M");
        assert_eq!(format_magnitude(-5000.0, 0), "-5K");
        assert_eq!(format_magnitude(4_200_000_000.0, 2), "4.20B");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.1234, 1), "12.3%");
        assert_eq!(format_percent(1.0, 0), "100%");
    }

    #[test]
    fn test_non_finite_is_total() {
        assert_eq!(format_magnitude(f64::NAN, 1), "NaN");
        assert_eq!(format_magnitude(f64::INFINITY, 1), "inf");
        assert_eq!(format_percent(f64::NEG_INFINITY, 1), "-inf");
        assert_eq!(format_thousands(f64::NAN), "NaN");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(2_500_000.0, "₹", 1), "₹2.5M");
        assert_eq!(format_currency(12.0, "$", 0), "$12");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-1000.0), "-1,000");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(2.346, 2), "2.35x");
    }
}
