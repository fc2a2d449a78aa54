//! ECMAScript `Number::toString` formatting for finite doubles.
//!
//! Pinning the digit sequence is what makes receipt hashes reproducible
//! across implementations: two serializers that agree on every other rule
//! still disagree on `1e21` vs `1e+21` vs `1000000000000000000000` unless the
//! number format is fixed. RFC 8785 adopts the ECMAScript algorithm, so this
//! module implements exactly that on top of Rust's shortest round-trip digit
//! generation.

/// Formats a finite `f64` the way ECMAScript `Number.prototype.toString`
/// does.
///
/// Non-finite inputs never reach this function through the canonicalizer;
/// if called directly they render as `null`, the same as `JSON.stringify`.
#[must_use]
pub fn format_f64(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        // Covers -0.0 as well.
        return "0".to_string();
    }
    if value.is_sign_negative() {
        return format!("-{}", format_positive(-value));
    }
    format_positive(value)
}

/// Splits the shortest round-trip representation into its significant
/// digits and the decimal exponent `n` such that `value = 0.d1d2...dk * 10^n`.
fn shortest_digits(value: f64) -> (String, i32) {
    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e3".
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    (digits.to_string(), exponent + 1)
}

fn format_positive(value: f64) -> String {
    let (digits, n) = shortest_digits(value);
    let k = i32::try_from(digits.len()).unwrap_or(i32::MAX);

    if k <= n && n <= 21 {
        // Integer with trailing zeros.
        let zeros = usize::try_from(n - k).unwrap_or(0);
        return format!("{digits}{}", "0".repeat(zeros));
    }
    if 0 < n && n <= 21 {
        let split = usize::try_from(n).unwrap_or(0);
        return format!("{}.{}", &digits[..split], &digits[split..]);
    }
    if -6 < n && n <= 0 {
        let zeros = usize::try_from(-n).unwrap_or(0);
        return format!("0.{}{digits}", "0".repeat(zeros));
    }

    let exponent = n - 1;
    let sign = if exponent < 0 { '-' } else { '+' };
    let magnitude = exponent.unsigned_abs();
    if k == 1 {
        format!("{digits}e{sign}{magnitude}")
    } else {
        format!("{}.{}e{sign}{magnitude}", &digits[..1], &digits[1..])
    }
}
