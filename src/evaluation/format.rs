//! `%20.16g`-style rendering of parameter values.
//!
//! Sixteen significant digits keep the text the external program reads
//! close enough to the solver's `f64` that convergence is not disturbed.

pub const SIGNIFICANT_DIGITS: usize = 16;
pub const FIELD_WIDTH: usize = 20;

/// Right-aligned, fixed-width rendering used in parameter files and logs.
pub fn format_value(value: f64) -> String {
    format!(
        "{:>width$}",
        format_general(value, SIGNIFICANT_DIGITS),
        width = FIELD_WIDTH
    )
}

/// C `%.<precision>g`: shortest of fixed or exponent notation with
/// trailing zeros removed.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
