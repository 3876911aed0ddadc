/// Render a number with the fixed pattern `"0"`: rounded half-to-even to an
/// integer and never in scientific notation.
pub fn format_number_fixed(value: f64) -> String {
    format_number_scaled(value, 0)
}

/// Fixed-point rendering with exactly `digits` fractional digits, rounded
/// half-to-even.
pub fn format_number_scaled(value: f64, digits: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round_ties_even() / scale;
    // -0 renders as "0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.prec$}", prec = digits as usize)
}

/// Number-format string for a fixed number of decimals: `0`, `0.0`, `0.00`, …
pub fn fixed_number_format(digits: u32) -> String {
    if digits == 0 {
        "0".to_string()
    } else {
        format!("0.{}", "0".repeat(digits as usize))
    }
}
