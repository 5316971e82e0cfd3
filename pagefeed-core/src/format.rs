//! Compact rendering of engagement counters.

const MARKERS: [&str; 4] = ["", "k", "m", "b"];

/// Render `value` with at most three significant digits pegged to the nearest
/// power of 1000, e.g. `6990 -> "6.99k"`, `123456 -> "123k"`.
///
/// Non-positive values render as `"0"`. Values that would need the last
/// marker saturate to `"1.0b+"`.
pub fn short_form(value: i64) -> String {
    if value <= 0 {
        return "0".to_string();
    }

    let powers_of_ten = value.ilog10();
    let powers_of_thousand = (powers_of_ten / 3) as usize;

    if powers_of_thousand >= MARKERS.len() - 1 {
        return format!("1.0{}+", MARKERS[MARKERS.len() - 1]);
    }

    if powers_of_thousand == 0 {
        return value.to_string();
    }

    let scaled = value as f64 / 1000f64.powi(powers_of_thousand as i32);
    let decimals = (2 - powers_of_ten % 3) as usize;
    let mut text = format!("{:.*}", decimals, scaled);

    // "1.00" -> "1.0", but "10.0" stays
    if text.contains('.') && !text.ends_with(".0") && text.ends_with('0') {
        text.pop();
    }

    text.push_str(MARKERS[powers_of_thousand]);
    text
}
