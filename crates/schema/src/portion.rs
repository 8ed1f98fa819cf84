//! Serving-size helpers shared by the simulator and the report renderer.

/// Portion factors a detection may carry.
pub const PORTION_STEPS: [f64; 6] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0];

pub const MIN_PORTION: f64 = 0.5;
pub const MAX_PORTION: f64 = 3.0;

/// Snap an estimated serving size to the nearest half portion in `[0.5, 3.0]`.
pub fn round_to_nearest_portion(portion: f64) -> f64 {
    if portion.is_nan() || portion < 0.3 {
        return MIN_PORTION;
    }
    if portion > MAX_PORTION {
        return MAX_PORTION;
    }
    ((portion * 2.0).round() / 2.0).max(MIN_PORTION)
}

/// Scale a nutrition string such as `"10g"` by `portion`.
///
/// Digits and dots form the amount, everything else is kept as the unit.
/// Values without a parsable amount are returned unchanged.
pub fn scale_nutrition_value(value: &str, portion: f64) -> String {
    let (amount, unit): (String, String) = value
        .chars()
        .partition(|c| c.is_ascii_digit() || *c == '.');

    match amount.parse::<f64>() {
        Ok(amount) => format!("{:.1}{}", amount * portion, unit),
        Err(_) => value.to_string(),
    }
}

/// Round a price to whole cents.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
