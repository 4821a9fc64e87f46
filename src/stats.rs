//! Small numeric helpers shared by feature engineering and evaluation.

/// Standard deviation used whenever a computed deviation is exactly zero.
pub const STD_FLOOR: f64 = 1.0;

/// Round `value` to `places` decimal places (half away from zero).
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// True when every value is identical (or there are none).
pub fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Arithmetic mean; 0 for an empty slice.
///
/// A constant slice returns its value exactly, so deviations from it are 0.
pub fn mean(values: &[f64]) -> f64 {
    match values.first() {
        None => 0.0,
        Some(&first) if is_constant(values) => first,
        Some(_) => values.iter().sum::<f64>() / values.len() as f64,
    }
}

/// Population standard deviation with a zero-variance result replaced by [`STD_FLOOR`].
///
/// Identical values always floor, even when summation error leaves a
/// residue in the computed deviation.
pub fn floored_std(values: &[f64], mean: f64) -> f64 {
    if is_constant(values) {
        return STD_FLOOR;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    floor_std(variance.sqrt())
}

/// Replace a zero deviation with [`STD_FLOOR`].
pub fn floor_std(std: f64) -> f64 {
    if std == 0.0 {
        STD_FLOOR
    } else {
        std
    }
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
