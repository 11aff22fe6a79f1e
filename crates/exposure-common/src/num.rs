//! Numeric helpers shared by provider integrations.

/// Round a USD amount to cents.
pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scale a base-unit amount down by `decimals` places.
pub fn scale_by_decimals(value: f64, decimals: u32) -> f64 {
    value / 10f64.powi(decimals as i32)
}
