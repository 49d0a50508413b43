//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u8 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_u8(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    let clamped = value.clamp(0.0, f64::from(u8::MAX)).round();
    cast::<f64, u8>(clamped).unwrap_or(0)
}

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Clamp a probability into `[0, 1]`, treating non-finite input as zero.
#[must_use]
pub fn clamp_probability(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Wrap a hue in degrees into `[0, 360)`.
#[must_use]
pub fn wrap_degrees(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.rem_euclid(360.0)
}
