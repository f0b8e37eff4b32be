//! Utility functions for the probe-cook-engine crate.

use chrono::{DateTime, Utc};

/// Convert Celsius to Fahrenheit.
///
/// # Example
///
/// ```
/// use probe_cook_engine::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Round to a fixed number of decimal places.
///
/// ```
/// use probe_cook_engine::utils::round_to;
///
/// assert_eq!(round_to(1.2345, 2), 1.23);
/// assert_eq!(round_to(12.96, 1), 13.0);
/// ```
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Elapsed time between two instants in fractional minutes.
///
/// Negative when `later` precedes `earlier`.
#[inline]
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    seconds_between(earlier, later) / 60.0
}

/// Elapsed time between two instants in fractional seconds.
#[inline]
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Median of a non-empty slice. Returns `None` for an empty slice.
///
/// Sorts the input in place; NaN values are ordered last.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(57.0) - 134.6).abs() < 0.001);
    }

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert!((fahrenheit_to_celsius(32.0) - 0.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.86, 1), 1.9);
        assert_eq!(round_to(-0.004, 2), -0.0);
        assert_eq!(round_to(1440.0, 1), 1440.0);
    }

    #[test]
    fn test_minutes_between() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::seconds(90);
        assert!((minutes_between(t0, t1) - 1.5).abs() < 1e-9);
        assert!((minutes_between(t1, t0) + 1.5).abs() < 1e-9);
        assert!((seconds_between(t0, t1) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0]), Some(3.0));
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}
