//! Heating rate by linear regression.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EstimatorConfig;
use crate::data::{history::trailing_window, Sample};
use crate::utils::{minutes_between, round_to};

/// Direction the probe temperature is moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Rising faster than the threshold.
    Increasing,
    /// Neither rising nor falling, or unknown.
    #[default]
    Stable,
    /// Falling faster than the threshold.
    Decreasing,
}

impl Trend {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Stable => "stable",
            Self::Decreasing => "decreasing",
        }
    }
}

/// Heating rate in °/min over the trailing `window`, rounded to 2 decimals.
///
/// Returns `None` with fewer than `min_points` samples in the window or when
/// all timestamps in the window are identical.
pub fn rate(samples: &[Sample], window: Duration, min_points: usize) -> Option<f64> {
    if samples.len() < min_points {
        return None;
    }

    let recent = trailing_window(samples, window);
    if recent.len() < min_points {
        return None;
    }

    slope(recent).map(|value| round_to(value, 2))
}

/// [`rate`] with the configured window and minimum point count.
pub fn heating_rate(samples: &[Sample], config: &EstimatorConfig) -> Option<f64> {
    rate(samples, config.window, config.min_points)
}

/// Classify a heating rate.
pub fn heating_trend(rate: Option<f64>, threshold: f64) -> Trend {
    match rate {
        Some(r) if r > threshold => Trend::Increasing,
        Some(r) if r < -threshold => Trend::Decreasing,
        _ => Trend::Stable,
    }
}

/// Ordinary least-squares slope of value against minutes since the first
/// sample. Unrounded.
pub(crate) fn slope(samples: &[Sample]) -> Option<f64> {
    let first = samples.first()?;
    let n = samples.len() as f64;

    let xs: Vec<f64> = samples
        .iter()
        .map(|s| minutes_between(first.timestamp, s.timestamp))
        .collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = mean_value(samples);

    let (numerator, denominator) = xs.iter().zip(samples).fold((0.0, 0.0), |(num, den), (x, s)| {
        let dx = x - x_mean;
        (num + dx * (s.value - y_mean), den + dx * dx)
    });

    if denominator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}

/// Arithmetic mean of the sample values. `NaN` for an empty slice.
pub(crate) fn mean_value(samples: &[Sample]) -> f64 {
    samples.iter().map(|s| s.value).sum::<f64>() / samples.len() as f64
}
