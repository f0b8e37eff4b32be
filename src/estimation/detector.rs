//! Probe event detection.
//!
//! Two gates run before any remaining-time model: a drop veto that catches
//! a probe being pulled out and pushed into a colder item, and a rise
//! confirmation that suppresses estimates until the temperature has been
//! climbing for a minimum duration.

use chrono::{DateTime, Utc};

use super::rate::heating_rate;
use crate::config::EstimatorConfig;
use crate::data::Sample;
use crate::utils::seconds_between;

/// Outcome of the rise check for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiseStatus {
    /// Rate unavailable or at or below the rising threshold.
    NotRising,
    /// Rising since the given instant, but not for long enough yet.
    Confirming(DateTime<Utc>),
    /// Rising for at least the minimum duration since the given instant.
    Confirmed(DateTime<Utc>),
}

impl RiseStatus {
    /// When the current rise began, if rising.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::NotRising => None,
            Self::Confirming(since) | Self::Confirmed(since) => Some(*since),
        }
    }
}

/// Check for a sudden drop against the previous tick's sample.
///
/// A drop needs a previous sample no older than the drop window and a
/// decrease larger than the drop threshold.
pub fn detect_drop(
    previous: Option<&Sample>,
    current_temp: f64,
    now: DateTime<Utc>,
    config: &EstimatorConfig,
) -> bool {
    let Some(previous) = previous else {
        return false;
    };

    let elapsed = seconds_between(previous.timestamp, now);
    if elapsed > config.drop_window.as_secs_f64() {
        return false;
    }

    current_temp - previous.value < config.drop_threshold
}

/// Check if the heating rate over the history is above the rising threshold.
pub fn is_temperature_rising(samples: &[Sample], config: &EstimatorConfig) -> bool {
    heating_rate(samples, config).map_or(false, |rate| rate > config.rising_threshold)
}

/// Combine the rising check with the sustained-rise requirement.
///
/// `rising_since` is when the current rise was first observed. A new rise
/// starts at `now`.
pub fn check_rise(
    samples: &[Sample],
    rising_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &EstimatorConfig,
) -> RiseStatus {
    if !is_temperature_rising(samples, config) {
        return RiseStatus::NotRising;
    }

    let since = rising_since.unwrap_or(now);
    if seconds_between(since, now) >= config.min_rise_duration.as_secs_f64() {
        RiseStatus::Confirmed(since)
    } else {
        RiseStatus::Confirming(since)
    }
}
