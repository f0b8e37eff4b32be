//! Engine configuration.
//!
//! Every tunable constant of the estimator, the carryover model and the
//! notification rules lives here. `Default` reproduces the reference
//! behaviour; hosts can override individual values with the `with_*`
//! builders or load a partial JSON document with
//! [`EngineConfig::from_json_str`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Tunables for rate, curve-fit and remaining-time estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Trailing window used for regression and curve fitting.
    pub window: Duration,
    /// Minimum samples for a regression.
    pub min_points: usize,
    /// Minimum samples for the exponential fit.
    pub min_curve_points: usize,
    /// Minimum spacing between a sample and the latest one for a rate constant pair.
    pub min_pair_span: Duration,
    /// Sanity cap for any remaining-time estimate, in minutes.
    pub max_remaining_minutes: f64,
    /// Heating rates at or below this are treated as flat by the linear model (°/min).
    pub min_linear_rate: f64,
    /// Minimum span between first and last sample for the bootstrap estimate.
    pub bootstrap_min_span: Duration,
    /// Heating rate above which the temperature counts as rising (°/min).
    pub rising_threshold: f64,
    /// Sustained rise required before any estimate is produced.
    pub min_rise_duration: Duration,
    /// Temperature change that counts as a probe reinsertion (negative).
    pub drop_threshold: f64,
    /// Maximum age of the previous sample for drop detection.
    pub drop_window: Duration,
    /// Smoothing weight at zero progress.
    pub smoothing_base: f64,
    /// Additional smoothing weight gained at full progress.
    pub smoothing_gain: f64,
    /// Upper bound of the smoothing weight.
    pub smoothing_cap: f64,
    /// Start temperature assumed when computing smoothing progress.
    pub progress_reference_temp: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3 * 60),
            min_points: 2,
            min_curve_points: 3,
            min_pair_span: Duration::from_secs(15),
            max_remaining_minutes: 1440.0,
            min_linear_rate: 0.01,
            bootstrap_min_span: Duration::from_secs(30),
            rising_threshold: 0.1,
            min_rise_duration: Duration::from_secs(20),
            drop_threshold: -5.0,
            drop_window: Duration::from_secs(30),
            smoothing_base: 0.3,
            smoothing_gain: 0.5,
            smoothing_cap: 0.9,
            progress_reference_temp: 20.0,
        }
    }
}

impl EstimatorConfig {
    /// Trailing window in minutes.
    pub fn window_minutes(&self) -> f64 {
        self.window.as_secs_f64() / 60.0
    }

    /// Set the trailing regression window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the sustained-rise confirmation delay.
    pub fn with_min_rise_duration(mut self, duration: Duration) -> Self {
        self.min_rise_duration = duration;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(Error::invalid_parameter("estimator.window", "0s"));
        }
        if self.min_points < 2 {
            return Err(Error::invalid_parameter(
                "estimator.min_points",
                self.min_points,
            ));
        }
        if self.min_curve_points < 2 {
            return Err(Error::invalid_parameter(
                "estimator.min_curve_points",
                self.min_curve_points,
            ));
        }
        positive("estimator.max_remaining_minutes", self.max_remaining_minutes)?;
        finite("estimator.min_linear_rate", self.min_linear_rate)?;
        finite("estimator.rising_threshold", self.rising_threshold)?;
        if !(self.drop_threshold.is_finite() && self.drop_threshold < 0.0) {
            return Err(Error::invalid_parameter(
                "estimator.drop_threshold",
                self.drop_threshold,
            ));
        }
        unit_interval("estimator.smoothing_base", self.smoothing_base)?;
        unit_interval("estimator.smoothing_gain", self.smoothing_gain)?;
        unit_interval("estimator.smoothing_cap", self.smoothing_cap)?;
        finite(
            "estimator.progress_reference_temp",
            self.progress_reference_temp,
        )
    }
}

/// Tunables for the dynamic carryover model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarryoverConfig {
    /// Carryover in degrees at the reference heating rate.
    pub base_multiplier: f64,
    /// Reference heating rate (°/min) for the rate factor.
    pub reference_rate: f64,
    /// Lower bound of the rate factor.
    pub min_rate_factor: f64,
    /// Upper bound of the rate factor.
    pub max_rate_factor: f64,
    /// Largest carryover ever applied, in degrees.
    pub max_carryover: f64,
    /// Ambient readings above this adjust the carryover.
    pub ambient_threshold: f64,
    /// Divisor in `0.5 + ambient / divisor`.
    pub ambient_divisor: f64,
    /// Lower bound of the ambient factor.
    pub min_ambient_factor: f64,
    /// Upper bound of the ambient factor.
    pub max_ambient_factor: f64,
    /// Floor for the withdrawal temperature.
    pub min_withdrawal_temp: f64,
}

impl Default for CarryoverConfig {
    fn default() -> Self {
        Self {
            base_multiplier: 2.0,
            reference_rate: 1.0,
            min_rate_factor: 0.3,
            max_rate_factor: 3.0,
            max_carryover: 8.0,
            ambient_threshold: 100.0,
            ambient_divisor: 400.0,
            min_ambient_factor: 0.5,
            max_ambient_factor: 1.5,
            min_withdrawal_temp: 30.0,
        }
    }
}

impl CarryoverConfig {
    fn validate(&self) -> Result<()> {
        positive("carryover.base_multiplier", self.base_multiplier)?;
        positive("carryover.reference_rate", self.reference_rate)?;
        positive("carryover.ambient_divisor", self.ambient_divisor)?;
        finite("carryover.ambient_threshold", self.ambient_threshold)?;
        finite("carryover.min_withdrawal_temp", self.min_withdrawal_temp)?;
        ordered(
            "carryover.rate_factor",
            self.min_rate_factor,
            self.max_rate_factor,
        )?;
        ordered(
            "carryover.ambient_factor",
            self.min_ambient_factor,
            self.max_ambient_factor,
        )?;
        ordered("carryover.max_carryover", 0.0, self.max_carryover)
    }
}

/// Rules for the optional notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Send a one-shot notification shortly before the target is reached.
    pub notify_before_done: bool,
    /// Remaining minutes at which the early notification fires.
    pub before_done_minutes: f64,
    /// Notify when the probe drops out during a cook.
    pub notify_disconnect: bool,
    /// How long the probe must be gone before notifying.
    pub disconnect_grace: Duration,
    /// Minimum time between two disconnect notifications.
    pub disconnect_cooldown: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_before_done: false,
            before_done_minutes: 5.0,
            notify_disconnect: false,
            disconnect_grace: Duration::from_secs(30),
            disconnect_cooldown: Duration::from_secs(300),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Estimator tunables.
    pub estimator: EstimatorConfig,
    /// Carryover tunables.
    pub carryover: CarryoverConfig,
    /// Notification rules.
    pub notifications: NotificationConfig,
    /// Period of the polling tick.
    pub tick_interval: Duration,
    /// Maximum points per series included in a snapshot.
    pub history_export_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            carryover: CarryoverConfig::default(),
            notifications: NotificationConfig::default(),
            tick_interval: Duration::from_secs(5),
            history_export_limit: 500,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON document; missing fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the estimator tunables.
    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replace the carryover tunables.
    pub fn with_carryover(mut self, carryover: CarryoverConfig) -> Self {
        self.carryover = carryover;
        self
    }

    /// Replace the notification rules.
    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }

    /// Set the polling tick period.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Check every value for consistency.
    pub fn validate(&self) -> Result<()> {
        self.estimator.validate()?;
        self.carryover.validate()?;
        positive(
            "notifications.before_done_minutes",
            self.notifications.before_done_minutes,
        )?;
        if self.tick_interval.is_zero() {
            return Err(Error::invalid_parameter("tick_interval", "0s"));
        }
        Ok(())
    }
}

fn finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value))
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, value))
    }
}

fn ordered(name: &str, low: f64, high: f64) -> Result<()> {
    if low.is_finite() && high.is_finite() && low <= high {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, format!("{low}..{high}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert!((config.estimator.window_minutes() - 3.0).abs() < 1e-9);
        assert_eq!(config.carryover.max_carryover, 8.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "notifications": { "notify_before_done": true }, "history_export_limit": 100 }"#,
        )
        .unwrap();

        assert!(config.notifications.notify_before_done);
        assert_eq!(config.notifications.before_done_minutes, 5.0);
        assert_eq!(config.history_export_limit, 100);
        assert_eq!(config.estimator, EstimatorConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = EngineConfig::default();
        config.estimator.drop_threshold = 5.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));

        let config = EngineConfig::default().with_tick_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let mut carryover = CarryoverConfig::default();
        carryover.min_rate_factor = 4.0;
        let config = EngineConfig::default().with_carryover(carryover);
        assert!(config.validate().is_err());

        assert!(EngineConfig::from_json_str("{ \"tick_interval\": 3 }").is_err());
    }

    #[test]
    fn test_builders() {
        let estimator = EstimatorConfig::default()
            .with_window(Duration::from_secs(120))
            .with_min_rise_duration(Duration::from_secs(10));
        let config = EngineConfig::new().with_estimator(estimator);
        assert!((config.estimator.window_minutes() - 2.0).abs() < 1e-9);
        assert_eq!(config.estimator.min_rise_duration, Duration::from_secs(10));
    }
}
