//! Remaining-time estimation.
//!
//! The estimator is a pure function of the sample history and an explicit
//! [`EstimatorState`] value: each tick takes the previous state and returns
//! the next one together with the displayable estimate. The lifecycle owns
//! the state and the history; nothing in here mutates either.
//!
//! Per tick, [`Estimator::evaluate`] runs:
//! 1. drop detection (probe moved into a colder item resets everything),
//! 2. the target check (at or above target is always `0.0`),
//! 3. the sustained-rise gate,
//! 4. the strategy chain with smoothing.

pub mod curve_fit;
pub mod detector;
pub mod rate;
pub mod remaining;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EstimatorConfig;
use crate::data::Sample;

pub use curve_fit::{estimate_ambient_from_curve, exponential_remaining};
pub use detector::{check_rise, detect_drop, is_temperature_rising, RiseStatus};
pub use rate::{heating_rate, heating_trend, rate, Trend};
pub use remaining::{remaining_time, smoothing_weight, Estimate, EstimateSource, Strategy};

/// Per-session estimator state carried from one tick to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EstimatorState {
    /// Last displayed estimate in minutes.
    pub last_estimate: Option<f64>,
    /// When the current sustained rise began.
    pub cooking_start_time: Option<DateTime<Utc>>,
    /// Whether the last estimate may be held when no strategy applies.
    pub is_stable: bool,
    /// Previous tick's probe reading, for drop detection.
    pub last_sample: Option<Sample>,
}

impl EstimatorState {
    /// Fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every estimate but keep the drop-detection sample.
    pub fn reset(self) -> Self {
        Self {
            last_sample: self.last_sample,
            ..Self::default()
        }
    }
}

/// Read-only inputs for one estimate.
#[derive(Debug, Clone, Copy)]
pub struct EstimateContext<'a> {
    /// Probe history, oldest first.
    pub samples: &'a [Sample],
    /// Latest probe temperature.
    pub current_temp: f64,
    /// Temperature to estimate the time to.
    pub target_temp: f64,
    /// Latest ambient temperature, if the probe reports one.
    pub ambient_temp: Option<f64>,
}

impl<'a> EstimateContext<'a> {
    /// Create a context.
    pub fn new(
        samples: &'a [Sample],
        current_temp: f64,
        target_temp: f64,
        ambient_temp: Option<f64>,
    ) -> Self {
        Self {
            samples,
            current_temp,
            target_temp,
            ambient_temp,
        }
    }

    /// Check if the probe is at or above the target.
    pub fn target_reached(&self) -> bool {
        self.current_temp >= self.target_temp
    }
}

/// Result of one estimator tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// State to pass to the next tick.
    pub state: EstimatorState,
    /// Displayable estimate, if any.
    pub estimate: Option<Estimate>,
    /// Whether this tick detected a probe reinsertion.
    pub drop_detected: bool,
}

impl Evaluation {
    /// Remaining minutes, if estimated.
    pub fn minutes(&self) -> Option<f64> {
        self.estimate.map(|e| e.minutes)
    }
}

/// Runs the per-tick estimation pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl Estimator {
    /// Create an estimator.
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Evaluate one tick.
    pub fn evaluate(
        &self,
        state: EstimatorState,
        ctx: &EstimateContext<'_>,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let config = &self.config;
        let dropped = detect_drop(state.last_sample.as_ref(), ctx.current_temp, now, config);
        let mut state = EstimatorState {
            last_sample: Some(Sample::new(now, ctx.current_temp)),
            ..state
        };

        if dropped {
            debug!(
                "Temperature drop to {:.1} detected, resetting estimator",
                ctx.current_temp
            );
            return Evaluation {
                state: state.reset(),
                estimate: None,
                drop_detected: true,
            };
        }

        if ctx.target_reached() {
            let (state, estimate) = remaining_time(state, ctx, config);
            return Evaluation {
                state,
                estimate,
                drop_detected: false,
            };
        }

        let rise = check_rise(ctx.samples, state.cooking_start_time, now, config);
        state.cooking_start_time = rise.since();

        let (state, estimate) = match rise {
            RiseStatus::NotRising => {
                state.is_stable = false;
                (state, None)
            }
            RiseStatus::Confirming(since) => {
                debug!("Rise since {} not yet confirmed", since);
                (state, None)
            }
            RiseStatus::Confirmed(_) => remaining_time(state, ctx, config),
        };

        Evaluation {
            state,
            estimate,
            drop_detected: false,
        }
    }
}
