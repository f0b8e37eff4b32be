//! Remaining-time orchestration and smoothing.
//!
//! Tries the estimation strategies in order of preference, keeps the first
//! one that produces a number, then blends it with the previous estimate so
//! the displayed countdown does not jump around between ticks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::curve_fit::exponential_remaining;
use super::rate::heating_rate;
use super::{EstimateContext, EstimatorState};
use crate::config::EstimatorConfig;
use crate::utils::{minutes_between, round_to};

/// A way of turning the sample history into a raw remaining-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Newton's-law fit towards the ambient temperature.
    Exponential,
    /// Remaining degrees divided by the regression rate.
    Linear,
    /// Rate from the first and last sample only.
    Bootstrap,
}

impl Strategy {
    /// Strategies in order of preference.
    pub const CHAIN: [Strategy; 3] = [Self::Exponential, Self::Linear, Self::Bootstrap];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exponential => "exponential",
            Self::Linear => "linear",
            Self::Bootstrap => "bootstrap",
        }
    }

    /// Raw estimate in minutes, or `None` if the strategy does not apply.
    pub fn estimate(&self, ctx: &EstimateContext<'_>, config: &EstimatorConfig) -> Option<f64> {
        match self {
            Self::Exponential => exponential_remaining(
                ctx.samples,
                ctx.current_temp,
                ctx.target_temp,
                ctx.ambient_temp,
                config,
            ),
            Self::Linear => linear_remaining(ctx, config),
            Self::Bootstrap => bootstrap_remaining(ctx, config),
        }
    }
}

/// Where a remaining-time value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Produced by a strategy this tick.
    Model(Strategy),
    /// The probe is at or above the target.
    TargetReached,
    /// No strategy applied; the previous stable estimate was kept.
    Held,
}

impl EstimateSource {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model(strategy) => strategy.as_str(),
            Self::TargetReached => "target_reached",
            Self::Held => "held",
        }
    }
}

/// A displayable remaining-time value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Remaining minutes, rounded to 1 decimal.
    pub minutes: f64,
    /// How the value was obtained.
    pub source: EstimateSource,
}

/// Remaining minutes for the current tick.
///
/// Returns the updated state alongside the estimate. At or above the target
/// the result is exactly `0.0` and the state becomes stable. When every
/// strategy fails the previous estimate is held if the state is stable.
pub fn remaining_time(
    mut state: EstimatorState,
    ctx: &EstimateContext<'_>,
    config: &EstimatorConfig,
) -> (EstimatorState, Option<Estimate>) {
    if ctx.target_reached() {
        state.last_estimate = Some(0.0);
        state.is_stable = true;
        return (
            state,
            Some(Estimate {
                minutes: 0.0,
                source: EstimateSource::TargetReached,
            }),
        );
    }

    let raw = Strategy::CHAIN
        .iter()
        .find_map(|strategy| strategy.estimate(ctx, config).map(|value| (*strategy, value)));

    let Some((strategy, raw)) = raw else {
        let held = state
            .last_estimate
            .filter(|_| state.is_stable)
            .map(|minutes| Estimate {
                minutes,
                source: EstimateSource::Held,
            });
        return (state, held);
    };

    let raw = raw.clamp(0.0, config.max_remaining_minutes);
    let minutes = match state.last_estimate {
        Some(previous) if previous > 0.0 => {
            let weight = smoothing_weight(ctx.current_temp, ctx.target_temp, config);
            round_to(weight * raw + (1.0 - weight) * previous, 1)
        }
        _ => round_to(raw, 1),
    };

    debug!(
        "Remaining time via {}: raw={:.1}min, shown={:.1}min",
        strategy.as_str(),
        raw,
        minutes
    );

    state.last_estimate = Some(minutes);
    state.is_stable = true;
    (
        state,
        Some(Estimate {
            minutes,
            source: EstimateSource::Model(strategy),
        }),
    )
}

/// Weight given to the new raw estimate when blending.
///
/// Grows linearly from the base weight at the reference temperature to
/// base + gain at the target. Below the reference temperature progress is
/// negative and the weight drops under the base. The result is kept in
/// `[0, cap]`.
pub fn smoothing_weight(current_temp: f64, target_temp: f64, config: &EstimatorConfig) -> f64 {
    let span = (target_temp - config.progress_reference_temp).max(1.0);
    let progress = 1.0 - (target_temp - current_temp) / span;
    (config.smoothing_base + progress * config.smoothing_gain).clamp(0.0, config.smoothing_cap)
}

fn linear_remaining(ctx: &EstimateContext<'_>, config: &EstimatorConfig) -> Option<f64> {
    let rate = heating_rate(ctx.samples, config)?;
    if rate <= config.min_linear_rate {
        return None;
    }

    let remaining = (ctx.target_temp - ctx.current_temp) / rate;
    (remaining <= config.max_remaining_minutes).then_some(remaining)
}

fn bootstrap_remaining(ctx: &EstimateContext<'_>, config: &EstimatorConfig) -> Option<f64> {
    let (first, last) = match ctx.samples {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let elapsed = minutes_between(first.timestamp, last.timestamp);
    if elapsed < config.bootstrap_min_span.as_secs_f64() / 60.0 {
        return None;
    }

    let change = last.value - first.value;
    if change <= 0.0 {
        return None;
    }

    Some((ctx.target_temp - ctx.current_temp) / (change / elapsed))
}
