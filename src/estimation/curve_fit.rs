//! Exponential approach-to-ambient model.
//!
//! Newton's law of heating: `T(t) = A - (A - T0)·e^(-k·t)`, where `A` is
//! the asymptotic (heat source) temperature and `k > 0` the rate constant.
//! `A` comes from the ambient sensor when it reads above the probe, and is
//! otherwise inferred from the curvature of the recent samples.

use tracing::debug;

use super::rate::{mean_value, slope};
use crate::config::EstimatorConfig;
use crate::data::{history::trailing_window, Sample};
use crate::utils::{median, minutes_between, round_to};

/// Ambient offset assumed when the curve gives no usable curvature.
const FALLBACK_AMBIENT_OFFSET: f64 = 150.0;

/// Ambient offset used when the inferred ambient is not above the probe.
const MIN_AMBIENT_OFFSET: f64 = 100.0;

/// Inferred ambients above this are implausible.
const MAX_PLAUSIBLE_AMBIENT: f64 = 400.0;

/// Replacement for implausible inferred ambients.
const CAPPED_AMBIENT: f64 = 300.0;

/// Infer the asymptotic temperature from the shape of the curve.
///
/// Splits the samples into an early and a late half and fits a rate to
/// each. Under the exponential model the rate is proportional to the
/// distance from the asymptote, so two rates at two temperatures determine
/// it: `A = (r_early·T_late − r_late·T_early) / (r_early − r_late)`.
/// This requires a decelerating rise (`r_early > r_late > 0`).
pub fn estimate_ambient_from_curve(samples: &[Sample], current_temp: f64) -> f64 {
    let inferred = infer_asymptote(samples).unwrap_or(current_temp + FALLBACK_AMBIENT_OFFSET);

    if inferred <= current_temp {
        current_temp + MIN_AMBIENT_OFFSET
    } else if inferred > MAX_PLAUSIBLE_AMBIENT {
        CAPPED_AMBIENT
    } else {
        inferred
    }
}

fn infer_asymptote(samples: &[Sample]) -> Option<f64> {
    let (early, late) = samples.split_at(samples.len() / 2);
    let r_early = slope(early)?;
    let r_late = slope(late)?;

    if !(r_early > r_late && r_late > 0.0) {
        return None;
    }

    let t_early = mean_value(early);
    let t_late = mean_value(late);
    let asymptote = (r_early * t_late - r_late * t_early) / (r_early - r_late);
    asymptote.is_finite().then_some(asymptote)
}

/// Remaining minutes until `target_temp` under the exponential model.
///
/// Returns `None` when there are too few samples in the window, when the
/// effective ambient does not exceed both the current and the target
/// temperature, when no rate constant can be derived, or when the result is
/// negative or above the configured cap. Rounded to 1 decimal.
pub fn exponential_remaining(
    samples: &[Sample],
    current_temp: f64,
    target_temp: f64,
    ambient_temp: Option<f64>,
    config: &EstimatorConfig,
) -> Option<f64> {
    let recent = trailing_window(samples, config.window);
    if recent.len() < config.min_curve_points {
        return None;
    }

    let ambient = match ambient_temp {
        Some(ambient) if ambient > current_temp => ambient,
        _ => estimate_ambient_from_curve(recent, current_temp),
    };

    // A heat source at or below the target can never bring the probe there.
    if ambient <= current_temp || ambient <= target_temp {
        return None;
    }

    let k = rate_constant(recent, ambient, config)?;

    let ratio = (ambient - target_temp) / (ambient - current_temp);
    if ratio <= 0.0 {
        return None;
    }

    let remaining = -ratio.ln() / k;
    if !(0.0..=config.max_remaining_minutes).contains(&remaining) {
        return None;
    }

    debug!(
        "Exponential fit: ambient={:.1}, k={:.4}/min, remaining={:.1}min",
        ambient, k, remaining
    );

    Some(round_to(remaining, 1))
}

/// Median rate constant over all pairs `(sample, latest)` at least
/// `min_pair_span` apart.
fn rate_constant(samples: &[Sample], ambient: f64, config: &EstimatorConfig) -> Option<f64> {
    let latest = samples.last()?;
    let min_span = config.min_pair_span.as_secs_f64() / 60.0;
    let latest_gap = ambient - latest.value;

    let mut constants: Vec<f64> = samples
        .iter()
        .filter_map(|s| {
            let dt = minutes_between(s.timestamp, latest.timestamp);
            if dt < min_span {
                return None;
            }
            let ratio = latest_gap / (ambient - s.value);
            (ratio > 0.0 && ratio < 1.0).then(|| -ratio.ln() / dt)
        })
        .collect();

    median(&mut constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    /// Samples of `A - (A - T0)·e^(-k·t)` every `step_secs` up to `until_secs`.
    fn newton(ambient: f64, start: f64, k: f64, step_secs: i64, until_secs: i64) -> Vec<Sample> {
        (0..=until_secs / step_secs)
            .map(|i| {
                let secs = i * step_secs;
                let minutes = secs as f64 / 60.0;
                let temp = ambient - (ambient - start) * (-k * minutes).exp();
                Sample::new(t0() + Duration::seconds(secs), temp)
            })
            .collect()
    }

    fn time_to(ambient: f64, start: f64, k: f64, temp: f64) -> f64 {
        -((ambient - temp) / (ambient - start)).ln() / k
    }

    #[test]
    fn test_recovers_remaining_with_known_ambient() {
        let config = EstimatorConfig::default();
        let samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;

        let expected = time_to(180.0, 20.0, 0.2, 120.0) - 3.0;
        let remaining =
            exponential_remaining(&samples, current, 120.0, Some(180.0), &config).unwrap();

        assert!((remaining - expected).abs() < 0.1, "{remaining} vs {expected}");
    }

    #[test]
    fn test_recovers_remaining_with_inferred_ambient() {
        let config = EstimatorConfig::default();
        let samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;

        let expected = time_to(180.0, 20.0, 0.2, 120.0) - 3.0;
        let remaining = exponential_remaining(&samples, current, 120.0, None, &config).unwrap();

        assert!((remaining - expected).abs() < 0.2, "{remaining} vs {expected}");
    }

    #[test]
    fn test_ambient_below_probe_is_ignored() {
        let config = EstimatorConfig::default();
        let samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;

        let with_bad_sensor =
            exponential_remaining(&samples, current, 120.0, Some(25.0), &config);
        let without_sensor = exponential_remaining(&samples, current, 120.0, None, &config);
        assert_eq!(with_bad_sensor, without_sensor);
    }

    #[test]
    fn test_infers_ambient_from_curvature() {
        let samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;
        let recent = trailing_window(&samples, std::time::Duration::from_secs(180));

        let ambient = estimate_ambient_from_curve(recent, current);
        assert!((ambient - 180.0).abs() < 2.0, "ambient {ambient}");
    }

    #[test]
    fn test_ambient_guards() {
        // Accelerating rise: no asymptote ahead
        let accelerating: Vec<Sample> = (0..20)
            .map(|i| Sample::new(t0() + Duration::seconds(i * 5), 20.0 + (i * i) as f64 * 0.1))
            .collect();
        assert_eq!(estimate_ambient_from_curve(&accelerating, 60.0), 210.0);

        // Too few points for two regressions
        assert_eq!(estimate_ambient_from_curve(&accelerating[..2], 21.0), 171.0);

        // Very weak curvature puts the asymptote far away
        let far = newton(5000.0, 20.0, 0.001, 5, 180);
        assert_eq!(estimate_ambient_from_curve(&far, 30.0), 300.0);
    }

    #[test]
    fn test_target_unreachable() {
        let config = EstimatorConfig::default();
        let samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;

        assert_eq!(
            exponential_remaining(&samples, current, 180.0, Some(180.0), &config),
            None
        );
        assert_eq!(
            exponential_remaining(&samples, current, 200.0, Some(180.0), &config),
            None
        );
    }

    #[test]
    fn test_requires_three_points() {
        let config = EstimatorConfig::default();
        let samples = newton(180.0, 20.0, 0.2, 30, 30);
        assert_eq!(samples.len(), 2);
        assert_eq!(
            exponential_remaining(&samples, samples[1].value, 60.0, Some(180.0), &config),
            None
        );
    }

    #[test]
    fn test_requires_pair_span() {
        let config = EstimatorConfig::default();
        // Three samples within 10 seconds: no pair is 15 s apart
        let samples = newton(180.0, 20.0, 0.2, 5, 10);
        let current = samples.last().unwrap().value;
        assert_eq!(
            exponential_remaining(&samples, current, 60.0, Some(180.0), &config),
            None
        );
    }

    #[test]
    fn test_median_resists_outlier() {
        let config = EstimatorConfig::default();
        let mut samples = newton(180.0, 20.0, 0.2, 5, 180);
        let current = samples.last().unwrap().value;
        let clean = exponential_remaining(&samples, current, 120.0, Some(180.0), &config).unwrap();

        samples[10].value += 15.0;
        let noisy = exponential_remaining(&samples, current, 120.0, Some(180.0), &config).unwrap();
        assert!((clean - noisy).abs() <= 0.1, "{clean} vs {noisy}");
    }

    #[test]
    fn test_cooling_curve_has_no_estimate() {
        let config = EstimatorConfig::default();
        let samples: Vec<Sample> = (0..36)
            .map(|i| Sample::new(t0() + Duration::seconds(i * 5), 60.0 - i as f64 * 0.1))
            .collect();
        let current = samples.last().unwrap().value;
        assert_eq!(
            exponential_remaining(&samples, current, 70.0, Some(180.0), &config),
            None
        );
    }
}
