//! Dynamic carryover compensation.
//!
//! Food keeps rising in temperature after it leaves the heat. The faster it
//! was heating, the larger the food and the hotter the oven, the more it
//! rises. The withdrawal temperature is the desired temperature lowered by
//! that expected rise.

use tracing::debug;

use crate::config::CarryoverConfig;
use crate::data::food::CarryoverType;

/// Expected carryover in degrees, in `[0, max_carryover]`.
///
/// Zero when compensation is disabled or the heating rate is unknown or not
/// positive. The ambient factor only applies when an ambient reading above
/// the threshold exists.
pub fn dynamic_carryover(
    enabled: bool,
    heating_rate: Option<f64>,
    carryover_type: CarryoverType,
    ambient_temp: Option<f64>,
    config: &CarryoverConfig,
) -> f64 {
    if !enabled {
        return 0.0;
    }

    let rate = match heating_rate {
        Some(rate) if rate > 0.0 => rate,
        _ => return 0.0,
    };

    let rate_factor =
        (rate / config.reference_rate).clamp(config.min_rate_factor, config.max_rate_factor);
    let type_weight = carryover_type.weight();
    let ambient_factor = match ambient_temp {
        Some(ambient) if ambient > config.ambient_threshold => (0.5 + ambient / config.ambient_divisor)
            .clamp(config.min_ambient_factor, config.max_ambient_factor),
        _ => 1.0,
    };

    let carryover = (config.base_multiplier * rate_factor * type_weight * ambient_factor)
        .clamp(0.0, config.max_carryover);

    debug!(
        "Carryover {:.2}: rate_factor={:.2}, type={:?} ({:.1}), ambient_factor={:.2}",
        carryover, rate_factor, carryover_type, type_weight, ambient_factor
    );

    carryover
}

/// Desired temperature lowered by the carryover, never below the configured
/// minimum nor above the desired temperature.
pub fn withdrawal_temperature(desired_temp: f64, carryover: f64, config: &CarryoverConfig) -> f64 {
    (desired_temp - carryover.max(0.0))
        .max(config.min_withdrawal_temp)
        .min(desired_temp.max(config.min_withdrawal_temp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_TYPES: [CarryoverType; 10] = [
        CarryoverType::BeefRoast,
        CarryoverType::BeefSteak,
        CarryoverType::PorkRoast,
        CarryoverType::PorkOther,
        CarryoverType::Poultry,
        CarryoverType::Fish,
        CarryoverType::LambRoast,
        CarryoverType::LambOther,
        CarryoverType::Veal,
        CarryoverType::Other,
    ];

    #[test]
    fn test_disabled_or_no_rate() {
        let config = CarryoverConfig::default();
        let steak = CarryoverType::BeefSteak;

        assert_eq!(dynamic_carryover(false, Some(1.0), steak, None, &config), 0.0);
        assert_eq!(dynamic_carryover(true, None, steak, None, &config), 0.0);
        assert_eq!(dynamic_carryover(true, Some(0.0), steak, None, &config), 0.0);
        assert_eq!(dynamic_carryover(true, Some(-2.0), steak, None, &config), 0.0);
    }

    #[test]
    fn test_steak_at_reference_rate() {
        let config = CarryoverConfig::default();
        let carryover = dynamic_carryover(true, Some(1.0), CarryoverType::BeefSteak, None, &config);
        assert!((carryover - 1.6).abs() < 1e-9);
        assert!((withdrawal_temperature(57.0, carryover, &config) - 55.4).abs() < 1e-9);
    }

    #[test]
    fn test_ambient_factor() {
        let config = CarryoverConfig::default();
        let other = CarryoverType::Other;

        // Below the threshold the ambient is ignored
        assert_eq!(dynamic_carryover(true, Some(1.0), other, Some(90.0), &config), 2.0);
        // 0.5 + 200/400 = 1.0
        assert_eq!(dynamic_carryover(true, Some(1.0), other, Some(200.0), &config), 2.0);
        // 0.5 + 300/400 = 1.25
        assert!((dynamic_carryover(true, Some(1.0), other, Some(300.0), &config) - 2.5).abs() < 1e-9);
        // Capped at 1.5
        assert_eq!(dynamic_carryover(true, Some(1.0), other, Some(1000.0), &config), 3.0);
    }

    #[test]
    fn test_rate_factor_bounds() {
        let config = CarryoverConfig::default();
        let other = CarryoverType::Other;

        assert!((dynamic_carryover(true, Some(0.05), other, None, &config) - 0.6).abs() < 1e-9);
        assert_eq!(dynamic_carryover(true, Some(10.0), other, None, &config), 6.0);
        assert_eq!(
            dynamic_carryover(true, Some(10.0), CarryoverType::BeefRoast, Some(400.0), &config),
            8.0
        );
    }

    #[test]
    fn test_withdrawal_floor() {
        let config = CarryoverConfig::default();
        assert_eq!(withdrawal_temperature(33.0, 8.0, &config), 30.0);
        assert_eq!(withdrawal_temperature(57.0, 0.0, &config), 57.0);
    }

    proptest! {
        #[test]
        fn prop_carryover_bounds(
            enabled in any::<bool>(),
            rate in proptest::option::of(-50.0f64..50.0),
            ambient in proptest::option::of(-50.0f64..600.0),
            type_index in 0usize..ALL_TYPES.len(),
            desired in 30.0f64..300.0,
        ) {
            let config = CarryoverConfig::default();
            let carryover = dynamic_carryover(enabled, rate, ALL_TYPES[type_index], ambient, &config);
            prop_assert!((0.0..=8.0).contains(&carryover));

            let withdrawal = withdrawal_temperature(desired, carryover, &config);
            prop_assert!(withdrawal >= 30.0);
            prop_assert!(withdrawal <= desired);
        }
    }
}
