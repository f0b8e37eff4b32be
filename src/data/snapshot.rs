//! Per-tick output published to the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::Sample;
use super::session::{CookingState, FoodSelection};
use crate::estimation::{EstimateSource, Trend};
use crate::utils::celsius_to_fahrenheit;

/// Everything the presentation layer needs after a tick or command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingSnapshot {
    /// Lifecycle state.
    pub state: CookingState,
    /// Whether the latest reading had a probe temperature.
    pub probe_connected: bool,
    /// Latest probe temperature in Celsius.
    pub probe_temp: Option<f64>,
    /// Latest ambient temperature in Celsius.
    pub ambient_temp: Option<f64>,
    /// Battery level in percent, passed through from the sensor.
    pub battery: Option<u8>,
    /// Signal strength in dBm, passed through from the sensor.
    pub signal_strength: Option<i16>,

    /// Desired final temperature.
    pub desired_temp: f64,
    /// Temperature at which to remove the food.
    pub withdrawal_temp: f64,
    /// Current carryover offset in degrees.
    pub carryover: f64,
    /// Whether the target was entered directly.
    pub is_manual_mode: bool,
    /// Whether dynamic carryover is applied.
    pub carryover_enabled: bool,
    /// Current food selection.
    pub food: FoodSelection,

    /// When the cook started.
    pub start_time: Option<DateTime<Utc>>,
    /// When the withdrawal temperature was reached.
    pub cooking_end_time: Option<DateTime<Utc>>,

    /// Remaining minutes until the withdrawal temperature.
    pub remaining_time: Option<f64>,
    /// How the remaining time was obtained.
    pub estimate_source: Option<EstimateSource>,
    /// Wall-clock time the food is expected to be ready.
    pub estimated_end: Option<DateTime<Utc>>,
    /// Elapsed plus remaining minutes.
    pub total_estimated: Option<f64>,
    /// Heating rate in °/min.
    pub heating_rate: Option<f64>,
    /// Percent of the way from the start temperature to the withdrawal temperature.
    pub progress: f64,
    /// Direction the probe temperature is moving in.
    pub trend: Trend,
    /// Seconds since the probe stopped reporting during a cook.
    pub disconnect_duration_secs: Option<f64>,

    /// Recent probe samples, oldest first.
    pub probe_history: Vec<Sample>,
    /// Recent ambient samples, oldest first.
    pub ambient_history: Vec<Sample>,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl CookingSnapshot {
    /// Probe temperature in Fahrenheit.
    pub fn probe_temp_fahrenheit(&self) -> Option<f64> {
        self.probe_temp.map(celsius_to_fahrenheit)
    }

    /// Ambient temperature in Fahrenheit.
    pub fn ambient_temp_fahrenheit(&self) -> Option<f64> {
        self.ambient_temp.map(celsius_to_fahrenheit)
    }

    /// Withdrawal temperature in Fahrenheit.
    pub fn withdrawal_temp_fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.withdrawal_temp)
    }

    /// Check if the cook is running.
    pub fn is_cooking(&self) -> bool {
        self.state == CookingState::Cooking
    }

    /// Check if the withdrawal temperature was reached.
    pub fn is_done(&self) -> bool {
        self.state == CookingState::Done
    }
}
