//! Persisted user preferences.
//!
//! The small record written to the preference store after every command
//! that changes it, and read back at startup. Field names on the wire are
//! stable storage keys.

use serde::{Deserialize, Serialize};

use super::session::FoodSelection;

/// Default manual temperature in Celsius.
pub const DEFAULT_MANUAL_TEMP: f64 = 60.0;

/// Default desired temperature (beef steak, medium).
pub const DEFAULT_DESIRED_TEMP: f64 = 57.0;

/// User preferences that survive a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookingPreferences {
    /// Whether dynamic carryover compensation is applied.
    #[serde(rename = "carryover_compensation_enabled")]
    pub carryover_enabled: bool,
    /// Last manually entered temperature.
    pub manual_temp: f64,
    /// Last food selection.
    #[serde(flatten)]
    pub food: FoodSelection,
    /// Last desired temperature.
    pub desired_temp: f64,
    /// Whether the target was entered directly.
    pub is_manual_mode: bool,
}

impl Default for CookingPreferences {
    fn default() -> Self {
        Self {
            carryover_enabled: true,
            manual_temp: DEFAULT_MANUAL_TEMP,
            food: FoodSelection::default(),
            desired_temp: DEFAULT_DESIRED_TEMP,
            is_manual_mode: false,
        }
    }
}

impl CookingPreferences {
    /// Create preferences with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace out-of-range temperatures with defaults.
    ///
    /// Stored data may come from an older or hand-edited file.
    pub fn sanitized(mut self) -> Self {
        if !is_plausible_temp(self.manual_temp) {
            self.manual_temp = DEFAULT_MANUAL_TEMP;
        }
        if !is_plausible_temp(self.desired_temp) {
            self.desired_temp = DEFAULT_DESIRED_TEMP;
        }
        self
    }
}

fn is_plausible_temp(value: f64) -> bool {
    (30.0..=300.0).contains(&value)
}
