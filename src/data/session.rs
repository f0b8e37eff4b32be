//! Cooking session data structures.
//!
//! A session holds everything the lifecycle knows about the current cook:
//! the lifecycle state, the desired and withdrawal temperatures, the food
//! selection and the start/end bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::food::{self, CarryoverType, MANUAL};
use super::preferences::CookingPreferences;

/// Lifecycle state of a monitored probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingState {
    /// No probe reading is available.
    #[default]
    Disconnected,
    /// Probe is reporting but no cook is running.
    Idle,
    /// A cook is running.
    Cooking,
    /// The withdrawal temperature was reached.
    Done,
}

impl CookingState {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Idle => "idle",
            Self::Cooking => "cooking",
            Self::Done => "done",
        }
    }

    /// Check if a cook is running or finished but not yet cleared.
    pub fn has_session(&self) -> bool {
        matches!(self, Self::Cooking | Self::Done)
    }
}

impl std::fmt::Display for CookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected food, or the manual sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodSelection {
    /// Food category, e.g. `beef`.
    pub category: String,
    /// Food within the category, e.g. `steak`.
    pub food: String,
    /// Doneness level, e.g. `medium`.
    pub doneness: String,
}

impl FoodSelection {
    /// Create a selection.
    pub fn new(category: &str, food: &str, doneness: &str) -> Self {
        Self {
            category: category.to_string(),
            food: food.to_string(),
            doneness: doneness.to_string(),
        }
    }

    /// The manual sentinel selection.
    pub fn manual() -> Self {
        Self::new(MANUAL, MANUAL, MANUAL)
    }

    /// Check if this is the manual sentinel.
    pub fn is_manual(&self) -> bool {
        food::is_manual(&self.category, &self.food)
    }

    /// Carryover type of the selected food.
    pub fn carryover_type(&self) -> CarryoverType {
        food::carryover_type(&self.category, &self.food)
    }

    /// Combined `category_food` identifier, or `manual`.
    pub fn food_id(&self) -> String {
        if self.is_manual() {
            MANUAL.to_string()
        } else {
            format!("{}_{}", self.category, self.food)
        }
    }
}

impl Default for FoodSelection {
    fn default() -> Self {
        Self::new("beef", "steak", "medium")
    }
}

/// Everything the lifecycle tracks about the current cook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingSession {
    /// Random ID generated when a cook starts.
    pub session_id: Option<Uuid>,
    /// Temperature the user wants the food to end at.
    pub desired_temp: f64,
    /// Temperature at which to remove the food (desired minus carryover).
    pub withdrawal_temp: f64,
    /// Whether the target was entered directly.
    pub is_manual_mode: bool,
    /// Whether dynamic carryover compensation is applied.
    pub carryover_enabled: bool,
    /// Last manually entered temperature.
    pub manual_temp_memory: f64,
    /// Current food selection.
    pub food: FoodSelection,
    /// When the cook was started.
    pub start_time: Option<DateTime<Utc>>,
    /// Probe temperature at start.
    pub start_probe_temp: Option<f64>,
    /// Ambient temperature at start.
    pub start_ambient_temp: Option<f64>,
    /// When the withdrawal temperature was reached.
    pub cooking_end_time: Option<DateTime<Utc>>,
}

impl Default for CookingSession {
    fn default() -> Self {
        Self::from_preferences(&CookingPreferences::default())
    }
}

impl CookingSession {
    /// Build a session from persisted preferences.
    ///
    /// The withdrawal temperature starts equal to the desired temperature;
    /// carryover is applied once heating data exists.
    pub fn from_preferences(prefs: &CookingPreferences) -> Self {
        let food = if prefs.is_manual_mode {
            FoodSelection::manual()
        } else {
            prefs.food.clone()
        };

        Self {
            session_id: None,
            desired_temp: prefs.desired_temp,
            withdrawal_temp: prefs.desired_temp,
            is_manual_mode: prefs.is_manual_mode,
            carryover_enabled: prefs.carryover_enabled,
            manual_temp_memory: prefs.manual_temp,
            food,
            start_time: None,
            start_probe_temp: None,
            start_ambient_temp: None,
            cooking_end_time: None,
        }
    }

    /// Extract the persisted subset of the session.
    pub fn to_preferences(&self) -> CookingPreferences {
        CookingPreferences {
            carryover_enabled: self.carryover_enabled,
            manual_temp: self.manual_temp_memory,
            food: self.food.clone(),
            desired_temp: self.desired_temp,
            is_manual_mode: self.is_manual_mode,
        }
    }

    /// Record the start of a cook.
    pub fn begin(&mut self, now: DateTime<Utc>, probe: Option<f64>, ambient: Option<f64>) {
        self.session_id = Some(Uuid::new_v4());
        self.start_time = Some(now);
        self.start_probe_temp = probe;
        self.start_ambient_temp = ambient;
        self.cooking_end_time = None;
    }

    /// Clear all per-cook fields. Preferences are kept.
    pub fn clear_cook(&mut self) {
        self.session_id = None;
        self.start_time = None;
        self.start_probe_temp = None;
        self.start_ambient_temp = None;
        self.cooking_end_time = None;
    }

    /// Current carryover offset in degrees.
    pub fn carryover(&self) -> f64 {
        self.desired_temp - self.withdrawal_temp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cooking_state_names() {
        assert_eq!(CookingState::default(), CookingState::Disconnected);
        assert_eq!(CookingState::Cooking.to_string(), "cooking");
        assert_eq!(
            serde_json::to_string(&CookingState::Done).unwrap(),
            "\"done\""
        );
        assert!(CookingState::Done.has_session());
        assert!(!CookingState::Idle.has_session());
    }

    #[test]
    fn test_food_selection() {
        let steak = FoodSelection::default();
        assert_eq!(steak.food_id(), "beef_steak");
        assert_eq!(steak.carryover_type(), CarryoverType::BeefSteak);
        assert!(!steak.is_manual());

        let manual = FoodSelection::manual();
        assert!(manual.is_manual());
        assert_eq!(manual.food_id(), "manual");
        assert_eq!(manual.carryover_type(), CarryoverType::Other);
    }

    #[test]
    fn test_session_from_preferences() {
        let prefs = CookingPreferences {
            is_manual_mode: true,
            desired_temp: 65.0,
            manual_temp: 65.0,
            ..Default::default()
        };
        let session = CookingSession::from_preferences(&prefs);

        assert!(session.food.is_manual());
        assert_eq!(session.withdrawal_temp, 65.0);
        assert_eq!(session.carryover(), 0.0);
        assert_eq!(session.to_preferences().food, FoodSelection::manual());
    }

    #[test]
    fn test_begin_and_clear() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let mut session = CookingSession::default();
        session.begin(now, Some(21.0), Some(180.0));

        assert!(session.session_id.is_some());
        assert_eq!(session.start_time, Some(now));
        assert_eq!(session.start_probe_temp, Some(21.0));

        session.cooking_end_time = Some(now);
        session.clear_cook();
        assert_eq!(session.session_id, None);
        assert_eq!(session.start_time, None);
        assert_eq!(session.cooking_end_time, None);
        assert_eq!(session.desired_temp, 57.0);
    }
}
