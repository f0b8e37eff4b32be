// Allow derivable impls for clarity
#![allow(clippy::derivable_impls)]

//! # probe-cook-engine
//!
//! Remaining-time estimation and cooking lifecycle management for wireless
//! meat thermometer probes.
//!
//! The engine consumes periodic probe and ambient readings and answers two
//! questions for the cook: *how long until it's done?* and *when should it
//! come off the heat?*
//!
//! ## Features
//!
//! - **Remaining Time**: Exponential (Newton's law of heating) fit with linear
//!   and bootstrap fallbacks, smoothed towards the end of the cook
//! - **Dynamic Carryover**: Withdrawal temperature lowered by an amount that
//!   scales with food type, heating rate and oven temperature
//! - **Event Detection**: Confirmed-rise gating and probe-removal (drop) resets
//! - **Lifecycle**: Disconnected / Idle / Cooking / Done state machine with
//!   "almost done", "done" and disconnect notifications
//! - **Preferences**: Target, food and carryover choices persisted through a
//!   pluggable store
//! - **Multi-probe Support**: Manage up to 8 independent monitors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use probe_cook_engine::{
//!     CookingManager, EngineConfig, LogNotifier, MemoryPreferenceStore, Result, SensorReading,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = CookingManager::new();
//!     let monitor = manager
//!         .register(
//!             "brisket",
//!             EngineConfig::default(),
//!             Arc::new(MemoryPreferenceStore::new()),
//!             Arc::new(LogNotifier),
//!         )
//!         .await?;
//!
//!     monitor.set_food("beef", "steak", "medium")?;
//!     monitor.ingest(SensorReading::new(chrono::Utc::now(), 21.5).with_ambient(160.0));
//!     monitor.start()?;
//!
//!     // Feed a reading every few seconds...
//!     let snapshot = monitor.ingest(SensorReading::new(chrono::Utc::now(), 22.0).with_ambient(162.0));
//!     if let Some(minutes) = snapshot.remaining_time {
//!         println!("Pull at {:.1}°C in about {:.0} min", snapshot.withdrawal_temp, minutes);
//!     }
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Units
//!
//! All temperatures are degrees Celsius and all durations handed to or
//! returned from estimators are minutes. Fahrenheit helpers are provided for
//! display.

// Public modules
pub mod carryover;
pub mod config;
pub mod data;
pub mod error;
pub mod estimation;
pub mod lifecycle;
pub mod manager;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod utils;

// Re-exports for convenience
pub use config::{CarryoverConfig, EngineConfig, EstimatorConfig, NotificationConfig};
pub use error::{Error, Result};
pub use lifecycle::{CookingLifecycle, Effect, SensorReading};
pub use manager::{CookingManager, MAX_PROBES};
pub use monitor::{CallbackHandle, CookingMonitor, SensorSource};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier};
pub use storage::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use utils::{celsius_to_fahrenheit, fahrenheit_to_celsius};

// Re-export commonly used types from submodules
pub use carryover::{dynamic_carryover, withdrawal_temperature};
pub use data::{
    CarryoverType, CookingPreferences, CookingSession, CookingSnapshot, CookingState,
    FoodSelection, Sample, SampleHistory,
};
pub use estimation::{
    Estimate, EstimateContext, EstimateSource, Estimator, EstimatorState, Strategy, Trend,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<CookingManager>();
        let _ = std::any::TypeId::of::<CookingMonitor>();
        let _ = std::any::TypeId::of::<CookingLifecycle>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<CookingSnapshot>();
        let _ = std::any::TypeId::of::<EstimatorState>();
        let _ = std::any::TypeId::of::<SampleHistory>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }
}
