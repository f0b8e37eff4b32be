//! Data structures for cooking sessions.
//!
//! This module contains the core data types: temperature samples and their
//! retention, the cooking session and its persisted preferences, the food
//! table, and the snapshot published after every tick.

pub mod food;
pub mod history;
pub mod preferences;
pub mod session;
pub mod snapshot;

pub use food::{CarryoverType, FoodEntry, FOOD_TABLE, MANUAL};
pub use history::{retention_window, RetentionWindow, Sample, SampleHistory};
pub use preferences::CookingPreferences;
pub use session::{CookingSession, CookingState, FoodSelection};
pub use snapshot::CookingSnapshot;
