//! Preference persistence.
//!
//! Preferences are loaded once when a monitor is created and saved after
//! every command that changes them. Saving happens in the background; a
//! failed save is logged and the in-memory state stays authoritative.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::CookingPreferences;
use crate::error::{Error, Result};

/// Version written alongside file-backed preferences.
pub const PREFERENCES_VERSION: u8 = 1;

/// Loads and saves [`CookingPreferences`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load stored preferences. `Ok(None)` when nothing was stored yet.
    async fn load(&self) -> Result<Option<CookingPreferences>>;

    /// Replace the stored preferences.
    async fn save(&self, preferences: &CookingPreferences) -> Result<()>;
}

/// Store that keeps preferences in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    stored: Mutex<Option<CookingPreferences>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds preferences.
    pub fn with_preferences(preferences: CookingPreferences) -> Self {
        Self {
            stored: Mutex::new(Some(preferences)),
        }
    }

    /// Get a copy of the stored preferences.
    pub fn stored(&self) -> Option<CookingPreferences> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Option<CookingPreferences>> {
        Ok(self.stored())
    }

    async fn save(&self, preferences: &CookingPreferences) -> Result<()> {
        *self.stored.lock() = Some(preferences.clone());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredPreferences {
    version: u8,
    #[serde(flatten)]
    preferences: CookingPreferences,
}

/// Store that writes preferences to a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self) -> Result<Option<CookingPreferences>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredPreferences = serde_json::from_str(&contents)?;
        if stored.version > PREFERENCES_VERSION {
            return Err(Error::Storage {
                reason: format!(
                    "{} has version {}, newest supported is {}",
                    self.path.display(),
                    stored.version,
                    PREFERENCES_VERSION
                ),
            });
        }

        debug!("Loaded preferences from {}", self.path.display());
        Ok(Some(stored.preferences))
    }

    async fn save(&self, preferences: &CookingPreferences) -> Result<()> {
        let stored = StoredPreferences {
            version: PREFERENCES_VERSION,
            preferences: preferences.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}
