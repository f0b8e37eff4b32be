//! Registry of independent cooking monitors.
//!
//! Each monitored probe gets its own [`CookingMonitor`] with its own
//! lifecycle and estimator state; nothing is shared between them.

use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::monitor::CookingMonitor;
use crate::notify::Notifier;
use crate::storage::PreferenceStore;

/// Maximum number of probes that can be monitored simultaneously.
pub const MAX_PROBES: usize = 8;

/// Keeps up to [`MAX_PROBES`] monitors keyed by name.
#[derive(Debug, Default)]
pub struct CookingManager {
    monitors: RwLock<HashMap<String, Arc<CookingMonitor>>>,
}

impl CookingManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a monitor for a probe.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaxProbesReached`] when the manager is full,
    /// [`Error::InvalidParameter`] when the name is taken, and any error
    /// from [`CookingMonitor::new`].
    pub async fn register(
        &self,
        name: &str,
        config: EngineConfig,
        store: Arc<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Arc<CookingMonitor>> {
        self.check_capacity(name)?;

        let monitor = Arc::new(CookingMonitor::new(name, config, store, notifier).await?);

        // Re-check: another register may have completed while awaiting.
        let mut monitors = self.monitors.write();
        if monitors.contains_key(name) {
            return Err(Error::invalid_parameter("name", name));
        }
        if monitors.len() >= MAX_PROBES {
            warn!("Maximum probe count ({}) reached, rejecting {}", MAX_PROBES, name);
            return Err(Error::MaxProbesReached { max: MAX_PROBES });
        }
        monitors.insert(name.to_string(), monitor.clone());

        info!("Registered monitor {}", name);
        Ok(monitor)
    }

    fn check_capacity(&self, name: &str) -> Result<()> {
        let monitors = self.monitors.read();
        if monitors.contains_key(name) {
            return Err(Error::invalid_parameter("name", name));
        }
        if monitors.len() >= MAX_PROBES {
            warn!("Maximum probe count ({}) reached, rejecting {}", MAX_PROBES, name);
            return Err(Error::MaxProbesReached { max: MAX_PROBES });
        }
        Ok(())
    }

    /// Get a monitor by name.
    pub fn get(&self, name: &str) -> Option<Arc<CookingMonitor>> {
        self.monitors.read().get(name).cloned()
    }

    /// Get a monitor by name, or an error if it does not exist.
    pub fn require(&self, name: &str) -> Result<Arc<CookingMonitor>> {
        self.get(name).ok_or_else(|| Error::ProbeNotFound {
            identifier: name.to_string(),
        })
    }

    /// Remove a monitor and shut it down.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let monitor = self
            .monitors
            .write()
            .remove(name)
            .ok_or_else(|| Error::ProbeNotFound {
                identifier: name.to_string(),
            })?;

        monitor.shutdown().await;
        info!("Removed monitor {}", name);
        Ok(())
    }

    /// All monitors.
    pub fn monitors(&self) -> Vec<Arc<CookingMonitor>> {
        self.monitors.read().values().cloned().collect()
    }

    /// Monitor names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.monitors.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of monitors.
    pub fn len(&self) -> usize {
        self.monitors.read().len()
    }

    /// Check if no monitors are registered.
    pub fn is_empty(&self) -> bool {
        self.monitors.read().is_empty()
    }

    /// Shut down and remove every monitor.
    pub async fn shutdown(&self) {
        info!("Shutting down cooking manager");

        let monitors: Vec<_> = self.monitors.write().drain().map(|(_, m)| m).collect();
        join_all(monitors.iter().map(|m| m.shutdown())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CookingState;
    use crate::lifecycle::SensorReading;
    use crate::notify::LogNotifier;
    use crate::storage::MemoryPreferenceStore;
    use chrono::Utc;

    async fn register(manager: &CookingManager, name: &str) -> Result<Arc<CookingMonitor>> {
        manager
            .register(
                name,
                EngineConfig::default(),
                Arc::new(MemoryPreferenceStore::new()),
                Arc::new(LogNotifier),
            )
            .await
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let manager = CookingManager::new();
        register(&manager, "brisket").await.unwrap();
        register(&manager, "ribs").await.unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.names(), vec!["brisket", "ribs"]);
        assert!(manager.get("brisket").is_some());
        assert!(matches!(
            manager.require("wings"),
            Err(Error::ProbeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let manager = CookingManager::new();
        register(&manager, "brisket").await.unwrap();
        assert!(matches!(
            register(&manager, "brisket").await,
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_max_probes() {
        let manager = CookingManager::new();
        for i in 0..MAX_PROBES {
            register(&manager, &format!("probe-{i}")).await.unwrap();
        }
        assert!(matches!(
            register(&manager, "one-too-many").await,
            Err(Error::MaxProbesReached { max: MAX_PROBES })
        ));
    }

    #[tokio::test]
    async fn test_monitors_are_independent() {
        let manager = CookingManager::new();
        let a = register(&manager, "a").await.unwrap();
        let b = register(&manager, "b").await.unwrap();

        a.ingest(SensorReading::new(Utc::now(), 20.0));
        a.start().unwrap();
        b.ingest(SensorReading::new(Utc::now(), 20.0));

        assert_eq!(a.state(), CookingState::Cooking);
        assert_eq!(b.state(), CookingState::Idle);
    }

    #[tokio::test]
    async fn test_remove_and_shutdown() {
        let manager = CookingManager::new();
        register(&manager, "a").await.unwrap();
        register(&manager, "b").await.unwrap();

        manager.remove("a").await.unwrap();
        assert!(manager.remove("a").await.is_err());
        assert_eq!(manager.len(), 1);

        manager.shutdown().await;
        assert!(manager.is_empty());
    }
}
