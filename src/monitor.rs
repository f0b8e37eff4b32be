//! Async driver for one cooking lifecycle.
//!
//! A [`CookingMonitor`] owns a [`CookingLifecycle`] behind a lock and feeds
//! it from two places: a periodic poll of a [`SensorSource`] and
//! event-driven [`CookingMonitor::ingest`] calls. Both go through the same
//! locked update path, so ticks for one probe never run concurrently.
//!
//! Snapshots are broadcast to subscribers after every tick and command.
//! Notifications and preference saves are handed to a background
//! dispatcher; the tick never waits for them and their failures are only
//! logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::data::{CookingPreferences, CookingSnapshot, CookingState};
use crate::error::Result;
use crate::lifecycle::{CookingLifecycle, Effect, SensorReading};
use crate::notify::Notifier;
use crate::storage::PreferenceStore;

/// Callback handle for unregistering callbacks.
///
/// Dropping the handle unregisters the callback.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// Source of periodic sensor readings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Read the current sensor values.
    async fn read(&self) -> Result<SensorReading>;
}

/// State shared between the monitor and its background tasks.
struct Shared {
    name: String,
    lifecycle: Mutex<CookingLifecycle>,
    snapshot_tx: broadcast::Sender<CookingSnapshot>,
    effect_tx: Mutex<Option<mpsc::UnboundedSender<Effect>>>,
}

impl Shared {
    /// Run `f` on the lifecycle, then publish its effects and snapshot.
    fn update<F>(&self, f: F) -> Result<CookingSnapshot>
    where
        F: FnOnce(&mut CookingLifecycle) -> Result<CookingSnapshot>,
    {
        let (result, effects) = {
            let mut lifecycle = self.lifecycle.lock();
            let result = f(&mut lifecycle);
            (result, lifecycle.take_effects())
        };

        self.dispatch(effects);
        let snapshot = result?;
        let _ = self.snapshot_tx.send(snapshot.clone());
        Ok(snapshot)
    }

    fn ingest(&self, reading: SensorReading) -> CookingSnapshot {
        let (snapshot, effects) = {
            let mut lifecycle = self.lifecycle.lock();
            let snapshot = lifecycle.tick(reading);
            (snapshot, lifecycle.take_effects())
        };

        self.dispatch(effects);
        let _ = self.snapshot_tx.send(snapshot.clone());
        snapshot
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        match self.effect_tx.lock().as_ref() {
            Some(tx) => {
                for effect in effects {
                    let _ = tx.send(effect);
                }
            }
            None => debug!("[{}] Monitor shut down, dropping {} effects", self.name, effects.len()),
        }
    }
}

/// Drives one [`CookingLifecycle`] from sensor readings and host commands.
pub struct CookingMonitor {
    shared: Arc<Shared>,
    tick_interval: std::time::Duration,
    callback_counter: AtomicU64,
    poll_handle: RwLock<Option<JoinHandle<()>>>,
    dispatcher_handle: RwLock<Option<JoinHandle<()>>>,
    is_running: Arc<AtomicBool>,
}

impl CookingMonitor {
    /// Create a monitor.
    ///
    /// Loads preferences from `store`; a failed load is logged and defaults
    /// are used. Starts the background effect dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub async fn new(
        name: impl Into<String>,
        config: EngineConfig,
        store: Arc<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();

        let preferences = match store.load().await {
            Ok(Some(preferences)) => {
                info!("[{}] Loaded stored preferences", name);
                preferences.sanitized()
            }
            Ok(None) => {
                info!("[{}] No stored preferences, using defaults", name);
                CookingPreferences::default()
            }
            Err(e) => {
                warn!("[{}] Failed to load preferences, using defaults: {}", name, e);
                CookingPreferences::default()
            }
        };

        let tick_interval = config.tick_interval;
        let lifecycle = CookingLifecycle::new(config, &preferences)?;
        let (snapshot_tx, _) = broadcast::channel(64);
        let (effect_tx, effect_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            name: name.clone(),
            lifecycle: Mutex::new(lifecycle),
            snapshot_tx,
            effect_tx: Mutex::new(Some(effect_tx)),
        });

        let dispatcher = tokio::spawn(Self::dispatch_effects(name, effect_rx, store, notifier));

        Ok(Self {
            shared,
            tick_interval,
            callback_counter: AtomicU64::new(0),
            poll_handle: RwLock::new(None),
            dispatcher_handle: RwLock::new(Some(dispatcher)),
            is_running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the monitor name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> CookingState {
        self.shared.lifecycle.lock().state()
    }

    /// Current preferences.
    pub fn preferences(&self) -> CookingPreferences {
        self.shared.lifecycle.lock().preferences()
    }

    /// Build a snapshot without processing a reading.
    pub fn snapshot(&self) -> CookingSnapshot {
        self.shared.lifecycle.lock().snapshot(Utc::now())
    }

    /// Process a reading delivered by the host.
    pub fn ingest(&self, reading: SensorReading) -> CookingSnapshot {
        self.shared.ingest(reading)
    }

    /// Start a cook.
    pub fn start(&self) -> Result<CookingSnapshot> {
        self.command(|lifecycle, now| lifecycle.start(now))
    }

    /// Stop the cook.
    pub fn stop(&self) -> Result<CookingSnapshot> {
        self.command(|lifecycle, now| lifecycle.stop(now))
    }

    /// Set the target temperature directly (manual mode).
    pub fn set_target_temp(&self, temperature: f64) -> Result<CookingSnapshot> {
        self.command(|lifecycle, now| lifecycle.set_target_temp(temperature, now))
    }

    /// Select a food and doneness.
    pub fn set_food(&self, category: &str, food: &str, doneness: &str) -> Result<CookingSnapshot> {
        self.command(|lifecycle, now| lifecycle.set_food(category, food, doneness, now))
    }

    /// Enable or disable carryover compensation.
    pub fn set_carryover_enabled(&self, enabled: bool) -> Result<CookingSnapshot> {
        self.command(|lifecycle, now| lifecycle.set_carryover_enabled(enabled, now))
    }

    fn command<F>(&self, f: F) -> Result<CookingSnapshot>
    where
        F: FnOnce(&mut CookingLifecycle, DateTime<Utc>) -> Result<CookingSnapshot>,
    {
        self.shared.update(|lifecycle| f(lifecycle, Utc::now()))
    }

    /// Subscribe to snapshots.
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<CookingSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// Register a callback for every published snapshot.
    pub fn on_snapshot_updated<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&CookingSnapshot) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.shared.snapshot_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(snapshot) => callback(&snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Snapshot callback lagged, skipped {}", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Start polling `source` every tick interval.
    pub fn start_polling(&self, source: Arc<dyn SensorSource>) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            debug!("[{}] Already polling", self.name());
            return;
        }

        info!(
            "[{}] Polling sensors every {:?}",
            self.name(),
            self.tick_interval
        );

        let shared = self.shared.clone();
        let is_running = self.is_running.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while is_running.load(Ordering::SeqCst) {
                interval.tick().await;

                let reading = match source.read().await {
                    Ok(reading) => reading,
                    Err(e) => {
                        warn!("[{}] Sensor read failed: {}", shared.name, e);
                        SensorReading::disconnected(Utc::now())
                    }
                };
                shared.ingest(reading);
            }

            debug!("[{}] Polling task ended", shared.name);
        });

        *self.poll_handle.write() = Some(handle);
    }

    /// Stop polling. Commands and [`ingest`](Self::ingest) keep working.
    pub async fn stop_polling(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("[{}] Stopping sensor polling", self.name());

        let handle = self.poll_handle.write().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// Check if the poll loop is running.
    pub fn is_polling(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Stop polling, deliver pending effects and stop the dispatcher.
    ///
    /// Effects raised after shutdown are dropped.
    pub async fn shutdown(&self) {
        info!("[{}] Shutting down monitor", self.name());
        self.stop_polling().await;

        // Closing the channel lets the dispatcher drain and exit.
        self.shared.effect_tx.lock().take();

        let handle = self.dispatcher_handle.write().take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("[{}] Effect dispatcher ended abnormally", self.name());
            }
        }
    }

    async fn dispatch_effects(
        name: String,
        mut rx: mpsc::UnboundedReceiver<Effect>,
        store: Arc<dyn PreferenceStore>,
        notifier: Arc<dyn Notifier>,
    ) {
        while let Some(effect) = rx.recv().await {
            match effect {
                Effect::Notify(notification) => {
                    if let Err(e) = notifier.notify(&notification).await {
                        error!(
                            "[{}] Failed to send {} notification: {}",
                            name, notification.kind, e
                        );
                    }
                }
                Effect::SavePreferences(preferences) => {
                    if let Err(e) = store.save(&preferences).await {
                        error!("[{}] Failed to save preferences: {}", name, e);
                    }
                }
            }
        }

        debug!("[{}] Effect dispatcher ended", name);
    }
}

impl Drop for CookingMonitor {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.poll_handle.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.dispatcher_handle.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for CookingMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookingMonitor")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::notify::{MockNotifier, NotificationKind};
    use crate::storage::{MemoryPreferenceStore, MockPreferenceStore};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn quiet_notifier() -> Arc<MockNotifier> {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_| Ok(()));
        Arc::new(notifier)
    }

    async fn monitor_with(store: Arc<dyn PreferenceStore>) -> CookingMonitor {
        CookingMonitor::new("test", EngineConfig::default(), store, quiet_notifier())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = EngineConfig::default().with_tick_interval(Duration::ZERO);
        let result = CookingMonitor::new(
            "bad",
            config,
            Arc::new(MemoryPreferenceStore::new()),
            quiet_notifier(),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[tokio::test]
    async fn test_loads_stored_preferences() {
        let stored = CookingPreferences {
            desired_temp: 63.0,
            ..Default::default()
        };
        let monitor = monitor_with(Arc::new(MemoryPreferenceStore::with_preferences(stored))).await;
        assert_eq!(monitor.preferences().desired_temp, 63.0);
    }

    #[tokio::test]
    async fn test_failed_load_uses_defaults() {
        let mut store = MockPreferenceStore::new();
        store.expect_load().returning(|| {
            Err(Error::Storage {
                reason: "unavailable".to_string(),
            })
        });
        store.expect_save().returning(|_| Ok(()));

        let monitor = monitor_with(Arc::new(store)).await;
        assert_eq!(monitor.preferences(), CookingPreferences::default());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_state() {
        let mut store = MockPreferenceStore::new();
        store.expect_load().returning(|| Ok(None));
        let (saved_tx, mut saved_rx) = mpsc::unbounded_channel();
        store.expect_save().returning(move |_| {
            let _ = saved_tx.send(());
            Err(Error::Storage {
                reason: "disk full".to_string(),
            })
        });

        let monitor = monitor_with(Arc::new(store)).await;
        monitor.set_target_temp(70.0).unwrap();

        timeout(WAIT, saved_rx.recv()).await.unwrap().unwrap();
        assert_eq!(monitor.preferences().desired_temp, 70.0);
        assert!(monitor.preferences().is_manual_mode);
    }

    #[tokio::test]
    async fn test_commands_save_preferences() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let monitor = monitor_with(store.clone()).await;

        monitor.set_food("pork", "chop", "medium").unwrap();

        timeout(WAIT, async {
            while store.stored().is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(store.stored().unwrap().desired_temp, 63.0);
    }

    #[tokio::test]
    async fn test_shutdown_delivers_pending_saves() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let monitor = monitor_with(store.clone()).await;

        monitor.set_target_temp(68.0).unwrap();
        monitor.shutdown().await;
        assert_eq!(store.stored().unwrap().desired_temp, 68.0);

        // After shutdown commands still apply but nothing is saved.
        monitor.set_target_temp(70.0).unwrap();
        assert_eq!(monitor.preferences().desired_temp, 70.0);
        assert_eq!(store.stored().unwrap().desired_temp, 68.0);
    }

    #[tokio::test]
    async fn test_invalid_command_is_rejected() {
        let monitor = monitor_with(Arc::new(MemoryPreferenceStore::new())).await;
        assert!(matches!(monitor.start(), Err(Error::InvalidState { .. })));
        assert!(matches!(monitor.stop(), Err(Error::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_ingest_publishes_snapshot() {
        let monitor = monitor_with(Arc::new(MemoryPreferenceStore::new())).await;
        let mut rx = monitor.subscribe_snapshots();

        monitor.ingest(SensorReading::new(Utc::now(), 22.5));

        let snapshot = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(snapshot.state, CookingState::Idle);
        assert_eq!(snapshot.probe_temp, Some(22.5));
    }

    #[tokio::test]
    async fn test_done_notification_dispatched() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(move |notification| {
                let _ = sent_tx.send(notification.kind);
                Ok(())
            });

        let monitor = CookingMonitor::new(
            "done",
            EngineConfig::default(),
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(notifier),
        )
        .await
        .unwrap();

        let now = Utc::now();
        monitor.ingest(SensorReading::new(now, 50.0));
        monitor.start().unwrap();
        monitor.ingest(SensorReading::new(now + chrono::Duration::seconds(5), 58.0));

        let kind = timeout(WAIT, sent_rx.recv()).await.unwrap().unwrap();
        assert_eq!(kind, NotificationKind::Done);
        assert_eq!(monitor.state(), CookingState::Done);
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_callback() {
        let monitor = monitor_with(Arc::new(MemoryPreferenceStore::new())).await;
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        let handle = monitor.on_snapshot_updated(move |snapshot| {
            let _ = seen_tx.send(snapshot.probe_temp);
        });
        tokio::task::yield_now().await;

        monitor.ingest(SensorReading::new(Utc::now(), 30.0));
        let seen = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
        assert_eq!(seen, Some(30.0));

        handle.unregister();
    }

    #[tokio::test]
    async fn test_polling() {
        let mut source = MockSensorSource::new();
        source
            .expect_read()
            .returning(|| Ok(SensorReading::new(Utc::now(), 24.0).with_ambient(150.0)));

        let config = EngineConfig::default().with_tick_interval(Duration::from_millis(10));
        let monitor = CookingMonitor::new(
            "poll",
            config,
            Arc::new(MemoryPreferenceStore::new()),
            quiet_notifier(),
        )
        .await
        .unwrap();
        let mut rx = monitor.subscribe_snapshots();

        monitor.start_polling(Arc::new(source));
        assert!(monitor.is_polling());

        let snapshot = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(snapshot.ambient_temp, Some(150.0));
        assert_eq!(monitor.state(), CookingState::Idle);

        monitor.stop_polling().await;
        assert!(!monitor.is_polling());
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_polling_read_failure_counts_as_disconnected() {
        let mut source = MockSensorSource::new();
        source.expect_read().returning(|| {
            Err(Error::Internal("sensor offline".to_string()))
        });

        let config = EngineConfig::default().with_tick_interval(Duration::from_millis(10));
        let monitor = CookingMonitor::new(
            "offline",
            config,
            Arc::new(MemoryPreferenceStore::new()),
            quiet_notifier(),
        )
        .await
        .unwrap();
        let mut rx = monitor.subscribe_snapshots();
        monitor.start_polling(Arc::new(source));

        let snapshot = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(!snapshot.probe_connected);
        assert_eq!(snapshot.state, CookingState::Disconnected);
        monitor.shutdown().await;
    }
}
