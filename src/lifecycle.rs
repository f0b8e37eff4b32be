//! Cooking lifecycle state machine.
//!
//! One [`CookingLifecycle`] owns everything about one monitored probe: the
//! state, the session, both sample histories and the estimator state. It is
//! driven by [`CookingLifecycle::tick`] and by the command methods, all of
//! which are synchronous and never await. Side effects (notifications,
//! preference saves) are queued as [`Effect`]s for the caller to dispatch.
//!
//! ```text
//! Disconnected ──probe seen──▶ Idle ──start()──▶ Cooking ──withdrawal reached──▶ Done
//!      ▲                        │                  │                               │
//!      └────probe lost──────────┘                  └───────────stop()──────────────┤
//!      ▲                                                                            │
//!      └──────────────────────probe lost (full reset)──────────────────────────────┘
//! ```
//!
//! A probe lost during `Cooking` does not leave `Cooking`; a disconnect
//! timer runs instead.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::carryover::{dynamic_carryover, withdrawal_temperature};
use crate::config::EngineConfig;
use crate::data::food;
use crate::data::{
    retention_window, CookingPreferences, CookingSession, CookingSnapshot, CookingState,
    FoodSelection, SampleHistory,
};
use crate::error::{Error, Result};
use crate::estimation::{
    heating_rate, heating_trend, Estimate, EstimateContext, EstimateSource, Estimator,
    EstimatorState,
};
use crate::notify::{Notification, NotificationKind};
use crate::utils::{minutes_between, seconds_between};

/// Lowest manual target temperature accepted.
pub const MIN_TARGET_TEMP: f64 = 30.0;

/// Highest manual target temperature accepted.
pub const MAX_TARGET_TEMP: f64 = 300.0;

/// One reading delivered by the host.
///
/// `None` temperatures mean the sensor is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Probe temperature in Celsius.
    pub probe_temp: Option<f64>,
    /// Ambient temperature in Celsius.
    pub ambient_temp: Option<f64>,
    /// Battery level in percent.
    pub battery: Option<u8>,
    /// Signal strength in dBm.
    pub signal_strength: Option<i16>,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// Reading with a probe temperature only.
    pub fn new(timestamp: DateTime<Utc>, probe_temp: f64) -> Self {
        Self {
            probe_temp: Some(probe_temp),
            ambient_temp: None,
            battery: None,
            signal_strength: None,
            timestamp,
        }
    }

    /// Reading with no sensor available.
    pub fn disconnected(timestamp: DateTime<Utc>) -> Self {
        Self {
            probe_temp: None,
            ambient_temp: None,
            battery: None,
            signal_strength: None,
            timestamp,
        }
    }

    /// Set the ambient temperature.
    pub fn with_ambient(mut self, ambient_temp: f64) -> Self {
        self.ambient_temp = Some(ambient_temp);
        self
    }

    /// Set the battery level.
    pub fn with_battery(mut self, battery: u8) -> Self {
        self.battery = Some(battery);
        self
    }

    /// Set the signal strength.
    pub fn with_signal_strength(mut self, signal_strength: i16) -> Self {
        self.signal_strength = Some(signal_strength);
        self
    }

    /// Same sensor values at a different time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check if the probe reported a temperature.
    pub fn probe_connected(&self) -> bool {
        self.probe_temp.is_some()
    }
}

/// Side effect requested by the lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver a notification.
    Notify(Notification),
    /// Persist the preferences.
    SavePreferences(CookingPreferences),
}

/// One-shot notification bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct NotificationFlags {
    before_done_sent: bool,
    done_sent: bool,
    disconnect_since: Option<DateTime<Utc>>,
    last_disconnect_notice: Option<DateTime<Utc>>,
}

/// State machine for one monitored probe.
#[derive(Debug, Clone)]
pub struct CookingLifecycle {
    config: EngineConfig,
    estimator: Estimator,
    state: CookingState,
    session: CookingSession,
    estimator_state: EstimatorState,
    probe_history: SampleHistory,
    ambient_history: SampleHistory,
    last_reading: Option<SensorReading>,
    estimate: Option<Estimate>,
    flags: NotificationFlags,
    effects: Vec<Effect>,
}

impl CookingLifecycle {
    /// Create a lifecycle from configuration and stored preferences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the configuration does not
    /// validate.
    pub fn new(config: EngineConfig, preferences: &CookingPreferences) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: Estimator::new(config.estimator.clone()),
            config,
            state: CookingState::Disconnected,
            session: CookingSession::from_preferences(preferences),
            estimator_state: EstimatorState::new(),
            probe_history: SampleHistory::new(),
            ambient_history: SampleHistory::new(),
            last_reading: None,
            estimate: None,
            flags: NotificationFlags::default(),
            effects: Vec::new(),
        })
    }

    /// Get the lifecycle state.
    pub fn state(&self) -> CookingState {
        self.state
    }

    /// Get the session.
    pub fn session(&self) -> &CookingSession {
        &self.session
    }

    /// Get the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the estimator state.
    pub fn estimator_state(&self) -> &EstimatorState {
        &self.estimator_state
    }

    /// Get the probe history.
    pub fn probe_history(&self) -> &SampleHistory {
        &self.probe_history
    }

    /// Get the ambient history.
    pub fn ambient_history(&self) -> &SampleHistory {
        &self.ambient_history
    }

    /// Get the most recent reading.
    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last_reading.as_ref()
    }

    /// Current persisted preferences.
    pub fn preferences(&self) -> CookingPreferences {
        self.session.to_preferences()
    }

    /// Take all queued side effects.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Process one reading and publish the result.
    pub fn tick(&mut self, reading: SensorReading) -> CookingSnapshot {
        let now = reading.timestamp;
        self.last_reading = Some(reading);

        self.update_state(&reading);

        let recorded = match reading.probe_temp {
            Some(probe) => self.record(now, probe, reading.ambient_temp),
            None => false,
        };

        self.estimate = match (self.state, reading.probe_temp) {
            (CookingState::Cooking, Some(probe)) if recorded => {
                self.update_withdrawal();
                self.evaluate(now, probe, reading.ambient_temp)
            }
            (CookingState::Cooking, Some(_)) => {
                debug!("Reading at {} is older than the history, keeping estimate", now);
                self.estimate
            }
            (CookingState::Cooking, None) => {
                self.update_withdrawal();
                None
            }
            (CookingState::Done, _) => Some(Estimate {
                minutes: 0.0,
                source: EstimateSource::TargetReached,
            }),
            _ => None,
        };

        self.check_before_done(now);
        self.snapshot(now)
    }

    /// Start a cook. Only valid while idle.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<CookingSnapshot> {
        self.require(&[CookingState::Idle], "start cooking")?;

        let probe = self.last_reading.and_then(|r| r.probe_temp);
        let ambient = self.last_reading.and_then(|r| r.ambient_temp);
        self.session.begin(now, probe, ambient);
        self.flags = NotificationFlags::default();
        self.probe_history.clear();
        self.ambient_history.clear();
        self.estimator_state = EstimatorState::new();
        self.state = CookingState::Cooking;

        info!(
            "Cooking started (session {:?}) at {:?}°C, withdrawal {:.1}°C",
            self.session.session_id, probe, self.session.withdrawal_temp
        );

        Ok(self.recompute(now))
    }

    /// Stop the cook and return to idle. Only valid while cooking or done.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<CookingSnapshot> {
        self.require(&[CookingState::Cooking, CookingState::Done], "stop cooking")?;

        self.reset_cook();
        self.state = CookingState::Idle;
        info!("Cooking stopped");

        Ok(self.recompute(now))
    }

    /// Set the target temperature directly, switching to manual mode.
    pub fn set_target_temp(
        &mut self,
        temperature: f64,
        now: DateTime<Utc>,
    ) -> Result<CookingSnapshot> {
        if !(MIN_TARGET_TEMP..=MAX_TARGET_TEMP).contains(&temperature) {
            return Err(Error::invalid_parameter("target_temp", temperature));
        }

        self.session.is_manual_mode = true;
        self.session.food = FoodSelection::manual();
        self.session.manual_temp_memory = temperature;
        self.session.desired_temp = temperature;
        self.after_target_change();

        info!("Target set to {:.1}°C (manual)", temperature);
        Ok(self.recompute(now))
    }

    /// Select a food and doneness from the food table.
    ///
    /// The manual sentinel restores the remembered manual temperature. An
    /// unknown selection is rejected and changes nothing.
    pub fn set_food(
        &mut self,
        category: &str,
        food_name: &str,
        doneness: &str,
        now: DateTime<Utc>,
    ) -> Result<CookingSnapshot> {
        if food::is_manual(category, food_name) {
            self.session.is_manual_mode = true;
            self.session.food = FoodSelection::manual();
            self.session.desired_temp = self.session.manual_temp_memory;
        } else {
            let target = food::target_temperature(category, food_name, doneness).ok_or_else(|| {
                Error::UnknownFood {
                    category: category.to_string(),
                    food: food_name.to_string(),
                    doneness: doneness.to_string(),
                }
            })?;
            self.session.is_manual_mode = false;
            self.session.food = FoodSelection::new(category, food_name, doneness);
            self.session.desired_temp = target;
        }
        self.after_target_change();

        info!(
            "Food set to {} ({}), target {:.1}°C",
            self.session.food.food_id(),
            self.session.food.doneness,
            self.session.desired_temp
        );
        Ok(self.recompute(now))
    }

    /// Enable or disable dynamic carryover compensation.
    pub fn set_carryover_enabled(
        &mut self,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<CookingSnapshot> {
        self.session.carryover_enabled = enabled;
        self.update_withdrawal();
        self.save_preferences();

        info!("Carryover compensation {}", if enabled { "enabled" } else { "disabled" });
        Ok(self.recompute(now))
    }

    /// Build a snapshot of the current state without processing a reading.
    pub fn snapshot(&self, now: DateTime<Utc>) -> CookingSnapshot {
        let reading = self.last_reading;
        let probe_temp = reading.and_then(|r| r.probe_temp);
        let rate = heating_rate(self.probe_history.as_slice(), &self.config.estimator);
        let remaining = self.estimate.map(|e| e.minutes);

        let estimated_end = remaining.map(|minutes| now + minutes_duration(minutes));
        let total_estimated = match (estimated_end, self.session.start_time) {
            (Some(end), Some(start)) => Some(minutes_between(start, end)),
            _ => None,
        };

        let limit = self.config.history_export_limit;

        CookingSnapshot {
            state: self.state,
            probe_connected: probe_temp.is_some(),
            probe_temp,
            ambient_temp: reading.and_then(|r| r.ambient_temp),
            battery: reading.and_then(|r| r.battery),
            signal_strength: reading.and_then(|r| r.signal_strength),
            desired_temp: self.session.desired_temp,
            withdrawal_temp: self.session.withdrawal_temp,
            carryover: self.session.carryover(),
            is_manual_mode: self.session.is_manual_mode,
            carryover_enabled: self.session.carryover_enabled,
            food: self.session.food.clone(),
            start_time: self.session.start_time,
            cooking_end_time: self.session.cooking_end_time,
            remaining_time: remaining,
            estimate_source: self.estimate.map(|e| e.source),
            estimated_end,
            total_estimated,
            heating_rate: rate,
            progress: self.progress(probe_temp),
            trend: heating_trend(rate, self.config.estimator.rising_threshold),
            disconnect_duration_secs: self
                .flags
                .disconnect_since
                .map(|since| seconds_between(since, now)),
            probe_history: self.probe_history.recent(limit).to_vec(),
            ambient_history: self.ambient_history.recent(limit).to_vec(),
            timestamp: now,
        }
    }

    fn require(&self, allowed: &[CookingState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        warn!("Cannot {}: state is {}", operation, self.state);
        Err(Error::InvalidState {
            operation: operation.to_string(),
            state: self.state,
        })
    }

    /// Re-run a tick with the latest sensor values.
    ///
    /// The tick is stamped at `now`, or at the newest sensor timestamp if
    /// that is later, so host clocks ahead of the command clock never put
    /// the history out of order.
    fn recompute(&mut self, now: DateTime<Utc>) -> CookingSnapshot {
        let now = self.last_reading.map_or(now, |r| now.max(r.timestamp));
        let now = self.probe_history.last().map_or(now, |s| now.max(s.timestamp));
        let reading = self
            .last_reading
            .map(|r| r.at(now))
            .unwrap_or_else(|| SensorReading::disconnected(now));
        self.tick(reading)
    }

    fn update_state(&mut self, reading: &SensorReading) {
        let now = reading.timestamp;
        let connected = reading.probe_connected();

        match self.state {
            CookingState::Disconnected => {
                if connected {
                    self.transition(CookingState::Idle);
                    self.flags.disconnect_since = None;
                }
            }
            CookingState::Idle => {
                if !connected {
                    self.transition(CookingState::Disconnected);
                }
            }
            CookingState::Cooking => {
                if let Some(probe) = reading.probe_temp {
                    if probe >= self.session.withdrawal_temp {
                        self.session.cooking_end_time = Some(now);
                        self.transition(CookingState::Done);
                        if !self.flags.done_sent {
                            self.flags.done_sent = true;
                            self.notify(NotificationKind::Done, now);
                        }
                    }
                }

                if connected {
                    self.flags.disconnect_since = None;
                } else {
                    self.flags.disconnect_since.get_or_insert(now);
                    self.check_disconnect(now);
                }
            }
            CookingState::Done => {
                if !connected {
                    self.transition(CookingState::Disconnected);
                    self.reset_cook();
                }
            }
        }
    }

    fn transition(&mut self, next: CookingState) {
        info!("State {} -> {}", self.state, next);
        self.state = next;
    }

    /// Append the reading to both histories. Returns whether the probe
    /// sample was accepted.
    fn record(&mut self, now: DateTime<Utc>, probe: f64, ambient: Option<f64>) -> bool {
        let window = retention_window(self.state, &self.session, now);

        let accepted = self.probe_history.push(now, probe);
        self.probe_history.retain_window(&window);

        if let Some(ambient) = ambient {
            self.ambient_history.push(now, ambient);
            self.ambient_history.retain_window(&window);
        }
        accepted
    }

    fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        probe: f64,
        ambient: Option<f64>,
    ) -> Option<Estimate> {
        let ctx = EstimateContext::new(
            self.probe_history.as_slice(),
            probe,
            self.session.withdrawal_temp,
            ambient,
        );
        let evaluation = self.estimator.evaluate(self.estimator_state, &ctx, now);
        self.estimator_state = evaluation.state;

        if evaluation.drop_detected {
            info!("Probe reinsertion detected at {:.1}°C, restarting estimation", probe);
            self.probe_history.discard_before(now);
        }

        evaluation.estimate
    }

    fn update_withdrawal(&mut self) {
        let rate = heating_rate(self.probe_history.as_slice(), &self.config.estimator);
        let ambient = self.last_reading.and_then(|r| r.ambient_temp);
        let carryover = dynamic_carryover(
            self.session.carryover_enabled,
            rate,
            self.session.food.carryover_type(),
            ambient,
            &self.config.carryover,
        );
        self.session.withdrawal_temp =
            withdrawal_temperature(self.session.desired_temp, carryover, &self.config.carryover);
    }

    fn after_target_change(&mut self) {
        self.update_withdrawal();
        self.flags.before_done_sent = false;
        self.save_preferences();
    }

    fn progress(&self, probe_temp: Option<f64>) -> f64 {
        if !self.state.has_session() {
            return 0.0;
        }
        let (Some(start), Some(probe)) = (self.session.start_probe_temp, probe_temp) else {
            return 0.0;
        };

        let range = self.session.withdrawal_temp - start;
        if range <= 0.0 {
            return 100.0;
        }
        ((probe - start) / range * 100.0).clamp(0.0, 100.0)
    }

    fn check_before_done(&mut self, now: DateTime<Utc>) {
        let rules = &self.config.notifications;
        if !rules.notify_before_done || self.flags.before_done_sent {
            return;
        }
        if self.state != CookingState::Cooking {
            return;
        }

        if let Some(estimate) = self.estimate {
            if estimate.minutes <= rules.before_done_minutes {
                self.flags.before_done_sent = true;
                self.notify(NotificationKind::BeforeDone, now);
            }
        }
    }

    fn check_disconnect(&mut self, now: DateTime<Utc>) {
        let rules = &self.config.notifications;
        if !rules.notify_disconnect {
            return;
        }
        let Some(since) = self.flags.disconnect_since else {
            return;
        };
        if seconds_between(since, now) < rules.disconnect_grace.as_secs_f64() {
            return;
        }
        if let Some(last) = self.flags.last_disconnect_notice {
            if seconds_between(last, now) < rules.disconnect_cooldown.as_secs_f64() {
                return;
            }
        }

        self.flags.last_disconnect_notice = Some(now);
        self.notify(NotificationKind::Disconnect, now);
    }

    fn notify(&mut self, kind: NotificationKind, now: DateTime<Utc>) {
        debug!("Queueing {} notification", kind);
        self.effects
            .push(Effect::Notify(Notification::new(kind, now)));
    }

    fn save_preferences(&mut self) {
        self.effects
            .push(Effect::SavePreferences(self.session.to_preferences()));
    }

    fn reset_cook(&mut self) {
        self.session.clear_cook();
        self.probe_history.clear();
        self.ambient_history.clear();
        self.estimator_state = EstimatorState::new();
        self.estimate = None;
        let last_disconnect_notice = self.flags.last_disconnect_notice;
        self.flags = NotificationFlags {
            last_disconnect_notice,
            ..NotificationFlags::default()
        };
    }
}

fn minutes_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}
