//! Simulated cook: a fake probe heating a steak in a 160°C oven
//!
//! Simulated time runs 100x faster than real time: each 50 ms poll advances
//! the probe clock by 5 seconds.
//!
//! Run with: cargo run --example simulated_cook

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use probe_cook_engine::{
    celsius_to_fahrenheit, CookingMonitor, CookingState, EngineConfig, JsonFilePreferenceStore,
    LogNotifier, NotificationConfig, Result, SensorReading, SensorSource,
};
use std::sync::Arc;
use std::time::Duration;

const OVEN_TEMP: f64 = 160.0;
const START_TEMP: f64 = 6.0;
const RATE_CONSTANT: f64 = 0.015;

/// Probe following Newton's law of heating on a simulated clock.
struct SimulatedProbe {
    start: DateTime<Utc>,
    clock: Mutex<DateTime<Utc>>,
}

impl SimulatedProbe {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            start: now,
            clock: Mutex::new(now),
        }
    }
}

#[async_trait]
impl SensorSource for SimulatedProbe {
    async fn read(&self) -> Result<SensorReading> {
        let now = {
            let mut clock = self.clock.lock();
            *clock += ChronoDuration::seconds(5);
            *clock
        };

        let minutes = (now - self.start).num_seconds() as f64 / 60.0;
        let probe = OVEN_TEMP - (OVEN_TEMP - START_TEMP) * (-RATE_CONSTANT * minutes).exp();
        let ambient = OVEN_TEMP + (minutes * 0.7).sin() * 3.0;

        Ok(SensorReading::new(now, probe)
            .with_ambient(ambient)
            .with_battery(87)
            .with_signal_strength(-61))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("probe_cook_engine=info".parse().unwrap()),
        )
        .init();

    println!("Simulated Cook Example");
    println!("======================\n");

    let config = EngineConfig::default()
        .with_tick_interval(Duration::from_millis(50))
        .with_notifications(NotificationConfig {
            notify_before_done: true,
            ..Default::default()
        });

    let store = JsonFilePreferenceStore::new(std::env::temp_dir().join("probe-cook-demo.json"));
    println!("Preferences: {}\n", store.path().display());

    let monitor =
        CookingMonitor::new("demo", config, Arc::new(store), Arc::new(LogNotifier)).await?;
    let snapshot = monitor.set_food("beef", "steak", "medium")?;
    println!(
        "Target: {:.1}°C ({:.1}°F) - Medium beef steak\n",
        snapshot.desired_temp,
        celsius_to_fahrenheit(snapshot.desired_temp)
    );

    let probe = Arc::new(SimulatedProbe::new());
    monitor.ingest(probe.read().await?);
    monitor.start()?;

    let mut updates = monitor.subscribe_snapshots();
    monitor.start_polling(probe);

    let mut tick = 0u64;
    loop {
        let snapshot = match updates.recv().await {
            Ok(snapshot) => snapshot,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };
        tick += 1;
        if tick % 12 == 0 || snapshot.state == CookingState::Done {
            let remaining = snapshot
                .remaining_time
                .map(|m| format!("{:5.1} min", m))
                .unwrap_or_else(|| "  --     ".to_string());
            println!(
                "probe {:5.1}°C | pull at {:5.1}°C (carryover {:.1}) | rate {:>5} °/min | remaining {} | {:3.0}%",
                snapshot.probe_temp.unwrap_or_default(),
                snapshot.withdrawal_temp,
                snapshot.carryover,
                snapshot
                    .heating_rate
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "--".to_string()),
                remaining,
                snapshot.progress,
            );
        }

        if snapshot.state == CookingState::Done {
            println!("\nDone! Remove from heat and rest.");
            break;
        }
    }

    monitor.shutdown().await;
    Ok(())
}
