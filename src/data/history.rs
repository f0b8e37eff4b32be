//! Temperature sample history.
//!
//! An append-only, time-ordered buffer of samples. Retention is applied
//! explicitly by the lifecycle after every append, using the window
//! computed by [`retention_window`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::{CookingSession, CookingState};

/// How far before the cook start samples are kept.
const PRE_START_MARGIN_MINUTES: i64 = 1;

/// How long after the cook ends samples are kept.
const POST_END_MARGIN_HOURS: i64 = 1;

/// Trailing history kept while idle or disconnected.
const IDLE_RETENTION_MINUTES: i64 = 2;

/// Fallback retention for a finished cook without a recorded start.
const DONE_FALLBACK_HOURS: i64 = 2;

/// A single temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius.
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Inclusive time range of samples to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    /// Oldest timestamp kept.
    pub keep_from: DateTime<Utc>,
    /// Newest timestamp kept, if bounded.
    pub keep_to: Option<DateTime<Utc>>,
}

impl RetentionWindow {
    /// Check whether a timestamp falls inside the window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.keep_from && self.keep_to.map_or(true, |to| timestamp <= to)
    }
}

/// Compute which samples to keep for the given lifecycle state.
///
/// - Cooking: everything from one minute before the start.
/// - Done: from one minute before the start to one hour after the end.
/// - Otherwise: the trailing two minutes.
pub fn retention_window(
    state: CookingState,
    session: &CookingSession,
    now: DateTime<Utc>,
) -> RetentionWindow {
    let idle = RetentionWindow {
        keep_from: now - Duration::minutes(IDLE_RETENTION_MINUTES),
        keep_to: None,
    };
    let pre_start = |start: DateTime<Utc>| start - Duration::minutes(PRE_START_MARGIN_MINUTES);

    match state {
        CookingState::Cooking => match session.start_time {
            Some(start) => RetentionWindow {
                keep_from: pre_start(start),
                keep_to: None,
            },
            None => idle,
        },
        CookingState::Done => match session.cooking_end_time {
            Some(end) => RetentionWindow {
                keep_from: session
                    .start_time
                    .map(pre_start)
                    .unwrap_or_else(|| now - Duration::hours(DONE_FALLBACK_HOURS)),
                keep_to: Some(end + Duration::hours(POST_END_MARGIN_HOURS)),
            },
            None => idle,
        },
        CookingState::Idle | CookingState::Disconnected => idle,
    }
}

/// Time-ordered buffer of temperature samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleHistory {
    samples: Vec<Sample>,
}

impl SampleHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history from samples, ordering them by timestamp.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { samples }
    }

    /// Append a sample.
    ///
    /// A sample older than the newest one is rejected and `false` is
    /// returned; the history stays ordered by timestamp.
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: f64) -> bool {
        if let Some(last) = self.last() {
            if timestamp < last.timestamp {
                debug!(
                    "Rejecting out-of-order sample at {} (newest is {})",
                    timestamp, last.timestamp
                );
                return false;
            }
        }
        self.samples.push(Sample::new(timestamp, value));
        true
    }

    /// Drop every sample outside the retention window.
    pub fn retain_window(&mut self, window: &RetentionWindow) {
        self.samples.retain(|s| window.contains(s.timestamp));
    }

    /// Drop every sample older than `timestamp`.
    pub fn discard_before(&mut self, timestamp: DateTime<Utc>) {
        let split = self.samples.partition_point(|s| s.timestamp < timestamp);
        self.samples.drain(..split);
    }

    /// Samples strictly newer than `window` before the latest sample.
    pub fn trailing(&self, window: std::time::Duration) -> &[Sample] {
        trailing_window(&self.samples, window)
    }

    /// The most recent `limit` samples.
    pub fn recent(&self, limit: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(limit);
        &self.samples[start..]
    }

    /// All samples, oldest first.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Oldest sample.
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    /// Newest sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Remove all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Samples strictly newer than `window` before the last sample of `samples`.
pub fn trailing_window(samples: &[Sample], window: std::time::Duration) -> &[Sample] {
    let Some(latest) = samples.last() else {
        return samples;
    };
    let window = Duration::milliseconds(window.as_millis() as i64);
    let cutoff = latest.timestamp - window;
    let start = samples.partition_point(|s| s.timestamp <= cutoff);
    &samples[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    fn history_every(seconds: i64, count: i64) -> SampleHistory {
        let mut history = SampleHistory::new();
        for i in 0..count {
            history.push(t0() + Duration::seconds(i * seconds), 20.0 + i as f64);
        }
        history
    }

    #[test]
    fn test_trailing_window_is_strict() {
        let history = history_every(60, 5); // 0..=4 minutes
        let recent = history.trailing(std::time::Duration::from_secs(180));

        // cutoff = 4 min - 3 min = 1 min; the 1 min sample is excluded
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp, t0() + Duration::minutes(2));
    }

    #[test]
    fn test_out_of_order_sample_rejected() {
        let mut history = history_every(10, 3);
        assert!(!history.push(t0() + Duration::seconds(15), 99.0));
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().value, 22.0);

        // Equal timestamps are kept in insertion order.
        assert!(history.push(t0() + Duration::seconds(20), 23.0));
        assert_eq!(history.last().unwrap().value, 23.0);
    }

    #[test]
    fn test_from_samples_orders_by_time() {
        let history = SampleHistory::from_samples(vec![
            Sample::new(t0() + Duration::seconds(10), 21.0),
            Sample::new(t0(), 20.0),
        ]);
        assert_eq!(history.first().unwrap().value, 20.0);
        assert_eq!(history.last().unwrap().value, 21.0);
    }

    #[test]
    fn test_trailing_window_empty() {
        let history = SampleHistory::new();
        assert!(history.trailing(std::time::Duration::from_secs(180)).is_empty());
    }

    #[test]
    fn test_recent_and_discard() {
        let mut history = history_every(10, 10);
        assert_eq!(history.recent(3).len(), 3);
        assert_eq!(history.recent(100).len(), 10);

        history.discard_before(t0() + Duration::seconds(50));
        assert_eq!(history.len(), 5);
        assert_eq!(history.first().unwrap().value, 25.0);
    }

    #[test]
    fn test_idle_retention_keeps_two_minutes() {
        let mut history = history_every(30, 10); // 0..=270s
        let now = t0() + Duration::seconds(270);
        let window = retention_window(CookingState::Idle, &CookingSession::default(), now);
        history.retain_window(&window);

        // keep_from = 150s
        assert_eq!(history.len(), 5);
        assert_eq!(history.first().unwrap().timestamp, t0() + Duration::seconds(150));
    }

    #[test]
    fn test_cooking_retention_keeps_since_start() {
        let session = CookingSession {
            start_time: Some(t0() + Duration::minutes(2)),
            ..Default::default()
        };
        let now = t0() + Duration::minutes(30);
        let window = retention_window(CookingState::Cooking, &session, now);

        assert_eq!(window.keep_from, t0() + Duration::minutes(1));
        assert_eq!(window.keep_to, None);
        assert!(!window.contains(t0()));
        assert!(window.contains(now));
    }

    #[test]
    fn test_done_retention_is_bounded() {
        let session = CookingSession {
            start_time: Some(t0()),
            cooking_end_time: Some(t0() + Duration::minutes(40)),
            ..Default::default()
        };
        let now = t0() + Duration::hours(3);
        let window = retention_window(CookingState::Done, &session, now);

        assert_eq!(window.keep_from, t0() - Duration::minutes(1));
        assert_eq!(window.keep_to, Some(t0() + Duration::minutes(100)));
        assert!(!window.contains(now));
    }

    #[test]
    fn test_done_without_end_falls_back_to_idle() {
        let now = t0() + Duration::hours(1);
        let window = retention_window(CookingState::Done, &CookingSession::default(), now);
        assert_eq!(window.keep_from, now - Duration::minutes(2));
    }
}
