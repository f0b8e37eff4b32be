//! Cooking notifications.
//!
//! The lifecycle decides *when* to notify; a [`Notifier`] decides *how*.
//! Delivery happens off the tick path and failures are only logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// The kinds of notification the lifecycle can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// The estimate dropped to the configured lead time.
    #[serde(rename = "5min")]
    BeforeDone,
    /// The withdrawal temperature was reached.
    #[serde(rename = "done")]
    Done,
    /// The probe stopped reporting during a cook.
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl NotificationKind {
    /// Stable message key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeDone => "5min",
            Self::Done => "done",
            Self::Disconnect => "disconnect",
        }
    }

    /// Short title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::BeforeDone => "Almost done",
            Self::Done => "Cooking done",
            Self::Disconnect => "Probe disconnected",
        }
    }

    /// Message body.
    pub fn message(&self) -> &'static str {
        match self {
            Self::BeforeDone => "Only 5 minutes left!",
            Self::Done => "Cooking done! Remove it now.",
            Self::Disconnect => "The probe stopped reporting.",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification raised by the lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// What happened.
    pub kind: NotificationKind,
    /// When it was raised.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a notification.
    pub fn new(kind: NotificationKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }

    /// Short title.
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Message body.
    pub fn message(&self) -> &'static str {
        self.kind.message()
    }
}

/// Delivers notifications to the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            kind = notification.kind.as_str(),
            "{}: {}",
            notification.title(),
            notification.message()
        );
        Ok(())
    }
}
