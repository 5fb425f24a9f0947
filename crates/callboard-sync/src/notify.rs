//! Transient user notifications.
//!
//! Publishing never blocks: the [`NotificationCenter`] fans out over a
//! broadcast channel and keeps a bounded history for late subscribers.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_HISTORY: usize = 50;
const CHANNEL_CAPACITY: usize = 64;

/// Severity of a notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational.
    #[default]
    Info,
    /// Something succeeded.
    Success,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique ID.
    pub id: Uuid,
    /// Severity.
    pub level: NotificationLevel,
    /// Short heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body.
    pub message: String,
    /// When it was raised.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// New notification with a fresh ID.
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            level,
            title: None,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Informational.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    /// Success.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    /// Warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    /// Error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Sink for notifications. Must not block.
pub trait Notifier: Send + Sync {
    /// Publish one notification.
    fn notify(&self, notification: Notification);
}

/// Broadcasting notifier with bounded recent history.
#[derive(Debug)]
pub struct NotificationCenter {
    tx: broadcast::Sender<Notification>,
    history: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationCenter {
    /// Center with the default history size.
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Center keeping at most `capacity` recent notifications.
    pub fn with_history(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Receive notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Recent notifications, oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.history.lock().iter().cloned().collect()
    }

    /// Remove one notification from history.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut history = self.history.lock();
        let before = history.len();
        history.retain(|n| n.id != id);
        history.len() != before
    }

    /// Drop all history.
    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        {
            let mut history = self.history.lock();
            if self.capacity > 0 {
                if history.len() == self.capacity {
                    let _ = history.pop_front();
                }
                history.push_back(notification.clone());
            }
        }
        // No subscribers is fine
        let _ = self.tx.send(notification);
    }
}
