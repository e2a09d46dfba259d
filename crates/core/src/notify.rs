//! User-facing notifications raised by todo operations.
//!
//! Every notification is also emitted as a tracing event so headless runs
//! keep a record of what the user would have seen. Error notifications are
//! logged at debug level; the caller that raised one warns with the cause.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NotificationKind::Info)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NotificationKind::Error)
    }

    fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Append-only notification log shared between the controller and whatever
/// renders it.
#[derive(Debug, Default)]
pub struct Notifications {
    entries: Mutex<Vec<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Info => tracing::info!(
                title = notification.title.as_str(),
                "{}",
                notification.description
            ),
            // The failing caller has already warned with the underlying error.
            NotificationKind::Error => tracing::debug!(
                title = notification.title.as_str(),
                "{}",
                notification.description
            ),
        }
        self.entries.lock().push(notification);
    }

    pub fn latest(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.is_error())
            .count()
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }
}
