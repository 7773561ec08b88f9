//! User-visible notifications.

use std::time::Duration;

use uuid::Uuid;

const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub ttl: Duration,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_ttl(NotificationKind::Info, message, DEFAULT_NOTIFICATION_TTL)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_ttl(NotificationKind::Error, message, DEFAULT_NOTIFICATION_TTL)
    }

    pub fn with_ttl(kind: NotificationKind, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            ttl,
        }
    }
}

/// Fire-and-forget sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
