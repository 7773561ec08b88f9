//! Notification sinks.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::application::notify::{Notification, NotificationKind, Notifier};
use crate::util::lock::mutex_lock;

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Info => info!(
                target = "infra::notify",
                id = %notification.id,
                ttl_ms = notification.ttl.as_millis() as u64,
                "{}",
                notification.message
            ),
            NotificationKind::Error => error!(
                target = "infra::notify",
                id = %notification.id,
                ttl_ms = notification.ttl.as_millis() as u64,
                "{}",
                notification.message
            ),
        }
    }
}

/// Keeps notifications in memory so a front end can render them later.
#[derive(Debug, Default, Clone)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        mutex_lock(&self.entries, "infra::notify", "snapshot").clone()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *mutex_lock(&self.entries, "infra::notify", "drain"))
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, "infra::notify", "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        mutex_lock(&self.entries, "infra::notify", "count")
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        mutex_lock(&self.entries, "infra::notify", "push").push(notification);
    }
}

/// Forwards each notification to several sinks.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, notification: Notification) {
        for sink in &self.sinks {
            sink.notify(notification.clone());
        }
    }
}
