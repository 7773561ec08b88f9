//! In-process stand-ins for the browser's unload hooks and history.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::application::guard::{InterceptError, InterceptionId, NavigationInterceptor};
use crate::application::navigation::{Navigator, UnloadDecision};
use crate::util::lock::mutex_lock;

/// Registry of active unload interceptions.
///
/// Leaving the page asks for confirmation while at least one is registered.
#[derive(Debug)]
pub struct UnloadHooks {
    next: AtomicU64,
    active: Mutex<BTreeSet<InterceptionId>>,
    available: bool,
}

impl Default for UnloadHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl UnloadHooks {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            active: Mutex::new(BTreeSet::new()),
            available: true,
        }
    }

    /// Hooks on a platform that refuses every registration.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn active_count(&self) -> usize {
        mutex_lock(&self.active, "infra::navigation", "active_count").len()
    }

    pub fn is_intercepting(&self) -> bool {
        self.active_count() > 0
    }

    /// Decide whether the page may be left, asking `confirm` only while an
    /// interception is registered.
    pub fn request_unload(&self, confirm: &dyn Fn() -> bool) -> UnloadDecision {
        if !self.is_intercepting() || confirm() {
            UnloadDecision::Proceed
        } else {
            UnloadDecision::Stay
        }
    }
}

impl NavigationInterceptor for UnloadHooks {
    fn register(&self) -> Result<InterceptionId, InterceptError> {
        if !self.available {
            return Err(InterceptError::Unavailable(
                "unload hooks are not supported here".into(),
            ));
        }
        let id = InterceptionId(self.next.fetch_add(1, Ordering::Relaxed));
        mutex_lock(&self.active, "infra::navigation", "register").insert(id);
        Ok(id)
    }

    fn unregister(&self, id: InterceptionId) {
        mutex_lock(&self.active, "infra::navigation", "unregister").remove(&id);
    }
}

/// Path history whose transitions honour the unload hooks.
#[derive(Debug)]
pub struct HistoryNavigator {
    hooks: Arc<UnloadHooks>,
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new(hooks: Arc<UnloadHooks>, start: impl Into<String>) -> Self {
        Self {
            hooks,
            entries: Mutex::new(vec![start.into()]),
        }
    }

    pub fn hooks(&self) -> &Arc<UnloadHooks> {
        &self.hooks
    }

    /// Go back one entry; the first entry is never popped.
    pub fn back(&self, confirm: &dyn Fn() -> bool) -> UnloadDecision {
        let mut entries = mutex_lock(&self.entries, "infra::navigation", "back");
        if entries.len() < 2 {
            return UnloadDecision::Stay;
        }
        let decision = self.hooks.request_unload(confirm);
        if decision == UnloadDecision::Proceed {
            entries.pop();
        }
        decision
    }

    pub fn history(&self) -> Vec<String> {
        mutex_lock(&self.entries, "infra::navigation", "history").clone()
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        mutex_lock(&self.entries, "infra::navigation", "current_path")
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn navigate(&self, path: &str, confirm: &dyn Fn() -> bool) -> UnloadDecision {
        let decision = self.hooks.request_unload(confirm);
        match decision {
            UnloadDecision::Proceed => {
                mutex_lock(&self.entries, "infra::navigation", "navigate").push(path.to_string());
                info!(target = "infra::navigation", path, "navigated");
            }
            UnloadDecision::Stay => {
                debug!(target = "infra::navigation", path, "navigation cancelled");
            }
        }
        decision
    }
}
