//! Unsaved-changes guard.
//!
//! While armed the guard owns exactly one registration with the platform's
//! unload interceptor. The registration is an RAII handle: disarming drops
//! it, and dropping the guard (view teardown) drops it too, whatever the last
//! `enabled` value was.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptionId(pub u64);

#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("navigation interception unavailable: {0}")]
    Unavailable(String),
}

/// Platform hook that asks the user before the page is left.
pub trait NavigationInterceptor: Send + Sync {
    fn register(&self) -> Result<InterceptionId, InterceptError>;

    fn unregister(&self, id: InterceptionId);
}

struct Interception {
    id: InterceptionId,
    interceptor: Arc<dyn NavigationInterceptor>,
}

impl Drop for Interception {
    fn drop(&mut self) {
        self.interceptor.unregister(self.id);
        debug!(
            target = "application::guard",
            id = self.id.0,
            "unload interception released"
        );
    }
}

pub struct UnsavedChangesGuard {
    interceptor: Arc<dyn NavigationInterceptor>,
    active: Option<Interception>,
}

impl UnsavedChangesGuard {
    pub fn new(interceptor: Arc<dyn NavigationInterceptor>) -> Self {
        Self {
            interceptor,
            active: None,
        }
    }

    /// Register or release the interception so it matches `enabled`.
    ///
    /// A platform that refuses registration is logged and otherwise ignored;
    /// editing continues without the prompt and the next `arm(true)` retries.
    pub fn arm(&mut self, enabled: bool) {
        if !enabled {
            self.active = None;
            return;
        }
        if self.active.is_some() {
            return;
        }

        match self.interceptor.register() {
            Ok(id) => {
                debug!(
                    target = "application::guard",
                    id = id.0,
                    "unload interception registered"
                );
                self.active = Some(Interception {
                    id,
                    interceptor: Arc::clone(&self.interceptor),
                });
            }
            Err(err) => {
                warn!(
                    target = "application::guard",
                    error = %err,
                    "continuing without unsaved-changes prompt"
                );
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.active.is_some()
    }
}
