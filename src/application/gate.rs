//! Single-flag authorisation around mutating actions.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::warn;

use crate::application::metrics::METRIC_ADMIN_DENIALS;
use crate::application::notify::{Notification, Notifier};
use crate::application::session::AdminFlag;

/// Message shown to the user when a gated action is refused.
pub const DENIAL_MESSAGE: &str = "Only the site admin can do that. Sign in and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("action `{action}` requires an admin session")]
pub struct AccessDenied {
    pub action: &'static str,
}

/// Reads the shared admin flag before letting an action run.
///
/// Holds no state of its own, so one gate can wrap any number of actions.
#[derive(Clone)]
pub struct AdminGate {
    flag: AdminFlag,
    notifier: Arc<dyn Notifier>,
}

impl AdminGate {
    pub fn new(flag: AdminFlag, notifier: Arc<dyn Notifier>) -> Self {
        Self { flag, notifier }
    }

    pub fn is_open(&self) -> bool {
        self.flag.is_admin()
    }

    /// Check the flag; on refusal raise exactly one denial notification.
    pub fn authorize(&self, action: &'static str) -> Result<(), AccessDenied> {
        if self.flag.is_admin() {
            return Ok(());
        }

        counter!(METRIC_ADMIN_DENIALS, "action" => action).increment(1);
        warn!(
            target = "application::gate::authorize",
            action, "denied action without admin session"
        );
        self.notifier.notify(Notification::error(DENIAL_MESSAGE));
        Err(AccessDenied { action })
    }

    /// Wrap `action` so every call goes through [`AdminGate::authorize`].
    pub fn guard<F>(&self, name: &'static str, action: F) -> GatedAction<F> {
        GatedAction {
            gate: self.clone(),
            name,
            action,
        }
    }

    /// Authorise, then build and await the action's future.
    pub async fn run<F, Fut, T>(&self, name: &'static str, action: F) -> Result<T, AccessDenied>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.authorize(name)?;
        Ok(action().await)
    }
}

/// An action bound to a gate.
pub struct GatedAction<F> {
    gate: AdminGate,
    name: &'static str,
    action: F,
}

impl<F> GatedAction<F> {
    /// Invoke the wrapped action once if the flag is set, returning its result
    /// untouched.
    pub fn call<R>(&mut self) -> Result<R, AccessDenied>
    where
        F: FnMut() -> R,
    {
        self.gate.authorize(self.name)?;
        Ok((self.action)())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingNotifier {
        seen: Mutex<Vec<Notification>>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, notification: Notification) {
            self.seen.lock().expect("lock").push(notification);
        }
    }

    fn admin_flag(value: bool) -> AdminFlag {
        let flag = AdminFlag::new();
        flag.set(value);
        flag
    }

    #[test]
    fn closed_gate_never_runs_action_and_notifies_once() {
        let notifier = Arc::new(CountingNotifier::default());
        let gate = AdminGate::new(admin_flag(false), notifier.clone());
        let calls = AtomicUsize::new(0);

        let mut guarded = gate.guard("post.save", || calls.fetch_add(1, Ordering::SeqCst));
        let err = guarded.call().expect_err("denied");

        assert_eq!(err.action, "post.save");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let seen = notifier.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, DENIAL_MESSAGE);
    }

    #[test]
    fn open_gate_runs_action_once_without_notifying() {
        let notifier = Arc::new(CountingNotifier::default());
        let gate = AdminGate::new(admin_flag(true), notifier.clone());
        let calls = AtomicUsize::new(0);

        let mut guarded = gate.guard("post.save", || {
            calls.fetch_add(1, Ordering::SeqCst);
            "saved"
        });

        assert_eq!(guarded.call(), Ok("saved"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(notifier.seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn gate_reads_flag_at_call_time() {
        let notifier = Arc::new(CountingNotifier::default());
        let flag = admin_flag(false);
        let gate = AdminGate::new(flag.clone(), notifier.clone());
        let mut guarded = gate.guard("todo.delete", || 7);

        assert!(guarded.call().is_err());
        flag.set(true);
        assert_eq!(guarded.call(), Ok(7));
        assert_eq!(notifier.seen.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn async_run_skips_future_when_denied() {
        let notifier = Arc::new(CountingNotifier::default());
        let gate = AdminGate::new(admin_flag(false), notifier.clone());
        let calls = AtomicUsize::new(0);

        let result = gate
            .run("post.save", || async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
