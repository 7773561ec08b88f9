//! Route changes as seen by the authoring views.

/// Outcome of an attempt to leave the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadDecision {
    Proceed,
    Stay,
}

pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    /// Move to `path`, calling `confirm` first when an unsaved-changes
    /// interception is active.
    fn navigate(&self, path: &str, confirm: &dyn Fn() -> bool) -> UnloadDecision;
}
