//! Post composer: draft state machine over the authoring collaborators.

mod commands;
mod service;
mod types;

pub use service::PostComposer;
pub use types::{ComposerDeps, ComposerError, ComposerOptions, ComposerState, SaveOutcome};
