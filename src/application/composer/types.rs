use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;

use crate::application::gate::{AccessDenied, AdminGate};
use crate::application::guard::NavigationInterceptor;
use crate::application::notify::Notifier;
use crate::application::repos::{PostsWriteRepo, RepoError};
use crate::application::uploads::{ImageUploader, UploadFailurePolicy};
use crate::domain::entities::PostRecord;
use crate::domain::slug::Clock;
use crate::domain::tags::TagPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    /// Draft matches the last saved (or hydrated) snapshot.
    Clean,
    /// Draft differs from the snapshot; the unload guard is armed.
    Editing,
    /// A save is in progress.
    Submitting,
    /// Terminal; the draft was thrown away.
    Discarded,
}

impl ComposerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ComposerState::Clean => "clean",
            ComposerState::Editing => "editing",
            ComposerState::Submitting => "submitting",
            ComposerState::Discarded => "discarded",
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("draft was discarded")]
    Discarded,
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("failed to save post")]
    Persistence(#[source] RepoError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(PostRecord),
    Updated(PostRecord),
    /// Nothing differed from the last saved snapshot.
    Unchanged,
}

impl SaveOutcome {
    pub fn record(&self) -> Option<&PostRecord> {
        match self {
            SaveOutcome::Created(record) | SaveOutcome::Updated(record) => Some(record),
            SaveOutcome::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerOptions {
    pub tag_policy: TagPolicy,
    pub upload_failure: UploadFailurePolicy,
}

/// Collaborators a composer is wired to.
#[derive(Clone)]
pub struct ComposerDeps {
    pub posts: Arc<dyn PostsWriteRepo>,
    pub uploader: Arc<dyn ImageUploader>,
    pub interceptor: Arc<dyn NavigationInterceptor>,
    pub gate: AdminGate,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    /// Runtime the image uploads are spawned on.
    pub runtime: Handle,
}
