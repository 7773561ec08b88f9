use std::sync::Arc;

use uuid::Uuid;

use crate::application::gate::AdminGate;
use crate::application::guard::UnsavedChangesGuard;
use crate::application::notify::Notifier;
use crate::application::repos::PostsWriteRepo;
use crate::application::uploads::UploadQueue;
use crate::domain::document::TempId;
use crate::domain::draft::Draft;
use crate::domain::entities::PostRecord;
use crate::domain::slug::Clock;

use super::types::{ComposerDeps, ComposerOptions, ComposerState};

pub struct PostComposer {
    pub(super) draft: Draft,
    pub(super) baseline: Draft,
    pub(super) state: ComposerState,
    pub(super) post_id: Option<Uuid>,
    pub(super) slug: Option<String>,
    pub(super) guard: UnsavedChangesGuard,
    pub(super) uploads: UploadQueue,
    pub(super) posts: Arc<dyn PostsWriteRepo>,
    pub(super) gate: AdminGate,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) options: ComposerOptions,
}

impl PostComposer {
    /// Start an empty draft for a new post.
    pub fn new(deps: ComposerDeps, options: ComposerOptions) -> Self {
        Self::with_baseline(deps, options, Draft::default(), None, None)
    }

    /// Start editing an existing post; the composer begins clean.
    pub fn hydrate(deps: ComposerDeps, options: ComposerOptions, record: &PostRecord) -> Self {
        Self::with_baseline(
            deps,
            options,
            Draft::from_record(record),
            Some(record.id),
            Some(record.slug.clone()),
        )
    }

    fn with_baseline(
        deps: ComposerDeps,
        options: ComposerOptions,
        baseline: Draft,
        post_id: Option<Uuid>,
        slug: Option<String>,
    ) -> Self {
        Self {
            draft: baseline.clone(),
            baseline,
            state: ComposerState::Clean,
            post_id,
            slug,
            guard: UnsavedChangesGuard::new(deps.interceptor),
            uploads: UploadQueue::new(deps.uploader, deps.runtime),
            posts: deps.posts,
            gate: deps.gate,
            notifier: deps.notifier,
            clock: deps.clock,
            options,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.baseline
    }

    /// Whether the unsaved-changes interception is currently registered.
    pub fn guard_armed(&self) -> bool {
        self.guard.is_armed()
    }

    /// Id of the persisted post, once hydrated or first saved.
    pub fn post_id(&self) -> Option<Uuid> {
        self.post_id
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn pending_uploads(&self) -> Vec<TempId> {
        self.draft.body.pending_uploads()
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads.in_flight()
    }

    /// Image sources still held for a possible retry.
    pub fn retained_sources(&self) -> usize {
        self.uploads.retained()
    }
}
