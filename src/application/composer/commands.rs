use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::metrics::{METRIC_IMAGE_UPLOADS, METRIC_POST_SAVES};
use crate::application::notify::Notification;
use crate::application::repos::{CreatePostParams, UpdatePostParams};
use crate::application::uploads::{UploadCompletion, UploadFailurePolicy, UploadSource};
use crate::domain::document::{RichDocument, TempId};
use crate::domain::draft::Draft;

use super::service::PostComposer;
use super::types::{ComposerError, ComposerState, SaveOutcome};

const SAVE_ACTION: &str = "post.save";

impl PostComposer {
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), ComposerError> {
        let title = title.into();
        self.edit(|draft| draft.title = title)
    }

    /// Replace the tag entries with the comma-separated `raw` text.
    pub fn set_tags_text(&mut self, raw: &str) -> Result<(), ComposerError> {
        let entries = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(str::to_string).collect()
        };
        self.edit(|draft| draft.tags = entries)
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> Result<(), ComposerError> {
        let tag = tag.into();
        self.edit(|draft| draft.tags.push(tag))
    }

    pub fn remove_tag(&mut self, index: usize) -> Result<Option<String>, ComposerError> {
        self.edit(|draft| (index < draft.tags.len()).then(|| draft.tags.remove(index)))
    }

    /// Blank categories are stored as `None`.
    pub fn set_category(&mut self, category: Option<&str>) -> Result<(), ComposerError> {
        let category = category
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self.edit(|draft| draft.category = category)
    }

    /// Apply an arbitrary edit to the body document.
    pub fn edit_body<R>(
        &mut self,
        apply: impl FnOnce(&mut RichDocument) -> R,
    ) -> Result<R, ComposerError> {
        self.edit(|draft| apply(&mut draft.body))
    }

    /// Insert a loading image at top-level `index` and start its upload.
    pub fn insert_image(
        &mut self,
        index: usize,
        source: UploadSource,
        alt: Option<String>,
    ) -> Result<TempId, ComposerError> {
        let placeholder = source.placeholder_src();
        let temp_id = self.edit(|draft| draft.body.insert_image_placeholder(index, placeholder, alt))?;
        debug!(
            target = "application::composer::insert_image",
            temp_id = %temp_id,
            file_name = %source.file_name,
            "image inserted; upload started"
        );
        self.uploads.start(temp_id, source);
        Ok(temp_id)
    }

    /// Settle an image directly with its final URL.
    ///
    /// Returns `false` when the node is gone; the document is left untouched.
    pub fn resolve_image(&mut self, temp_id: TempId, url: impl Into<String>) -> bool {
        if self.state == ComposerState::Discarded {
            return false;
        }
        let resolved = self.draft.body.resolve_image(temp_id, url);
        if resolved {
            self.refresh();
        }
        resolved
    }

    /// Apply one upload result to whichever node still carries its id.
    pub fn apply_upload(&mut self, completion: UploadCompletion) -> bool {
        let UploadCompletion { temp_id, result } = completion;
        if self.state == ComposerState::Discarded {
            debug!(
                target = "application::composer::apply_upload",
                temp_id = %temp_id,
                "draft discarded; ignoring upload result"
            );
            return false;
        }

        let applied = match result {
            Ok(url) => {
                counter!(METRIC_IMAGE_UPLOADS, "outcome" => "resolved").increment(1);
                self.uploads.forget(temp_id);
                self.draft.body.resolve_image(temp_id, url)
            }
            Err(err) => {
                counter!(METRIC_IMAGE_UPLOADS, "outcome" => "failed").increment(1);
                warn!(
                    target = "application::composer::apply_upload",
                    temp_id = %temp_id,
                    error = %err,
                    policy = self.options.upload_failure.as_str(),
                    "image upload failed"
                );
                let applied = match self.options.upload_failure {
                    UploadFailurePolicy::Remove => {
                        self.uploads.forget(temp_id);
                        self.draft.body.remove_image(temp_id)
                    }
                    UploadFailurePolicy::MarkFailed => {
                        let marked = self.draft.body.mark_image_failed(temp_id, err.to_string());
                        if !marked {
                            self.uploads.forget(temp_id);
                        }
                        marked
                    }
                };
                if applied {
                    self.notifier
                        .notify(Notification::error(format!("Image upload failed: {err}")));
                }
                applied
            }
        };

        if applied {
            self.refresh();
        } else {
            debug!(
                target = "application::composer::apply_upload",
                temp_id = %temp_id,
                "image node no longer present"
            );
        }
        applied
    }

    /// Wait for the next outstanding upload and apply it.
    ///
    /// Returns `None` when no upload is running.
    pub async fn next_upload(&mut self) -> Option<bool> {
        let completion = self.uploads.next_completion().await?;
        Some(self.apply_upload(completion))
    }

    /// Apply every outstanding upload; returns how many touched the document.
    pub async fn settle_uploads(&mut self) -> usize {
        let mut applied = 0;
        while let Some(touched) = self.next_upload().await {
            if touched {
                applied += 1;
            }
        }
        applied
    }

    /// Restart the upload of an image that was marked failed.
    pub fn retry_upload(&mut self, temp_id: TempId) -> Result<bool, ComposerError> {
        self.ensure_active()?;
        let Some(attrs) = self.draft.body.find_image(temp_id) else {
            self.uploads.forget(temp_id);
            return Ok(false);
        };
        let failed = !attrs.loading && attrs.error.is_some();
        if !failed || !self.uploads.retry(temp_id) {
            return Ok(false);
        }
        self.edit(|draft| draft.body.mark_image_retrying(temp_id))
    }

    /// Run the save's admin check on its own, without persisting anything.
    pub fn authorize_save(&self) -> Result<(), ComposerError> {
        self.ensure_active()?;
        self.gate.authorize(SAVE_ACTION).map_err(ComposerError::Denied)
    }

    /// Derive slug and tags, pass the admin gate, and persist the draft.
    ///
    /// Denial and persistence failures leave the draft untouched in `Editing`.
    pub async fn save(&mut self) -> Result<SaveOutcome, ComposerError> {
        self.ensure_active()?;
        if !self.is_dirty() {
            return Ok(SaveOutcome::Unchanged);
        }

        self.state = ComposerState::Submitting;
        let pending = self.draft.body.pending_uploads().len();
        if pending > 0 {
            warn!(
                target = "application::composer::save",
                pending, "saving while image uploads are still in flight"
            );
        }

        let finalized = self
            .draft
            .finalize(self.clock.today(), self.options.tag_policy);
        let posts = Arc::clone(&self.posts);
        let post_id = self.post_id;
        let created = post_id.is_none();

        let result = self
            .gate
            .run(SAVE_ACTION, move || async move {
                match post_id {
                    Some(id) => {
                        posts
                            .update_post(UpdatePostParams {
                                id,
                                title: finalized.title,
                                body: finalized.body,
                                tags: finalized.tags,
                                category: finalized.category,
                            })
                            .await
                    }
                    None => {
                        posts
                            .insert_post(CreatePostParams {
                                slug: finalized.slug,
                                title: finalized.title,
                                body: finalized.body,
                                tags: finalized.tags,
                                category: finalized.category,
                            })
                            .await
                    }
                }
            })
            .await;

        match result {
            Err(denied) => {
                counter!(METRIC_POST_SAVES, "outcome" => "denied").increment(1);
                self.state = ComposerState::Editing;
                Err(ComposerError::Denied(denied))
            }
            Ok(Err(err)) => {
                counter!(METRIC_POST_SAVES, "outcome" => "failed").increment(1);
                warn!(
                    target = "application::composer::save",
                    error = %err,
                    "post save failed; draft kept"
                );
                self.notifier
                    .notify(Notification::error(format!("Saving the post failed: {err}")));
                self.state = ComposerState::Editing;
                Err(ComposerError::Persistence(err))
            }
            Ok(Ok(record)) => {
                counter!(METRIC_POST_SAVES, "outcome" => "saved").increment(1);
                info!(
                    target = "application::composer::save",
                    post_id = %record.id,
                    slug = %record.slug,
                    created,
                    "post saved"
                );
                self.baseline = self.draft.clone();
                self.post_id = Some(record.id);
                self.slug = Some(record.slug.clone());
                self.refresh();
                self.notifier.notify(Notification::info("Post saved"));
                Ok(if created {
                    SaveOutcome::Created(record)
                } else {
                    SaveOutcome::Updated(record)
                })
            }
        }
    }

    /// Throw the draft away. A dirty draft is only discarded when `confirm`
    /// agrees; a clean one goes without asking.
    pub fn discard(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if self.state == ComposerState::Discarded {
            return true;
        }
        if self.is_dirty() && !confirm() {
            return false;
        }
        self.state = ComposerState::Discarded;
        self.guard.arm(false);
        info!(
            target = "application::composer::discard",
            post_id = ?self.post_id,
            "draft discarded"
        );
        true
    }

    fn ensure_active(&self) -> Result<(), ComposerError> {
        if self.state == ComposerState::Discarded {
            return Err(ComposerError::Discarded);
        }
        Ok(())
    }

    fn edit<R>(&mut self, apply: impl FnOnce(&mut Draft) -> R) -> Result<R, ComposerError> {
        self.ensure_active()?;
        let output = apply(&mut self.draft);
        self.refresh();
        Ok(output)
    }

    fn refresh(&mut self) {
        let body = &self.draft.body;
        self.uploads
            .retain_sources(|temp_id| body.find_image(temp_id).is_some());

        let dirty = self.is_dirty();
        self.state = if dirty {
            ComposerState::Editing
        } else {
            ComposerState::Clean
        };
        self.guard.arm(dirty);
    }
}
