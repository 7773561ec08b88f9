//! Image uploads running beside the editor.
//!
//! Each upload is its own tokio task. Completions come back over a channel in
//! whatever order the backend answers and carry only the node's [`TempId`];
//! the composer applies them with a fresh lookup against the current document.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::document::TempId;

/// Scheme prefix of the `src` shown while an upload is outstanding.
pub const PLACEHOLDER_SCHEME: &str = "local://";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload transport failed: {0}")]
    Transport(String),
    #[error("upload task ended unexpectedly: {0}")]
    Aborted(String),
}

#[derive(Clone)]
pub struct UploadSource {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadSource {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn placeholder_src(&self) -> String {
        format!("{PLACEHOLDER_SCHEME}{}", self.file_name)
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Stores image bytes and answers with the public URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, source: UploadSource) -> Result<String, UploadError>;
}

/// What happens to a provisional node whose upload failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFailurePolicy {
    /// Delete the node.
    #[default]
    Remove,
    /// Keep the node with an error so the upload can be retried.
    MarkFailed,
}

impl UploadFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadFailurePolicy::Remove => "remove",
            UploadFailurePolicy::MarkFailed => "mark_failed",
        }
    }
}

impl FromStr for UploadFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remove" => Ok(UploadFailurePolicy::Remove),
            "mark_failed" | "mark-failed" => Ok(UploadFailurePolicy::MarkFailed),
            other => Err(format!("unknown upload failure policy `{other}`")),
        }
    }
}

#[derive(Debug)]
pub struct UploadCompletion {
    pub temp_id: TempId,
    pub result: Result<String, UploadError>,
}

pub struct UploadQueue {
    uploader: Arc<dyn ImageUploader>,
    runtime: Handle,
    sender: mpsc::UnboundedSender<UploadCompletion>,
    receiver: mpsc::UnboundedReceiver<UploadCompletion>,
    in_flight: usize,
    sources: HashMap<TempId, UploadSource>,
}

impl UploadQueue {
    pub fn new(uploader: Arc<dyn ImageUploader>, runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            uploader,
            runtime,
            sender,
            receiver,
            in_flight: 0,
            sources: HashMap::new(),
        }
    }

    /// Start uploading `source` for the node tagged `temp_id`.
    pub fn start(&mut self, temp_id: TempId, source: UploadSource) {
        self.sources.insert(temp_id, source.clone());
        self.spawn(temp_id, source);
    }

    /// Re-run the upload for a node whose previous attempt failed.
    pub fn retry(&mut self, temp_id: TempId) -> bool {
        match self.sources.get(&temp_id).cloned() {
            Some(source) => {
                self.spawn(temp_id, source);
                true
            }
            None => false,
        }
    }

    /// Drop the retained source once its node no longer needs it.
    pub fn forget(&mut self, temp_id: TempId) {
        self.sources.remove(&temp_id);
    }

    /// Keep only the sources whose node `keep` still finds.
    pub fn retain_sources(&mut self, mut keep: impl FnMut(TempId) -> bool) {
        self.sources.retain(|temp_id, _| keep(*temp_id));
    }

    /// Number of sources held back for a possible retry.
    pub fn retained(&self) -> usize {
        self.sources.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Wait for the next upload to finish, or `None` when nothing is running.
    pub async fn next_completion(&mut self) -> Option<UploadCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.receiver.recv().await?;
        self.in_flight -= 1;
        Some(completion)
    }

    fn spawn(&mut self, temp_id: TempId, source: UploadSource) {
        let uploader = Arc::clone(&self.uploader);
        let sender = self.sender.clone();
        let runtime = self.runtime.clone();
        self.in_flight += 1;

        self.runtime.spawn(async move {
            let file_name = source.file_name.clone();
            let task = runtime.spawn(async move { uploader.upload(source).await });
            let result = match task.await {
                Ok(result) => result,
                Err(err) => Err(UploadError::Aborted(err.to_string())),
            };
            debug!(
                target = "application::uploads",
                temp_id = %temp_id,
                file_name = %file_name,
                ok = result.is_ok(),
                "upload finished"
            );
            if sender.send(UploadCompletion { temp_id, result }).is_err() {
                debug!(
                    target = "application::uploads",
                    temp_id = %temp_id,
                    "editor gone; discarding upload result"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct DelayedUploader;

    #[async_trait]
    impl ImageUploader for DelayedUploader {
        async fn upload(&self, source: UploadSource) -> Result<String, UploadError> {
            let delay = if source.file_name.starts_with("slow") {
                50
            } else {
                1
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if source.file_name.ends_with(".bad") {
                return Err(UploadError::Rejected("unsupported".into()));
            }
            Ok(format!("https://cdn.example/{}", source.file_name))
        }
    }

    fn source(name: &str) -> UploadSource {
        UploadSource::new(name, "image/png", Bytes::from_static(b"png"))
    }

    #[tokio::test]
    async fn completions_arrive_in_finish_order() {
        let mut queue = UploadQueue::new(Arc::new(DelayedUploader), Handle::current());
        let slow = TempId::new();
        let fast = TempId::new();
        queue.start(slow, source("slow.png"));
        queue.start(fast, source("fast.png"));
        assert_eq!(queue.in_flight(), 2);

        let first = queue.next_completion().await.expect("first");
        assert_eq!(first.temp_id, fast);
        assert_eq!(
            first.result.expect("url"),
            "https://cdn.example/fast.png"
        );

        let second = queue.next_completion().await.expect("second");
        assert_eq!(second.temp_id, slow);
        assert!(queue.next_completion().await.is_none());
    }

    #[tokio::test]
    async fn failed_upload_can_be_retried_from_retained_source() {
        let mut queue = UploadQueue::new(Arc::new(DelayedUploader), Handle::current());
        let temp_id = TempId::new();
        queue.start(temp_id, source("x.bad"));

        let completion = queue.next_completion().await.expect("completion");
        assert!(completion.result.is_err());

        assert!(queue.retry(temp_id));
        assert_eq!(queue.in_flight(), 1);
        queue.forget(temp_id);
        assert!(!queue.retry(temp_id));
    }

    #[tokio::test]
    async fn sources_of_vanished_nodes_are_released() {
        let mut queue = UploadQueue::new(Arc::new(DelayedUploader), Handle::current());
        let kept = TempId::new();
        let gone = TempId::new();
        queue.start(kept, source("a.bad"));
        queue.start(gone, source("b.bad"));
        assert_eq!(queue.retained(), 2);

        queue.retain_sources(|temp_id| temp_id == kept);
        assert_eq!(queue.retained(), 1);
        assert!(!queue.retry(gone));
        assert!(queue.retry(kept));
    }

    #[test]
    fn uploads_start_outside_the_runtime_context() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .expect("runtime");
        let mut queue = UploadQueue::new(Arc::new(DelayedUploader), runtime.handle().clone());
        let temp_id = TempId::new();
        queue.start(temp_id, source("cat.png"));

        let completion = runtime
            .block_on(queue.next_completion())
            .expect("completion");
        assert_eq!(completion.temp_id, temp_id);
        assert!(completion.result.is_ok());
    }

    #[test]
    fn placeholder_uses_local_scheme() {
        assert_eq!(source("cat.png").placeholder_src(), "local://cat.png");
    }

    #[test]
    fn failure_policy_parses() {
        assert_eq!(
            "mark-failed".parse::<UploadFailurePolicy>(),
            Ok(UploadFailurePolicy::MarkFailed)
        );
        assert!("ignore".parse::<UploadFailurePolicy>().is_err());
    }
}
