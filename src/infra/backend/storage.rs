use std::path::Path;

use async_trait::async_trait;
use folio_api_types::StorageObjectResponse;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use slug::slugify;
use tracing::info;
use uuid::Uuid;

use crate::application::uploads::{ImageUploader, UploadError, UploadSource};

use super::{BackendClient, BackendError, STORAGE_PREFIX};

const FALLBACK_STEM: &str = "image";

#[async_trait]
impl ImageUploader for BackendClient {
    async fn upload(&self, source: UploadSource) -> Result<String, UploadError> {
        let path = object_path(&source.file_name, Uuid::new_v4());
        let size = source.bytes.len();
        let resp = self
            .request(
                Method::POST,
                &format!("{STORAGE_PREFIX}object/{}/{path}", self.bucket()),
                &[],
            )?
            .header(CONTENT_TYPE, source.content_type)
            .body(source.bytes)
            .send()
            .await
            .map_err(BackendError::from)?;
        let stored: StorageObjectResponse = BackendClient::handle(resp).await?;

        let url = public_object_url(self.base(), self.bucket(), &path)?;
        info!(
            target = "infra::backend::storage",
            key = %stored.key,
            size,
            url = %url,
            "image stored"
        );
        Ok(url.to_string())
    }
}

/// Object name for an uploaded file: a fresh id followed by the slugified
/// file stem, keeping the lowercased extension.
pub fn object_path(file_name: &str, id: Uuid) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(slugify)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{id}-{stem}.{ext}"),
        None => format!("{id}-{stem}"),
    }
}

pub fn public_object_url(base: &Url, bucket: &str, path: &str) -> Result<Url, BackendError> {
    base.join(&format!("{STORAGE_PREFIX}object/public/{bucket}/{path}"))
        .map_err(BackendError::Url)
}
