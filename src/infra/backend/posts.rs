use async_trait::async_trait;
use folio_api_types::{NewPostRow, PostPatchRow, PostRow};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::document::RichDocument;
use crate::domain::entities::PostRecord;

use super::{BackendClient, eq, single_row};

const POSTS_TABLE: &str = "posts";

#[async_trait]
impl PostsRepo for BackendClient {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.find_one(&[("id", eq(id))]).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        self.find_one(&[("slug", eq(slug))]).await
    }
}

#[async_trait]
impl PostsWriteRepo for BackendClient {
    async fn insert_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = NewPostRow {
            slug: params.slug,
            title: params.title,
            content: document_to_value(&params.body)?,
            tags: params.tags,
            category: params.category,
        };
        let body = serde_json::to_value(&row).map_err(RepoError::from_persistence)?;
        let rows: Vec<PostRow> = self
            .rest(Method::POST, POSTS_TABLE, &[], Some(body))
            .await?;
        let record = post_from_row(single_row(rows)?)?;
        info!(
            target = "infra::backend::posts",
            post_id = %record.id,
            slug = %record.slug,
            "post inserted"
        );
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let patch = PostPatchRow {
            title: params.title,
            content: document_to_value(&params.body)?,
            tags: params.tags,
            category: params.category,
        };
        let body = serde_json::to_value(&patch).map_err(RepoError::from_persistence)?;
        let rows: Vec<PostRow> = self
            .rest(Method::PATCH, POSTS_TABLE, &[("id", eq(params.id))], Some(body))
            .await?;
        let record = post_from_row(single_row(rows)?)?;
        info!(
            target = "infra::backend::posts",
            post_id = %record.id,
            "post updated"
        );
        Ok(record)
    }
}

impl BackendClient {
    async fn find_one(&self, filter: &[(&str, String)]) -> Result<Option<PostRecord>, RepoError> {
        let mut query = vec![("select", "*".to_string()), ("limit", "1".to_string())];
        query.extend(filter.iter().cloned());
        let rows: Vec<PostRow> = self.rest(Method::GET, POSTS_TABLE, &query, None).await?;
        match rows.into_iter().next() {
            Some(row) => post_from_row(row).map(Some),
            None => {
                debug!(target = "infra::backend::posts", "post lookup found nothing");
                Ok(None)
            }
        }
    }
}

fn document_to_value(document: &RichDocument) -> Result<Value, RepoError> {
    serde_json::to_value(document).map_err(RepoError::from_persistence)
}

/// Rows written before the rich editor stored their body as a plain string
/// (or nothing at all); both are lifted into a document.
pub(crate) fn post_from_row(row: PostRow) -> Result<PostRecord, RepoError> {
    let body = match row.content {
        Value::Null => RichDocument::default(),
        Value::String(text) => RichDocument::from_plain_text(&text),
        value @ Value::Object(_) => serde_json::from_value(value).map_err(|err| {
            RepoError::integrity(format!("post {} has an unreadable body: {err}", row.id))
        })?,
        other => {
            return Err(RepoError::integrity(format!(
                "post {} has a body of unexpected shape: {other}",
                row.id
            )));
        }
    };

    Ok(PostRecord {
        id: row.id,
        slug: row.slug,
        title: row.title,
        body,
        tags: row.tags,
        category: row.category,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::document::Block;

    fn row(content: Value) -> PostRow {
        PostRow {
            id: Uuid::nil(),
            slug: "2024-05-01-hello".into(),
            title: "Hello".into(),
            content,
            tags: vec!["rust".into()],
            category: None,
            created_at: None,
        }
    }

    #[test]
    fn document_content_is_parsed() {
        let record = post_from_row(row(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": "hi"}]}]
        })))
        .expect("record");
        assert_eq!(record.body.content(), &[Block::paragraph("hi")]);
    }

    #[test]
    fn legacy_string_and_null_bodies_are_lifted() {
        let record = post_from_row(row(json!("first\n\nsecond"))).expect("string body");
        assert_eq!(record.body.len(), 2);

        let record = post_from_row(row(Value::Null)).expect("null body");
        assert!(record.body.is_empty());
    }

    #[test]
    fn malformed_body_is_an_integrity_error() {
        let err = post_from_row(row(json!([1, 2]))).expect_err("array body");
        assert!(matches!(err, RepoError::Integrity { .. }));
    }
}
