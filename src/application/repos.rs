//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::document::RichDocument;
use crate::domain::entities::{CategoryRecord, PostRecord, TodoRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("request rejected: {message}")]
    Rejected { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("backend timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub body: RichDocument,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// Patch applied to an existing post. The slug is not part of the patch.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub body: RichDocument,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn insert_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// Categories ordered ascending by name.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait TodosRepo: Send + Sync {
    /// Todos ordered ascending by id.
    async fn list_todos(&self) -> Result<Vec<TodoRecord>, RepoError>;

    async fn insert_todo(&self, task: &str) -> Result<TodoRecord, RepoError>;

    async fn set_todo_complete(&self, id: i64, is_complete: bool)
    -> Result<TodoRecord, RepoError>;

    async fn delete_todo(&self, id: i64) -> Result<(), RepoError>;
}
