//! Row and payload shapes exchanged with the hosted backend.
//!
//! Tables are served through a PostgREST-style REST surface (`/rest/v1`),
//! authentication through `/auth/v1`, and image objects through
//! `/storage/v1`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// A row of the `posts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    /// Editor document JSON; legacy rows may hold a plain string or null.
    #[serde(default)]
    pub content: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// Nullable columns read as their default, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Insert payload for `posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPostRow {
    pub slug: String,
    pub title: String,
    pub content: Value,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// Patch payload for `posts`; the slug never changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPatchRow {
    pub title: String,
    pub content: Value,
    pub tags: Vec<String>,
    pub category: Option<String>,
}

/// A row of the `categories` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

/// A row of the `todo` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoRow {
    pub id: i64,
    pub task: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_complete: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub inserted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodoRow {
    pub task: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatchRow {
    pub is_complete: bool,
}

/// User object returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// Response of an object upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObjectResponse {
    #[serde(rename = "Key")]
    pub key: String,
}

/// Error body shared by the REST, auth and storage services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "msg", alias = "error_description")]
    pub message: Option<String>,
    /// String for the REST service, number for auth.
    #[serde(default)]
    pub code: Option<Value>,
}
