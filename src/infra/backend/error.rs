use reqwest::StatusCode;
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::application::session::AuthError;
use crate::application::uploads::UploadError;

/// Postgres unique-violation code surfaced by the REST service.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    Header(String),
    #[error("backend returned {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    #[error("no matching row")]
    NotFound,
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn header(err: impl std::fmt::Display) -> Self {
        Self::Header(err.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_timeout())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub fn map_backend_error(err: BackendError) -> RepoError {
    match err {
        err if err.is_timeout() => RepoError::Timeout,
        BackendError::NotFound => RepoError::NotFound,
        BackendError::Status {
            status: StatusCode::NOT_FOUND,
            ..
        } => RepoError::NotFound,
        BackendError::Status {
            status,
            message,
            code,
        } if status == StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION) => {
            RepoError::Duplicate {
                constraint: constraint_name(&message).unwrap_or("unknown").to_string(),
            }
        }
        BackendError::Status {
            status, message, ..
        } if status.is_client_error() => RepoError::Rejected { message },
        BackendError::Decode(message) => RepoError::integrity(message),
        other => RepoError::from_persistence(other),
    }
}

/// Pull the quoted constraint name out of a unique-violation message.
fn constraint_name(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("constraint \"")?;
    rest.split('"').next()
}

impl From<BackendError> for RepoError {
    fn from(err: BackendError) -> Self {
        map_backend_error(err)
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        AuthError::backend(err)
    }
}

impl From<BackendError> for UploadError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status {
                status, message, ..
            } if status.is_client_error() => UploadError::Rejected(message),
            other => UploadError::Transport(other.to_string()),
        }
    }
}
