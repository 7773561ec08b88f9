//! Admin flag and the session operations that are allowed to change it.
//!
//! The flag starts unauthenticated. Only [`SessionService`] writes it: a
//! session check or sign-in sets it to whether a user is present, sign-out
//! clears it. Everything else holds a clone and reads.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::entities::UserRecord;

/// Shared, read-mostly authorisation flag.
#[derive(Debug, Clone, Default)]
pub struct AdminFlag {
    inner: Arc<AtomicBool>,
}

impl AdminFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, value: bool) {
        self.inner.store(value, Ordering::Release);
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("auth backend error: {0}")]
    Backend(String),
}

impl AuthError {
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<UserRecord>, AuthError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserRecord, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct SessionService {
    auth: Arc<dyn AuthProvider>,
    flag: AdminFlag,
}

impl SessionService {
    pub fn new(auth: Arc<dyn AuthProvider>, flag: AdminFlag) -> Self {
        Self { auth, flag }
    }

    pub fn flag(&self) -> &AdminFlag {
        &self.flag
    }

    /// Ask the backend for the current user and mirror the answer in the flag.
    ///
    /// A failed check leaves the flag cleared.
    pub async fn check_session(&self) -> Result<Option<UserRecord>, AuthError> {
        match self.auth.current_user().await {
            Ok(user) => {
                self.flag.set(user.is_some());
                info!(
                    target = "application::session",
                    admin = user.is_some(),
                    "session checked"
                );
                Ok(user)
            }
            Err(err) => {
                self.flag.set(false);
                warn!(target = "application::session", error = %err, "session check failed");
                Err(err)
            }
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserRecord, AuthError> {
        let user = self.auth.sign_in(credentials).await?;
        self.flag.set(true);
        info!(target = "application::session", user = %user.id, "signed in");
        Ok(user)
    }

    /// Clear the flag, then tell the backend. A remote failure is reported
    /// after the flag is already cleared.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.flag.set(false);
        self.auth.sign_out().await.inspect_err(|err| {
            warn!(target = "application::session", error = %err, "remote sign-out failed");
        })
    }
}
