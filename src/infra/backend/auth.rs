use async_trait::async_trait;
use folio_api_types::{AuthUser, PasswordGrantRequest, TokenResponse};
use reqwest::{Method, StatusCode};
use tracing::{debug, info};

use crate::application::session::{AuthError, AuthProvider, Credentials};
use crate::domain::entities::UserRecord;

use super::{AUTH_PREFIX, BackendClient, BackendError};

#[async_trait]
impl AuthProvider for BackendClient {
    async fn current_user(&self) -> Result<Option<UserRecord>, AuthError> {
        if self.access_token().is_none() {
            debug!(target = "infra::backend::auth", "no session token held");
            return Ok(None);
        }

        let resp = self
            .request(Method::GET, &format!("{AUTH_PREFIX}user"), &[])?
            .send()
            .await
            .map_err(BackendError::from)?;
        match BackendClient::handle::<AuthUser>(resp).await {
            Ok(user) => Ok(Some(user_record(user))),
            Err(err) if is_session_rejection(&err) => {
                debug!(
                    target = "infra::backend::auth",
                    error = %err,
                    "session token no longer accepted"
                );
                self.set_access_token(None);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<UserRecord, AuthError> {
        let grant = PasswordGrantRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        };
        let resp = self
            .request(
                Method::POST,
                &format!("{AUTH_PREFIX}token"),
                &[("grant_type", "password".to_string())],
            )?
            .json(&grant)
            .send()
            .await
            .map_err(BackendError::from)?;

        let token = match BackendClient::handle::<TokenResponse>(resp).await {
            Ok(token) => token,
            Err(err) if is_credential_rejection(&err) => {
                info!(
                    target = "infra::backend::auth",
                    email = %credentials.email,
                    "password grant rejected"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(err.into()),
        };

        self.set_access_token(Some(token.access_token));
        Ok(user_record(token.user))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        // Headers are captured while the token is still held.
        let request = self.request(Method::POST, &format!("{AUTH_PREFIX}logout"), &[]);
        self.set_access_token(None);

        let resp = request?
            .send()
            .await
            .map_err(BackendError::from)?;
        BackendClient::handle_unit(resp).await?;
        Ok(())
    }
}

fn user_record(user: AuthUser) -> UserRecord {
    UserRecord {
        id: user.id,
        email: user.email,
    }
}

fn is_session_rejection(err: &BackendError) -> bool {
    matches!(
        err.status(),
        Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    )
}

fn is_credential_rejection(err: &BackendError) -> bool {
    matches!(
        err.status(),
        Some(StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY)
    )
}
