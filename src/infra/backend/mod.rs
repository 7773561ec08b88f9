//! Hosted backend adapter: REST tables, auth and object storage behind one
//! HTTP client.

mod auth;
mod catalog;
mod error;
mod posts;
mod storage;

pub use error::{BackendError, map_backend_error};
pub use storage::{object_path, public_object_url};

use std::time::Duration;

use folio_api_types::ApiErrorBody;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::RwLock;
use tracing::debug;

use crate::util::lock::{rw_read, rw_write};

const API_KEY_HEADER: &str = "apikey";
const PREFER_HEADER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

pub(crate) const REST_PREFIX: &str = "/rest/v1/";
pub(crate) const AUTH_PREFIX: &str = "/auth/v1/";
pub(crate) const STORAGE_PREFIX: &str = "/storage/v1/";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub api_key: String,
    pub storage_bucket: String,
    pub request_timeout: Duration,
}

/// HTTP client for the hosted backend.
///
/// Requests authenticate with the project key; once a user session exists
/// its access token replaces the key in the `Authorization` header.
#[derive(Debug)]
pub struct BackendClient {
    client: Client,
    base: Url,
    api_key: String,
    bucket: String,
    access_token: RwLock<Option<String>>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base = config.url.join("/")?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            api_key: config.api_key.clone(),
            bucket: config.storage_bucket.clone(),
            access_token: RwLock::new(None),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Use `token` for subsequent requests instead of the project key.
    pub fn set_access_token(&self, token: Option<String>) {
        *rw_write(&self.access_token, "infra::backend", "set_access_token") = token;
    }

    pub fn access_token(&self) -> Option<String> {
        rw_read(&self.access_token, "infra::backend", "access_token").clone()
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, BackendError> {
        self.base.join(path).map_err(BackendError::Url)
    }

    fn bearer(&self) -> String {
        self.access_token().unwrap_or_else(|| self.api_key.clone())
    }

    fn headers(&self) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&self.api_key).map_err(BackendError::header)?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.bearer()))
                .map_err(BackendError::header)?,
        );
        Ok(headers)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, BackendError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.set_query(None);
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        debug!(target = "infra::backend", %method, url = %url, "backend request");
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    /// Send a table request that returns the affected rows.
    pub(crate) async fn rest<T: DeserializeOwned>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, BackendError> {
        let mut req = self
            .request(method, &format!("{REST_PREFIX}{table}"), query)?
            .header(PREFER_HEADER, RETURN_REPRESENTATION);
        if let Some(body) = body {
            req = req.json(&body);
        }
        Self::handle(req.send().await?).await
    }

    pub(crate) async fn rest_unit(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<(), BackendError> {
        let resp = self
            .request(method, &format!("{REST_PREFIX}{table}"), query)?
            .send()
            .await?;
        Self::handle_unit(resp).await
    }

    pub(crate) async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| BackendError::Decode(format!("failed to parse body: {err}")))
    }

    pub(crate) async fn handle_unit(resp: Response) -> Result<(), BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = resp.bytes().await?;
        Err(Self::status_error(status, &bytes))
    }

    fn status_error(status: StatusCode, bytes: &[u8]) -> BackendError {
        let body: ApiErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned());
        let code = body.code.map(|code| match code {
            Value::String(text) => text,
            other => other.to_string(),
        });
        BackendError::Status {
            status,
            message,
            code,
        }
    }
}

/// Exactly one row is expected back from a filtered mutation or lookup.
pub(crate) fn single_row<T>(rows: Vec<T>) -> Result<T, BackendError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(BackendError::NotFound),
        (Some(_), count) => Err(BackendError::Decode(format!(
            "expected one row, backend returned {count}"
        ))),
    }
}

pub(crate) fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}
