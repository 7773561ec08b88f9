//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    AuthoringOverrides, BackendArgs, BackendOverrides, CliArgs, Command, ComposeArgs, DraftArgs,
    EditArgs, LoggingOverrides, SlugArgs, TagsArgs, TodosAction, TodosArgs,
};

use std::{fmt, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::uploads::UploadFailurePolicy;
use crate::domain::tags::TagPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const ENV_PREFIX: &str = "FOLIO";
const DEFAULT_STORAGE_BUCKET: &str = "images";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub backend: BackendSettings,
    pub session: SessionSettings,
    pub authoring: AuthoringSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: Option<Url>,
    pub api_key: Option<String>,
    pub storage_bucket: String,
    pub request_timeout: Duration,
}

#[derive(Clone, Default)]
pub struct SessionSettings {
    pub email: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoringSettings {
    pub tag_policy: TagPolicy,
    pub upload_failure: UploadFailurePolicy,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_logging_overrides(&cli.logging);
    match &cli.command {
        Command::Compose(args) => {
            raw.apply_backend_overrides(&args.overrides);
            raw.apply_authoring_overrides(&args.authoring);
        }
        Command::Edit(args) => {
            raw.apply_backend_overrides(&args.overrides);
            raw.apply_authoring_overrides(&args.authoring);
        }
        Command::Tags(args) => raw.apply_authoring_overrides(&args.authoring),
        Command::Todos(args) => raw.apply_backend_overrides(&args.overrides),
        Command::Categories(args) | Command::Session(args) | Command::Logout(args) => {
            raw.apply_backend_overrides(&args.overrides)
        }
        Command::Slug(_) => {}
    }

    Settings::from_raw(raw)
}

/// Parse the process arguments and load settings for them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    backend: RawBackendSettings,
    session: RawSessionSettings,
    authoring: RawAuthoringSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_backend_overrides(&mut self, overrides: &BackendOverrides) {
        if let Some(url) = overrides.backend_url.as_ref() {
            self.backend.url = Some(url.clone());
        }
        if let Some(key) = overrides.backend_api_key.as_ref() {
            self.backend.api_key = Some(key.clone());
        }
        if let Some(bucket) = overrides.storage_bucket.as_ref() {
            self.backend.storage_bucket = Some(bucket.clone());
        }
        if let Some(seconds) = overrides.request_timeout_seconds {
            self.backend.request_timeout_seconds = Some(seconds);
        }
        if let Some(email) = overrides.email.as_ref() {
            self.session.email = Some(email.clone());
        }
        if let Some(token) = overrides.access_token.as_ref() {
            self.session.access_token = Some(token.clone());
        }
    }

    fn apply_authoring_overrides(&mut self, overrides: &AuthoringOverrides) {
        if let Some(policy) = overrides.tag_policy.as_ref() {
            self.authoring.tag_policy = Some(policy.clone());
        }
        if let Some(policy) = overrides.upload_failure.as_ref() {
            self.authoring.upload_failure = Some(policy.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            backend,
            session,
            authoring,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            backend: build_backend_settings(backend)?,
            session: build_session_settings(session),
            authoring: build_authoring_settings(authoring)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let url = match non_blank(backend.url) {
        Some(value) => {
            let url = Url::parse(&value)
                .map_err(|err| LoadError::invalid("backend.url", format!("invalid URL: {err}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "backend.url",
                    "scheme must be http or https",
                ));
            }
            Some(url)
        }
        None => None,
    };

    let storage_bucket = non_blank(backend.storage_bucket)
        .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string());
    if storage_bucket.contains('/') {
        return Err(LoadError::invalid(
            "backend.storage_bucket",
            "bucket name must not contain `/`",
        ));
    }

    let timeout_secs = backend
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "backend.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(BackendSettings {
        url,
        api_key: non_blank(backend.api_key),
        storage_bucket,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_session_settings(session: RawSessionSettings) -> SessionSettings {
    SessionSettings {
        email: non_blank(session.email),
        password: session.password.filter(|value| !value.is_empty()),
        access_token: non_blank(session.access_token),
    }
}

fn build_authoring_settings(
    authoring: RawAuthoringSettings,
) -> Result<AuthoringSettings, LoadError> {
    let tag_policy = match authoring.tag_policy {
        Some(value) => TagPolicy::from_str(&value)
            .map_err(|reason| LoadError::invalid("authoring.tag_policy", reason))?,
        None => TagPolicy::default(),
    };
    let upload_failure = match authoring.upload_failure {
        Some(value) => UploadFailurePolicy::from_str(&value)
            .map_err(|reason| LoadError::invalid("authoring.upload_failure", reason))?,
        None => UploadFailurePolicy::default(),
    };

    Ok(AuthoringSettings {
        tag_policy,
        upload_failure,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    url: Option<String>,
    api_key: Option<String>,
    storage_bucket: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    email: Option<String>,
    password: Option<String>,
    access_token: Option<String>,
}

impl fmt::Debug for RawSessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSessionSettings")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthoringSettings {
    tag_policy: Option<String>,
    upload_failure: Option<String>,
}

#[cfg(test)]
mod tests;
