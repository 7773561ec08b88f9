use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio blog authoring client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Write a new post and publish it.
    Compose(Box<ComposeArgs>),
    /// Load an existing post, apply changes and save it.
    Edit(Box<EditArgs>),
    /// Print the slug a title would be saved under.
    Slug(SlugArgs),
    /// Print the normalized form of a comma-separated tag list.
    Tags(TagsArgs),
    /// List post categories.
    Categories(BackendArgs),
    /// Manage the todo list.
    Todos(TodosArgs),
    /// Report whether the configured session grants admin rights.
    Session(BackendArgs),
    /// End the configured session.
    Logout(BackendArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendOverrides {
    /// Override the backend project URL.
    #[arg(long = "backend-url", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the backend project key.
    #[arg(long = "backend-api-key", value_name = "KEY")]
    pub backend_api_key: Option<String>,

    /// Override the storage bucket that receives images.
    #[arg(long = "storage-bucket", value_name = "BUCKET")]
    pub storage_bucket: Option<String>,

    /// Override the per-request timeout.
    #[arg(long = "request-timeout-seconds", value_name = "SECONDS")]
    pub request_timeout_seconds: Option<u64>,

    /// Override the sign-in email.
    #[arg(long = "email", value_name = "EMAIL")]
    pub email: Option<String>,

    /// Reuse an existing session token instead of signing in.
    #[arg(long = "access-token", value_name = "TOKEN")]
    pub access_token: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct AuthoringOverrides {
    /// How repeated tags are treated (dedup|keep_duplicates).
    #[arg(long = "tag-policy", value_name = "POLICY")]
    pub tag_policy: Option<String>,

    /// What happens to an image whose upload failed (remove|mark_failed).
    #[arg(long = "upload-failure", value_name = "POLICY")]
    pub upload_failure: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendArgs {
    #[command(flatten)]
    pub overrides: BackendOverrides,
}

/// Draft fields shared by `compose` and `edit`.
#[derive(Debug, Args, Default, Clone)]
pub struct DraftArgs {
    /// Post title.
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Plain-text body; paragraphs are separated by blank lines.
    #[arg(long = "body-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub body_file: Option<PathBuf>,

    /// Comma-separated tags.
    #[arg(long, value_name = "TAGS")]
    pub tags: Option<String>,

    /// Category name; an empty value clears it.
    #[arg(long, value_name = "NAME")]
    pub category: Option<String>,

    /// Image files appended to the body, uploaded before saving.
    #[arg(long = "image", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub overrides: BackendOverrides,

    #[command(flatten)]
    pub authoring: AuthoringOverrides,

    #[command(flatten)]
    pub draft: DraftArgs,
}

#[derive(Debug, Args, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub overrides: BackendOverrides,

    #[command(flatten)]
    pub authoring: AuthoringOverrides,

    /// Id of the post to edit.
    #[arg(value_name = "ID")]
    pub id: Uuid,

    #[command(flatten)]
    pub draft: DraftArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SlugArgs {
    /// Title to derive the slug from.
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Calendar date for the prefix (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct TagsArgs {
    #[command(flatten)]
    pub authoring: AuthoringOverrides,

    /// Raw comma-separated tag text.
    #[arg(value_name = "RAW", allow_hyphen_values = true)]
    pub raw: String,
}

#[derive(Debug, Args, Clone)]
pub struct TodosArgs {
    #[command(flatten)]
    pub overrides: BackendOverrides,

    #[command(subcommand)]
    pub action: Option<TodosAction>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum TodosAction {
    /// List todos in insertion order.
    List,
    /// Add a todo.
    Add {
        #[arg(value_name = "TASK")]
        task: String,
    },
    /// Mark a todo complete.
    Done {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Mark a todo incomplete.
    Undo {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Delete a todo.
    Delete {
        #[arg(value_name = "ID")]
        id: i64,
    },
}
