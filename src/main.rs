use std::{path::Path, process, sync::Arc};

use folio::{
    application::{
        composer::{ComposerDeps, ComposerOptions, PostComposer, SaveOutcome},
        error::{AppError, ErrorReport},
        gate::AdminGate,
        guard::NavigationInterceptor,
        navigation::{Navigator, UnloadDecision},
        notify::{NotificationKind, Notifier},
        repos::{CategoriesRepo, PostsRepo, RepoError, TodosRepo},
        session::{AdminFlag, Credentials, SessionService},
        uploads::UploadSource,
    },
    config::{
        self, Command, ComposeArgs, DraftArgs, EditArgs, SlugArgs, TagsArgs, TodosAction,
        TodosArgs,
    },
    domain::{
        document::RichDocument,
        entities::TodoRecord,
        slug::{SystemClock, derive_slug, derive_slug_with, parse_date_stamp},
        tags::normalize_tags,
    },
    infra::{
        backend::{BackendClient, BackendConfig},
        error::InfraError,
        navigation::{HistoryNavigator, UnloadHooks},
        notify::{FanoutNotifier, NotificationLog, TracingNotifier},
        telemetry,
    },
};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const NEW_POST_PATH: &str = "/admin/posts/new";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("folio", error);
    if dispatcher::has_been_set() {
        error!(error = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.chain(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Compose(args) => run_compose(&settings, *args).await,
        Command::Edit(args) => run_edit(&settings, *args).await,
        Command::Slug(args) => run_slug(args),
        Command::Tags(args) => run_tags(&settings, args),
        Command::Categories(_) => run_categories(&settings).await,
        Command::Todos(args) => run_todos(&settings, args).await,
        Command::Session(_) => run_session(&settings).await,
        Command::Logout(_) => run_logout(&settings).await,
    }
}

/// Backend client, session and notification sinks shared by the authoring
/// commands.
struct AuthoringContext {
    backend: Arc<BackendClient>,
    session: SessionService,
    notifications: NotificationLog,
    notifier: Arc<dyn Notifier>,
    hooks: Arc<UnloadHooks>,
}

impl AuthoringContext {
    async fn connect(settings: &config::Settings) -> Result<Self, AppError> {
        let backend = init_backend(settings)?;
        let session = SessionService::new(backend.clone(), AdminFlag::new());
        establish_session(settings, &session, &backend).await?;

        let notifications = NotificationLog::new();
        let sinks: Vec<Arc<dyn Notifier>> =
            vec![Arc::new(TracingNotifier), Arc::new(notifications.clone())];
        let notifier: Arc<dyn Notifier> = Arc::new(FanoutNotifier::new(sinks));

        Ok(Self {
            backend,
            session,
            notifications,
            notifier,
            hooks: Arc::new(UnloadHooks::new()),
        })
    }

    fn composer_deps(&self) -> ComposerDeps {
        let interceptor: Arc<dyn NavigationInterceptor> = self.hooks.clone();
        ComposerDeps {
            posts: self.backend.clone(),
            uploader: self.backend.clone(),
            interceptor,
            gate: self.gate(),
            notifier: self.notifier.clone(),
            clock: Arc::new(SystemClock),
            runtime: Handle::current(),
        }
    }

    fn gate(&self) -> AdminGate {
        AdminGate::new(self.session.flag().clone(), self.notifier.clone())
    }
}

fn init_backend(settings: &config::Settings) -> Result<Arc<BackendClient>, AppError> {
    let url = settings
        .backend
        .url
        .clone()
        .ok_or_else(|| InfraError::configuration("backend url is not configured"))?;
    let api_key = settings
        .backend
        .api_key
        .clone()
        .ok_or_else(|| InfraError::configuration("backend api key is not configured"))?;

    let client = BackendClient::new(&BackendConfig {
        url,
        api_key,
        storage_bucket: settings.backend.storage_bucket.clone(),
        request_timeout: settings.backend.request_timeout,
    })
    .map_err(|err| InfraError::backend(err.to_string()))?;
    client.set_access_token(settings.session.access_token.clone());

    Ok(Arc::new(client))
}

/// Sign in with configured credentials when no token was supplied, otherwise
/// verify the token. Either way the admin flag reflects the outcome.
async fn establish_session(
    settings: &config::Settings,
    session: &SessionService,
    backend: &BackendClient,
) -> Result<(), AppError> {
    let credentials = match (&settings.session.email, &settings.session.password) {
        (Some(email), Some(password)) if backend.access_token().is_none() => Some(Credentials {
            email: email.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    match credentials {
        Some(credentials) => {
            session.sign_in(&credentials).await?;
        }
        None => {
            session.check_session().await?;
        }
    }
    Ok(())
}

fn composer_options(settings: &config::Settings) -> ComposerOptions {
    ComposerOptions {
        tag_policy: settings.authoring.tag_policy,
        upload_failure: settings.authoring.upload_failure,
    }
}

async fn run_compose(settings: &config::Settings, args: ComposeArgs) -> Result<(), AppError> {
    let ctx = AuthoringContext::connect(settings).await?;
    let navigator = HistoryNavigator::new(ctx.hooks.clone(), NEW_POST_PATH);
    let mut composer = PostComposer::new(ctx.composer_deps(), composer_options(settings));

    apply_draft_args(&mut composer, &args.draft).await?;
    let outcome = composer.save().await?;
    leave_editor(&ctx, &navigator, &outcome);
    print_json(&outcome.record())
}

async fn run_edit(settings: &config::Settings, args: EditArgs) -> Result<(), AppError> {
    let ctx = AuthoringContext::connect(settings).await?;
    let record = PostsRepo::find_by_id(ctx.backend.as_ref(), args.id)
        .await?
        .ok_or(AppError::NotFound)?;
    let navigator = HistoryNavigator::new(
        ctx.hooks.clone(),
        format!("/admin/posts/{}/edit", record.id),
    );
    let mut composer =
        PostComposer::hydrate(ctx.composer_deps(), composer_options(settings), &record);

    apply_draft_args(&mut composer, &args.draft).await?;
    let outcome = composer.save().await?;
    if matches!(outcome, SaveOutcome::Unchanged) {
        info!(target = "folio::edit", post_id = %record.id, "no changes to save");
    }
    leave_editor(&ctx, &navigator, &outcome);
    print_json(&outcome.record().unwrap_or(&record))
}

async fn apply_draft_args(composer: &mut PostComposer, draft: &DraftArgs) -> Result<(), AppError> {
    if let Some(title) = draft.title.as_ref() {
        composer.set_title(title.as_str())?;
    }
    if let Some(path) = draft.body_file.as_ref() {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?;
        composer.edit_body(|body| *body = RichDocument::from_plain_text(&text))?;
    }
    if let Some(tags) = draft.tags.as_ref() {
        composer.set_tags_text(tags)?;
    }
    if let Some(category) = draft.category.as_ref() {
        composer.set_category(Some(category.as_str()))?;
    }

    // Uploaded objects outlive a refused save.
    if !draft.images.is_empty() {
        composer.authorize_save()?;
    }
    for path in &draft.images {
        let source = read_image(path).await?;
        let alt = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
        let index = composer.draft().body.len();
        composer.insert_image(index, source, alt)?;
    }

    if composer.uploads_in_flight() > 0 {
        let applied = composer.settle_uploads().await;
        info!(
            target = "folio::uploads",
            applied,
            pending = composer.pending_uploads().len(),
            "image uploads settled"
        );
    }
    Ok(())
}

async fn read_image(path: &Path) -> Result<UploadSource, AppError> {
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    if content_type.type_() != mime_guess::mime::IMAGE {
        return Err(AppError::validation(format!(
            "{} is not an image ({})",
            path.display(),
            content_type.essence_str()
        )));
    }
    let bytes = tokio::fs::read(path).await.map_err(InfraError::from)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(UploadSource::new(
        file_name,
        content_type.essence_str(),
        bytes,
    ))
}

/// Leave the editor the way the browser front end would: move to the saved
/// post, which only prompts when something is still unsaved.
fn leave_editor(ctx: &AuthoringContext, navigator: &HistoryNavigator, outcome: &SaveOutcome) {
    if let Some(record) = outcome.record() {
        let target = format!("/posts/{}", record.slug);
        if navigator.navigate(&target, &|| false) == UnloadDecision::Stay {
            warn!(
                target = "folio::navigation",
                path = %navigator.current_path(),
                "unsaved changes remain after save"
            );
        }
    }

    let errors = ctx.notifications.count(NotificationKind::Error);
    if errors > 0 {
        warn!(
            target = "folio::notify",
            errors, "command finished with error notifications"
        );
    }
}

fn run_slug(args: SlugArgs) -> Result<(), AppError> {
    let slug = match args.date.as_deref() {
        Some(date) => derive_slug(&args.title, parse_date_stamp(date)?),
        None => derive_slug_with(&args.title, &SystemClock),
    };
    println!("{slug}");
    Ok(())
}

fn run_tags(settings: &config::Settings, args: TagsArgs) -> Result<(), AppError> {
    print_json(&normalize_tags(&args.raw, settings.authoring.tag_policy))
}

async fn run_categories(settings: &config::Settings) -> Result<(), AppError> {
    let backend = init_backend(settings)?;
    let categories = backend.list_categories().await?;
    print_json(&categories)
}

async fn run_todos(settings: &config::Settings, args: TodosArgs) -> Result<(), AppError> {
    let action = match args.action {
        None | Some(TodosAction::List) => {
            let backend = init_backend(settings)?;
            return print_json(&backend.list_todos().await?);
        }
        Some(action) => action,
    };

    let ctx = AuthoringContext::connect(settings).await?;
    let backend = ctx.backend.clone();
    let changed = ctx
        .gate()
        .run(todo_action_name(&action), || {
            apply_todo_action(&*backend, action)
        })
        .await??;
    print_json(&changed)
}

fn todo_action_name(action: &TodosAction) -> &'static str {
    match action {
        TodosAction::List => "todo.list",
        TodosAction::Add { .. } => "todo.add",
        TodosAction::Done { .. } => "todo.complete",
        TodosAction::Undo { .. } => "todo.reopen",
        TodosAction::Delete { .. } => "todo.delete",
    }
}

async fn apply_todo_action(
    todos: &dyn TodosRepo,
    action: TodosAction,
) -> Result<Option<TodoRecord>, RepoError> {
    match action {
        TodosAction::List => Ok(None),
        TodosAction::Add { task } => todos.insert_todo(&task).await.map(Some),
        TodosAction::Done { id } => todos.set_todo_complete(id, true).await.map(Some),
        TodosAction::Undo { id } => todos.set_todo_complete(id, false).await.map(Some),
        TodosAction::Delete { id } => todos.delete_todo(id).await.map(|()| None),
    }
}

async fn run_session(settings: &config::Settings) -> Result<(), AppError> {
    let backend = init_backend(settings)?;
    let session = SessionService::new(backend.clone(), AdminFlag::new());
    let user = session.check_session().await?;

    #[derive(Serialize)]
    struct SessionReport<'a> {
        admin: bool,
        user_id: Option<String>,
        email: Option<&'a str>,
    }

    print_json(&SessionReport {
        admin: session.flag().is_admin(),
        user_id: user.as_ref().map(|user| user.id.to_string()),
        email: user.as_ref().and_then(|user| user.email.as_deref()),
    })
}

async fn run_logout(settings: &config::Settings) -> Result<(), AppError> {
    let backend = init_backend(settings)?;
    let session = SessionService::new(backend.clone(), AdminFlag::new());
    session.sign_out().await?;
    info!(target = "folio::logout", "signed out");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
