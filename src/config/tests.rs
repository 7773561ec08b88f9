use std::io::Write;

use super::*;

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::parse_from(args)
}

#[test]
fn defaults_resolve_without_backend() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.backend.url.is_none());
    assert_eq!(settings.backend.storage_bucket, DEFAULT_STORAGE_BUCKET);
    assert_eq!(
        settings.backend.request_timeout,
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
    );
    assert_eq!(settings.authoring.tag_policy, TagPolicy::Dedup);
    assert_eq!(
        settings.authoring.upload_failure,
        UploadFailurePolicy::Remove
    );
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.backend.url = Some("https://file.example.co".to_string());
    raw.logging.level = Some("info".to_string());

    raw.apply_backend_overrides(&BackendOverrides {
        backend_url: Some("https://cli.example.co".to_string()),
        ..Default::default()
    });
    raw.apply_logging_overrides(&LoggingOverrides {
        log_level: Some("debug".to_string()),
        log_json: Some(true),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.backend.url.expect("url").as_str(),
        "https://cli.example.co/"
    );
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn authoring_policies_parse_and_reject_unknown_values() {
    let mut raw = RawSettings::default();
    raw.apply_authoring_overrides(&AuthoringOverrides {
        tag_policy: Some("keep_duplicates".to_string()),
        upload_failure: Some("mark_failed".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.authoring.tag_policy, TagPolicy::KeepDuplicates);
    assert_eq!(
        settings.authoring.upload_failure,
        UploadFailurePolicy::MarkFailed
    );

    let mut raw = RawSettings::default();
    raw.authoring.tag_policy = Some("lowercase".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown policy");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "authoring.tag_policy",
            ..
        }
    ));
}

#[test]
fn backend_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.backend.url = Some("ftp://example.co".to_string());
    let err = Settings::from_raw(raw).expect_err("bad scheme");
    assert!(matches!(err, LoadError::Invalid { key: "backend.url", .. }));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.backend.request_timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_session_values_are_dropped() {
    let mut raw = RawSettings::default();
    raw.session.email = Some("   ".to_string());
    raw.session.access_token = Some("token".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.session.email.is_none());
    assert_eq!(settings.session.access_token.as_deref(), Some("token"));
    assert!(!format!("{:?}", settings.session).contains("\"token\""));
}

#[test]
fn config_file_is_layered_under_cli_flags() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[backend]\nurl = \"https://file.example.co\"\nstorage_bucket = \"media\"\n\n[authoring]\nupload_failure = \"mark_failed\""
    )
    .expect("write config");
    let path = file.path().to_str().expect("utf-8 path").to_string();

    let args = parse(&[
        "folio",
        "--config-file",
        &path,
        "compose",
        "--storage-bucket",
        "covers",
        "--title",
        "Hello",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(
        settings.backend.url.expect("url").host_str(),
        Some("file.example.co")
    );
    assert_eq!(settings.backend.storage_bucket, "covers");
    assert_eq!(
        settings.authoring.upload_failure,
        UploadFailurePolicy::MarkFailed
    );
}

#[test]
fn parse_compose_arguments() {
    let args = parse(&[
        "folio",
        "compose",
        "--title",
        "Hello World",
        "--tags",
        "rust, web",
        "--image",
        "a.png",
        "--image",
        "b.jpg",
        "--tag-policy",
        "dedup",
    ]);

    match args.command {
        Command::Compose(compose) => {
            assert_eq!(compose.draft.title.as_deref(), Some("Hello World"));
            assert_eq!(compose.draft.tags.as_deref(), Some("rust, web"));
            assert_eq!(compose.draft.images.len(), 2);
            assert_eq!(compose.authoring.tag_policy.as_deref(), Some("dedup"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_edit_requires_post_id() {
    assert!(CliArgs::try_parse_from(["folio", "edit"]).is_err());

    let args = parse(&[
        "folio",
        "edit",
        "00000000-0000-0000-0000-000000000000",
        "--category",
        "",
    ]);
    match args.command {
        Command::Edit(edit) => {
            assert!(edit.id.is_nil());
            assert_eq!(edit.draft.category.as_deref(), Some(""));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_todos_subcommands_and_global_logging_flags() {
    let args = parse(&["folio", "todos", "done", "7", "--log-level", "warn"]);
    assert_eq!(args.logging.log_level.as_deref(), Some("warn"));
    match args.command {
        Command::Todos(todos) => {
            assert!(matches!(todos.action, Some(TodosAction::Done { id: 7 })));
        }
        _ => panic!("wrong command parsed"),
    }

    let args = parse(&["folio", "todos"]);
    assert!(matches!(
        args.command,
        Command::Todos(TodosArgs { action: None, .. })
    ));
}
