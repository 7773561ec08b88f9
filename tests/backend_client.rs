use std::time::Duration;

use httpmock::MockServer;
use url::Url;
use uuid::Uuid;

use folio::application::repos::{
    CategoriesRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, TodosRepo,
    UpdatePostParams,
};
use folio::application::session::{AdminFlag, AuthError, AuthProvider, Credentials, SessionService};
use folio::application::uploads::{ImageUploader, UploadError, UploadSource};
use folio::domain::document::RichDocument;
use folio::infra::backend::{BackendClient, BackendConfig};

const POST_ID: &str = "7d0c3f2e-1b4a-4c55-9a57-2f7f1d1c0b11";

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(&BackendConfig {
        url: Url::parse(&server.base_url()).expect("url"),
        api_key: "anon-key".into(),
        storage_bucket: "images".into(),
        request_timeout: Duration::from_secs(5),
    })
    .expect("client")
}

fn post_row(title: &str, content: &str) -> String {
    format!(
        r#"[{{"id":"{POST_ID}","slug":"2024-05-01-hello","title":"{title}","content":{content},"tags":["rust"],"category":null,"created_at":"2024-05-01T10:00:00Z"}}]"#
    )
}

#[tokio::test]
async fn insert_post_sends_representation_request() -> Result<(), RepoError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/rest/v1/posts")
            .header("apikey", "anon-key")
            .header("authorization", "Bearer anon-key")
            .header("prefer", "return=representation")
            .json_body_includes(r#"{"slug":"2024-05-01-hello","title":"Hello","tags":["rust"]}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(post_row(
                "Hello",
                r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hi"}]}]}"#,
            ));
    });

    let record = client(&server)
        .insert_post(CreatePostParams {
            slug: "2024-05-01-hello".into(),
            title: "Hello".into(),
            body: RichDocument::from_plain_text("Hi"),
            tags: vec!["rust".into()],
            category: None,
        })
        .await?;

    mock.assert();
    assert_eq!(record.id, Uuid::parse_str(POST_ID).expect("uuid"));
    assert_eq!(record.body, RichDocument::from_plain_text("Hi"));
    assert!(record.created_at.is_some());
    Ok(())
}

#[tokio::test]
async fn update_post_filters_by_id_and_omits_slug() -> Result<(), RepoError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("PATCH")
            .path("/rest/v1/posts")
            .query_param("id", format!("eq.{POST_ID}"))
            .json_body_includes(r#"{"title":"Renamed"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(post_row("Renamed", r#"{"type":"doc","content":[]}"#));
    });

    let record = client(&server)
        .update_post(UpdatePostParams {
            id: Uuid::parse_str(POST_ID).expect("uuid"),
            title: "Renamed".into(),
            body: RichDocument::default(),
            tags: vec!["rust".into()],
            category: None,
        })
        .await?;

    mock.assert();
    assert_eq!(record.slug, "2024-05-01-hello");
    assert_eq!(record.title, "Renamed");
    Ok(())
}

#[tokio::test]
async fn find_by_id_lifts_legacy_text_and_handles_missing_rows() -> Result<(), RepoError> {
    let server = MockServer::start();
    let found = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/posts")
            .query_param("id", format!("eq.{POST_ID}"));
        then.status(200)
            .header("content-type", "application/json")
            .body(post_row("Old", r#""first paragraph\n\nsecond paragraph""#));
    });
    let missing = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/posts")
            .query_param("slug", "eq.nope");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let client = client(&server);
    let record = client
        .find_by_id(Uuid::parse_str(POST_ID).expect("uuid"))
        .await?
        .expect("row");
    assert_eq!(record.body.len(), 2);
    assert!(client.find_by_slug("nope").await?.is_none());

    found.assert();
    missing.assert();
    Ok(())
}

#[tokio::test]
async fn legacy_rows_with_null_tags_still_load() -> Result<(), RepoError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/posts")
            .query_param("slug", "eq.2020-01-01-old");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(
                r#"[{{"id":"{POST_ID}","slug":"2020-01-01-old","title":"Old","content":null,"tags":null,"category":null}}]"#
            ));
    });

    let record = client(&server)
        .find_by_slug("2020-01-01-old")
        .await?
        .expect("row");

    mock.assert();
    assert!(record.tags.is_empty());
    assert!(record.body.is_empty());
    Ok(())
}

#[tokio::test]
async fn unique_violation_maps_to_duplicate() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/rest/v1/posts");
        then.status(409)
            .header("content-type", "application/json")
            .body(r#"{"code":"23505","message":"duplicate key value violates unique constraint \"posts_slug_key\""}"#);
    });

    let err = client(&server)
        .insert_post(CreatePostParams {
            slug: "2024-05-01-hello".into(),
            title: "Hello".into(),
            body: RichDocument::default(),
            tags: Vec::new(),
            category: None,
        })
        .await
        .expect_err("duplicate slug");
    match err {
        RepoError::Duplicate { constraint } => assert_eq!(constraint, "posts_slug_key"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn categories_and_todos_are_ordered_by_the_backend() -> Result<(), RepoError> {
    let server = MockServer::start();
    let categories = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/categories")
            .query_param("order", "name.asc");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":2,"name":"essays"},{"id":1,"name":"notes"}]"#);
    });
    let todos = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/todo")
            .query_param("order", "id.asc");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1,"task":"write","is_complete":false,"inserted_at":null}]"#);
    });

    let client = client(&server);
    let names: Vec<String> = client
        .list_categories()
        .await?
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["essays".to_string(), "notes".to_string()]);
    assert_eq!(client.list_todos().await?.len(), 1);

    categories.assert();
    todos.assert();
    Ok(())
}

#[tokio::test]
async fn todo_mutations_target_single_rows() -> Result<(), RepoError> {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method("POST")
            .path("/rest/v1/todo")
            .json_body_includes(r#"{"task":"proofread"}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"[{"id":3,"task":"proofread","is_complete":false}]"#);
    });
    let toggle = server.mock(|when, then| {
        when.method("PATCH")
            .path("/rest/v1/todo")
            .query_param("id", "eq.3")
            .json_body_includes(r#"{"is_complete":true}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":3,"task":"proofread","is_complete":true}]"#);
    });
    let delete = server.mock(|when, then| {
        when.method("DELETE")
            .path("/rest/v1/todo")
            .query_param("id", "eq.3");
        then.status(204);
    });

    let client = client(&server);
    let todo = client.insert_todo("  proofread ").await?;
    assert_eq!(todo.id, 3);
    assert!(client.set_todo_complete(3, true).await?.is_complete);
    client.delete_todo(3).await?;
    assert!(matches!(
        client.insert_todo("   ").await,
        Err(RepoError::Rejected { .. })
    ));

    add.assert();
    toggle.assert();
    delete.assert();
    Ok(())
}

#[tokio::test]
async fn sign_in_stores_token_and_session_check_uses_it() -> Result<(), AuthError> {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method("POST")
            .path("/auth/v1/token")
            .query_param("grant_type", "password")
            .json_body_includes(r#"{"email":"admin@example.com"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(
                r#"{{"access_token":"jwt-token","refresh_token":"r","user":{{"id":"{POST_ID}","email":"admin@example.com"}}}}"#
            ));
    });
    let user = server.mock(|when, then| {
        when.method("GET")
            .path("/auth/v1/user")
            .header("authorization", "Bearer jwt-token");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(r#"{{"id":"{POST_ID}","email":"admin@example.com"}}"#));
    });

    let backend = std::sync::Arc::new(client(&server));
    let session = SessionService::new(backend.clone(), AdminFlag::new());
    session
        .sign_in(&Credentials {
            email: "admin@example.com".into(),
            password: "secret".into(),
        })
        .await?;
    assert_eq!(backend.access_token().as_deref(), Some("jwt-token"));
    assert!(session.flag().is_admin());

    let current = session.check_session().await?;
    assert_eq!(
        current.and_then(|user| user.email).as_deref(),
        Some("admin@example.com")
    );

    token.assert();
    user.assert();
    Ok(())
}

#[tokio::test]
async fn rejected_password_is_invalid_credentials() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/auth/v1/token");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
    });

    let client = client(&server);
    let err = client
        .sign_in(&Credentials {
            email: "admin@example.com".into(),
            password: "wrong".into(),
        })
        .await
        .expect_err("rejected");
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(client.access_token().is_none());
}

#[tokio::test]
async fn session_check_without_token_skips_the_backend() -> Result<(), AuthError> {
    let server = MockServer::start();
    let user = server.mock(|when, then| {
        when.method("GET").path("/auth/v1/user");
        then.status(200).body("{}");
    });

    assert!(client(&server).current_user().await?.is_none());
    assert_eq!(user.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn expired_token_reads_as_signed_out() -> Result<(), AuthError> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/auth/v1/user");
        then.status(401)
            .header("content-type", "application/json")
            .body(r#"{"code":401,"msg":"JWT expired"}"#);
    });

    let client = client(&server);
    client.set_access_token(Some("stale".into()));
    assert!(client.current_user().await?.is_none());
    assert!(client.access_token().is_none());
    Ok(())
}

#[tokio::test]
async fn sign_out_forgets_token_even_when_backend_fails() {
    let server = MockServer::start();
    let logout = server.mock(|when, then| {
        when.method("POST")
            .path("/auth/v1/logout")
            .header("authorization", "Bearer jwt-token");
        then.status(500).body("oops");
    });

    let client = client(&server);
    client.set_access_token(Some("jwt-token".into()));
    assert!(client.sign_out().await.is_err());
    assert!(client.access_token().is_none());
    logout.assert();
}

#[tokio::test]
async fn image_upload_returns_public_url() -> Result<(), UploadError> {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method("POST")
            .header("content-type", "image/png")
            .header("apikey", "anon-key");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"Key":"images/some-object.png"}"#);
    });

    let url = client(&server)
        .upload(UploadSource::new(
            "Cat Photo.PNG",
            "image/png",
            vec![0x89, b'P', b'N', b'G'],
        ))
        .await?;

    upload.assert();
    let prefix = format!("{}/storage/v1/object/public/images/", server.base_url());
    assert!(url.starts_with(&prefix), "{url}");
    assert!(url.ends_with("-cat-photo.png"), "{url}");
    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST");
        then.status(413)
            .header("content-type", "application/json")
            .body(r#"{"statusCode":"413","error":"Payload too large","message":"The object exceeded the maximum allowed size"}"#);
    });

    let err = client(&server)
        .upload(UploadSource::new("huge.png", "image/png", vec![0; 16]))
        .await
        .expect_err("too large");
    assert!(matches!(err, UploadError::Rejected(message) if message.contains("maximum allowed size")));
}
