use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use std::io::Write;

fn folio() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("folio"));
    cmd.env_remove("FOLIO_BACKEND__URL")
        .env_remove("FOLIO_BACKEND__API_KEY")
        .env_remove("FOLIO_SESSION__ACCESS_TOKEN")
        .env_remove("FOLIO_SESSION__EMAIL")
        .env_remove("FOLIO_SESSION__PASSWORD")
        .env_remove("FOLIO_CONFIG_FILE");
    cmd
}

#[test]
fn slug_is_date_prefixed() {
    folio()
        .args(["slug", "Hello, World!", "--date", "2024-05-01"])
        .assert()
        .success()
        .stdout("2024-05-01-hello-world\n");
}

#[test]
fn malformed_date_is_rejected() {
    folio()
        .args(["slug", "Hello", "--date", "May 1st"])
        .assert()
        .failure();
}

#[test]
fn tags_are_trimmed_and_deduplicated() {
    let assert = folio().args(["tags", " rust, web ,,rust "]).assert().success();
    let tags: Vec<String> =
        serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(tags, vec!["rust".to_string(), "web".to_string()]);
}

#[test]
fn tag_policy_can_keep_duplicates() {
    let assert = folio()
        .args(["tags", "--tag-policy", "keep_duplicates", "rust,rust"])
        .assert()
        .success();
    let tags: Vec<String> =
        serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(tags.len(), 2);
}

#[test]
fn categories_work_end_to_end() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/categories")
            .header("apikey", "anon-key");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"id":1,"name":"essays"}]"#);
    });

    let assert = folio()
        .env("FOLIO_BACKEND__URL", server.base_url())
        .env("FOLIO_BACKEND__API_KEY", "anon-key")
        .arg("categories")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"name\": \"essays\""));
    mock.assert();
}

#[test]
fn session_without_credentials_is_not_admin() {
    let server = MockServer::start();
    let assert = folio()
        .args(["session", "--backend-url", &server.base_url()])
        .args(["--backend-api-key", "anon-key"])
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"admin\": false"));
}

#[test]
fn missing_backend_fails_fast() {
    folio()
        .arg("categories")
        .assert()
        .failure()
        .code(78)
        .stderr(contains("backend url is not configured"));
}

#[test]
fn compose_without_admin_uploads_nothing() {
    let server = MockServer::start();
    let storage = server.mock(|when, then| {
        when.method("POST").header("content-type", "image/png");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"Key":"images/x.png"}"#);
    });
    let posts = server.mock(|when, then| {
        when.method("POST").path("/rest/v1/posts");
        then.status(201).body("[]");
    });

    let mut picture = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("tmp image");
    picture
        .write_all(&[0x89, b'P', b'N', b'G'])
        .expect("write image");

    folio()
        .env("FOLIO_BACKEND__URL", server.base_url())
        .env("FOLIO_BACKEND__API_KEY", "anon-key")
        .args(["compose", "--title", "Pictures", "--image"])
        .arg(picture.path())
        .assert()
        .failure()
        .code(3);

    assert_eq!(storage.hits(), 0);
    assert_eq!(posts.hits(), 0);
}
