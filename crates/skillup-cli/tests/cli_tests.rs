//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn skillup() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("skillup").unwrap();
    for var in [
        "SKILLUP_API_URL",
        "SKILLUP_UID",
        "SKILLUP_TOKEN",
        "SKILLUP_LANGUAGE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, api_url: &str) -> PathBuf {
    let path = dir.join("skillup.toml");
    std::fs::write(
        &path,
        format!(
            "api_base_url = \"{api_url}\"\n\n[defaults]\nposition = \"developer\"\nsubposition = \"rust\"\nlevel = \"junior\"\n"
        ),
    )
    .unwrap();
    path
}

/// Run a blocking command while the mock server keeps serving.
async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap()
}

const STREAM_BODY: &str = concat!(
    "data: {\"type\":\"question\",\"data\":{\"id\":\"2\",\"question\":\"What does `?` do?\",\"options\":[\"panics\",\"propagates errors\",\"nothing\",\"loops\"],\"correctAnswer\":\"B\"}}\n",
    "data: {\"type\":\"initial_ready\"}\n",
    "data: {\"type\":\"question\",\"data\":{\"id\":\"1\",\"question\":\"Which keyword declares a binding?\",\"answers\":{\"a\":\"let\",\"b\":\"var\"},\"correct\":\"let\"}}\n",
    "data: not json\n",
    "data: {\"type\":\"complete\"}\n",
);

#[test]
fn normalize_stream_transcript() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("transcript.txt");
    std::fs::write(&input, STREAM_BODY).unwrap();

    skillup()
        .arg("normalize")
        .arg("--input")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"correctAnswer\": \"B\""))
        .stdout(predicate::str::contains("\"text\": \"let\""))
        .stdout(predicate::str::contains("Option C"));
}

#[test]
fn normalize_nonexistent_file() {
    skillup()
        .arg("normalize")
        .arg("--input")
        .arg("no_such_file.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    skillup()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created skillup.toml"));

    assert!(dir.path().join("skillup.toml").exists());

    skillup()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn profile_requires_uid() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:9/api");

    skillup()
        .arg("profile")
        .arg("show")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user id configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_prints_normalized_test() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/create-test-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STREAM_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let output = dir.path().join("test.json");

    let mut cmd = skillup();
    cmd.arg("stream")
        .arg("--section")
        .arg("errors")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Wrote 2 questions"));

    let test: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(test["section"], "errors");
    assert_eq!(test["questions"][0]["id"], "1");
    assert_eq!(test["questions"][0]["correctAnswer"], "A");
    assert_eq!(test["questions"][1]["id"], "2");
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_reports_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/create-test-stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = skillup();
    cmd.arg("stream")
        .arg("--section")
        .arg("errors")
        .arg("--config")
        .arg(&config);
    run(cmd)
        .await
        .failure()
        .stderr(predicate::str::contains("HTTP error! status: 503"));
}

#[tokio::test(flavor = "multi_thread")]
async fn take_finishes_when_time_runs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/create-test-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STREAM_BODY))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = skillup();
    cmd.arg("take")
        .arg("--section")
        .arg("errors")
        .arg("--duration")
        .arg("1")
        .arg("--no-submit")
        .arg("--config")
        .arg(&config);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Which keyword declares a binding?"))
        .stdout(predicate::str::contains("Time's up"));
}

#[tokio::test(flavor = "multi_thread")]
async fn positions_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/positions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "positions": [
                {"_id": "p1", "name": "Developer", "subpositions": [{"id": "rust", "name": "Rust"}]}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let mut cmd = skillup();
    cmd.arg("positions").arg("--config").arg(&config);
    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Developer"))
        .stdout(predicate::str::contains("rust"));
}
