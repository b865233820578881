//! CLI test cases.
//!
//! These never talk to the real UltraOCR servers. Tests which need a server
//! point `ULTRAOCR_BASE_URL` and `ULTRAOCR_AUTH_BASE_URL` at a local
//! `wiremock` instance.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Create a new `Command` with our binary, with no credentials from the
/// environment leaking in.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("ultraocr").unwrap();
    cmd.env_remove("ULTRAOCR_CLIENT_ID")
        .env_remove("ULTRAOCR_CLIENT_SECRET")
        .env_remove("ULTRAOCR_BASE_URL")
        .env_remove("ULTRAOCR_AUTH_BASE_URL");
    cmd
}

/// Point a command at `server` with fake credentials.
fn cmd_for(server: &MockServer) -> Command {
    let mut cmd = cmd();
    cmd.env("ULTRAOCR_CLIENT_ID", "id")
        .env("ULTRAOCR_CLIENT_SECRET", "secret")
        .env("ULTRAOCR_BASE_URL", server.uri())
        .env("ULTRAOCR_AUTH_BASE_URL", server.uri());
    cmd
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ULTRAOCR_CLIENT_ID"));
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_schema() {
    for schema_type in [
        "CreatedResponse",
        "SignedUrlResponse",
        "BatchStatus",
        "JobResult",
    ] {
        let output = cmd().args(["schema", schema_type]).output().unwrap();
        assert!(output.status.success());
        let schema: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(schema["title"], schema_type);
    }
}

#[test]
fn test_missing_credentials() {
    cmd()
        .args(["status", "batch", "B1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ULTRAOCR_CLIENT_ID"));
}

#[test]
fn test_bad_expiration() {
    cmd()
        .env("ULTRAOCR_CLIENT_ID", "id")
        .env("ULTRAOCR_CLIENT_SECRET", "secret")
        .args(["--expires", "0", "status", "batch", "B1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--expires"));
}

#[test]
fn test_jobs_rejects_reversed_dates() {
    cmd()
        .env("ULTRAOCR_CLIENT_ID", "id")
        .env("ULTRAOCR_CLIENT_SECRET", "secret")
        .args(["jobs", "2024-02-01", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("after end date"));
}

#[tokio::test]
async fn test_status_job_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ocr/job/result/J1/J1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"job_ksuid": "J1", "status": "done"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = cmd_for(&server);
    cmd.args(["status", "job", "J1"]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["job_ksuid"], "J1");
    assert_eq!(result["status"], "done");
}

#[tokio::test]
async fn test_wait_with_huge_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ocr/batch/status/B1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"batch_ksuid": "B1", "status": "done"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = cmd_for(&server);
    cmd.args(["--timeout", "18446744073709551615", "status", "batch", "B1", "--wait"]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());
    let status: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["status"], "done");
}
