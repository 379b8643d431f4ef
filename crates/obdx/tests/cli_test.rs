//! Integration tests for the `obdx` binary.
//!
//! Argument parsing, help, completions, config handling and error exit
//! codes run without a store; the calendar tests point the binary at a
//! wiremock server speaking the store's REST dialect.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const NO_HOME: &str = "/tmp/obdx-cli-test-nonexistent";

/// Build a command for the `obdx` binary with env isolation.
///
/// Clears all `OBDX_*` env vars and points config directories at `home`
/// so tests never touch the user's real configuration.
fn obdx_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("obdx");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("OBDX_PROFILE")
        .env_remove("OBDX_URL")
        .env_remove("OBDX_API_KEY")
        .env_remove("OBDX_OUTPUT")
        .env_remove("OBDX_INSECURE")
        .env_remove("OBDX_TIMEOUT")
        .env_remove("OBDX_IDEMPOTENCY_KEY");
    cmd
}

fn obdx_cmd() -> assert_cmd::Command {
    obdx_cmd_in(Path::new(NO_HOME))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = obdx_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    obdx_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("slots")
            .and(predicate::str::contains("book"))
            .and(predicate::str::contains("reservations"))
            .and(predicate::str::contains("reconcile")),
    );
}

#[test]
fn version_flag() {
    obdx_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("obdx"));
}

#[test]
fn book_help_mentions_idempotency_key() {
    obdx_cmd()
        .args(["book", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--idempotency-key"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn completions_zsh() {
    obdx_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn completions_bash() {
    obdx_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn invalid_subcommand() {
    let output = obdx_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn invalid_output_format() {
    let output = obdx_cmd()
        .args(["--output", "invalid", "dashboard"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn book_requires_customer_details() {
    let output = obdx_cmd()
        .args(["book", "--slot", "7f7c3c1e-8d1b-4f43-9a57-6a0c7e2d1b11"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--first-name"));
}

#[test]
fn malformed_slot_id_is_usage_error() {
    // Flags alone are enough to build the client; the id fails before any request.
    obdx_cmd()
        .args([
            "--url",
            "http://127.0.0.1:9",
            "--api-key",
            "k",
            "--yes",
            "slots",
            "block",
            "not-a-uuid",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("slot_id"));
}

#[test]
fn slots_list_without_store_config() {
    obdx_cmd()
        .args(["slots", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init").or(predicate::str::contains("--url")));
}

#[test]
fn unknown_profile_is_reported() {
    obdx_cmd()
        .args(["--profile", "staging", "dashboard"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("staging"));
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn config_show_without_file() {
    obdx_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn config_set_then_profiles() {
    let home = tempfile::tempdir().unwrap();

    obdx_cmd_in(home.path())
        .args(["config", "set", "url", "https://abcd.supabase.co"])
        .assert()
        .success();
    obdx_cmd_in(home.path())
        .args(["config", "set", "pricing.cities.Lyon", "109"])
        .assert()
        .success();

    obdx_cmd_in(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));

    obdx_cmd_in(home.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("abcd.supabase.co").and(predicate::str::contains("109")),
        );
}

#[test]
fn config_set_rejects_unknown_rule() {
    let home = tempfile::tempdir().unwrap();
    obdx_cmd_in(home.path())
        .args(["config", "set", "scheduler.past_slots", "sometimes"])
        .assert()
        .code(2);
}

#[test]
fn config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    obdx_cmd_in(home.path())
        .args(["config", "use", "nowhere"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nowhere"));
}

// ── Against a mock store ────────────────────────────────────────────

fn slot_row(id: &str, statut: &str, reservation_id: Option<&str>, notes: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "date_debut": "2031-03-10T09:00:00+00:00",
        "date_fin": "2031-03-10T10:00:00+00:00",
        "statut": statut,
        "reservation_id": reservation_id,
        "notes": notes,
        "created_at": "2031-03-01T08:00:00+00:00",
        "updated_at": "2031-03-01T08:00:00+00:00"
    })
}

const OPEN_SLOT: &str = "7f7c3c1e-8d1b-4f43-9a57-6a0c7e2d1b11";
const TAKEN_SLOT: &str = "0b7e6d7a-3f0e-4a38-b0de-1c6f0f2f4e22";
const RESERVATION: &str = "5a4c8a64-0c55-5b0e-8d7f-8d1f3e7c9a33";

async fn store_with_slots() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .and(header("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            slot_row(OPEN_SLOT, "disponible", None, Some("portail code 4512")),
            slot_row(TAKEN_SLOT, "reserve", Some(RESERVATION), None),
        ])))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || obdx_cmd().args(args).output().unwrap())
        .await
        .unwrap()
}

fn store_args(server: &MockServer, rest: &[&str]) -> Vec<String> {
    let mut args = vec![
        "--url".to_owned(),
        server.uri(),
        "--api-key".to_owned(),
        "test-key".to_owned(),
    ];
    args.extend(rest.iter().map(|s| (*s).to_owned()));
    args
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn customer_listing_shows_only_open_slots() {
    let server = store_with_slots().await;

    let output = run(store_args(&server, &["-o", "json", "slots", "list"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let slots: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["id"], OPEN_SLOT);
    assert!(slots[0].get("notes").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admin_listing_shows_every_slot() {
    let server = store_with_slots().await;

    let output = run(store_args(&server, &["-o", "plain", "slots", "list", "--all"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(OPEN_SLOT));
    assert!(stdout.contains(TAKEN_SLOT));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_outage_exits_with_unavailable_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/disponibilites"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let output = run(store_args(&server, &["slots", "list"])).await;
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Calendar unavailable"));
}
