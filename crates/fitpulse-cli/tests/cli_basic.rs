//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against the dev data directory
//! and verify outputs.

use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-p", "fitpulse-cli", "--"])
        .args(args)
        .env("FITPULSE_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_session_flow() {
    // Clean slate: drop any leftover session record, end any live one.
    let _ = run_cli(&["session", "end"]);
    let (code, _, _) = run_cli(&["session", "discard"]);
    assert_eq!(code, 0, "Session discard failed");

    let (code, stdout, _) = run_cli(&["session", "start"]);
    assert_eq!(code, 0, "Session start failed");
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["is_active"], true);
    assert_eq!(snapshot["workout_id"], "sample-full-body");

    // Starting again must fail while one is active.
    let (code, _, stderr) = run_cli(&["session", "start"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already active"), "got: {stderr}");

    let (code, _, _) = run_cli(&["session", "start-exercise", "pushups"]);
    assert_eq!(code, 0, "Start exercise failed");

    let (code, stdout, _) = run_cli(&["session", "complete-set", "0"]);
    assert_eq!(code, 0, "Complete set failed");
    // Snapshot then timer list; the auto-rest timer shows up.
    assert!(stdout.contains("\"rest\""), "got: {stdout}");

    let (code, _, _) = run_cli(&["session", "skip-rest"]);
    assert_eq!(code, 0, "Skip rest failed");

    let (code, stdout, _) = run_cli(&["session", "complete-exercise", "pushups"]);
    assert_eq!(code, 0, "Complete exercise failed");
    assert!(stdout.contains("pushups"));

    let (code, _, _) = run_cli(&["session", "heart-rate", "141"]);
    assert_eq!(code, 0, "Heart rate failed");

    let (code, _, _) = run_cli(&["session", "pause"]);
    assert_eq!(code, 0, "Session pause failed");

    let (code, stdout, _) = run_cli(&["session", "status"]);
    assert_eq!(code, 0, "Session status failed");
    assert!(stdout.contains("\"is_paused\": true"));

    let (code, _, _) = run_cli(&["session", "resume"]);
    assert_eq!(code, 0, "Session resume failed");

    let (code, stdout, _) = run_cli(&["session", "end"]);
    assert_eq!(code, 0, "Session end failed");
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["sets_completed"], 1);
    assert_eq!(summary["exercises_completed"], 1);

    // Ended and cleared: further session operations report no session.
    let (code, _, stderr) = run_cli(&["session", "status"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no active session"));

    let (code, stdout, _) = run_cli(&["session", "recover"]);
    assert_eq!(code, 0, "Recover failed");
    assert!(stdout.contains("no recoverable session"));
}

#[test]
fn test_config_get() {
    let (code, stdout, _) = run_cli(&["config", "get", "session.rest_duration_secs"]);
    assert_eq!(code, 0, "Config get failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_set() {
    let (code, _, _) = run_cli(&["config", "set", "audio.volume", "70"]);
    assert_eq!(code, 0, "Config set failed");
    let (_, stdout, _) = run_cli(&["config", "get", "audio.volume"]);
    assert_eq!(stdout.trim(), "70");
    let _ = run_cli(&["config", "set", "audio.volume", "50"]);
}

#[test]
fn test_config_list() {
    let (code, stdout, _) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "Config list failed");
    assert!(stdout.contains("skip_confirm_threshold_secs"));
}

#[test]
fn test_stats_all() {
    let (code, stdout, _) = run_cli(&["stats", "all"]);
    assert_eq!(code, 0, "Stats all failed");
    assert!(stdout.contains("total_sessions"));
}

#[test]
fn test_stats_today() {
    let (code, stdout, _) = run_cli(&["stats", "today"]);
    assert_eq!(code, 0, "Stats today failed");
    assert!(stdout.contains("today_sessions"));
}
