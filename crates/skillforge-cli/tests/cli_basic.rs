//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and verify
//! its JSON output.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_skillforge"))
        .args(args)
        .env("SKILLFORGE_DATA_DIR", data_dir)
        .env_remove("SKILLFORGE_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command that must succeed and parse its stdout as JSON.
fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_skill_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let skill = run_json(dir.path(), &["skill", "add", "Guitar"]);
    assert_eq!(skill["name"], "Guitar");
    assert_eq!(skill["is_active"], true);

    let skills = run_json(dir.path(), &["skill", "list"]);
    assert_eq!(skills.as_array().unwrap().len(), 1);
    assert_eq!(skills[0]["id"], skill["id"]);
}

#[test]
fn test_task_add_uses_active_skill() {
    let dir = tempfile::tempdir().unwrap();
    let skill = run_json(dir.path(), &["skill", "add", "Guitar"]);
    let task = run_json(dir.path(), &["task", "add", "Scales", "--estimated", "3"]);
    assert_eq!(task["skill_id"], skill["id"]);
    assert_eq!(task["estimated_intervals"], 3);

    let tasks = run_json(dir.path(), &["task", "list"]);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[test]
fn test_timer_start_then_stop_discards() {
    let dir = tempfile::tempdir().unwrap();
    let skill = run_json(dir.path(), &["skill", "add", "Guitar"]);

    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["events"][0]["type"], "SessionStarted");
    assert_eq!(started["events"][0]["target"]["skill_id"], skill["id"]);
    assert_eq!(started["state"]["type"], "StateSnapshot");
    assert_eq!(started["state"]["status"], "running");
    assert_eq!(started["state"]["kind"], "work");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"]["status"], "running");

    let stopped = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(stopped["events"][0]["type"], "SessionDiscarded");
    assert_eq!(stopped["state"]["status"], "idle");
    assert_eq!(stopped["state"]["remaining_seconds"], 1500);
}

#[test]
fn test_timer_start_rejects_unknown_skill() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["skill", "add", "Guitar"]);
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start", "--skill", "no-such-skill"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown skill: no-such-skill"), "stderr: {stderr}");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"]["status"], "idle");
}

#[test]
fn test_timer_start_checks_task_belongs_to_skill() {
    let dir = tempfile::tempdir().unwrap();
    let guitar = run_json(dir.path(), &["skill", "add", "Guitar"]);
    let piano = run_json(dir.path(), &["skill", "add", "Piano"]);
    let piano_id = piano["id"].as_str().unwrap();
    let task = run_json(dir.path(), &["task", "add", "Scales", "--skill", piano_id]);
    let task_id = task["id"].as_str().unwrap();

    let guitar_id = guitar["id"].as_str().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["timer", "start", "--skill", guitar_id, "--task", task_id],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("belongs to skill"), "stderr: {stderr}");

    // A task on its own brings its skill along.
    let started = run_json(dir.path(), &["timer", "start", "--task", task_id]);
    assert_eq!(started["events"][0]["target"]["skill_id"], piano["id"]);
    assert_eq!(started["events"][0]["target"]["task_id"], task["id"]);
}

#[test]
fn test_timer_pause_resume() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["timer", "start", "--kind", "short-recovery"]);

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(paused["state"]["status"], "paused");
    assert_eq!(paused["state"]["kind"], "short_recovery");

    let resumed = run_json(dir.path(), &["timer", "resume"]);
    assert_eq!(resumed["state"]["status"], "running");
}

#[test]
fn test_invalid_transition_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "pause"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid transition"), "stderr: {stderr}");
}

#[test]
fn test_config_set_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "schedule.work_minutes", "500"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "180");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "schedule.work_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "180");

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "schedule.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_configured_duration_applies_to_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "schedule.work_minutes", "50"]);
    assert_eq!(code, 0);

    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["events"][0]["planned_minutes"], 50);
    assert_eq!(started["state"]["total_seconds"], 3000);
}

#[test]
fn test_stats_and_achievements_on_empty_db() {
    let dir = tempfile::tempdir().unwrap();
    let today = run_json(dir.path(), &["stats", "today"]);
    assert_eq!(today["minutes"], 0);
    assert_eq!(today["daily_goal_minutes"], 240);

    let all = run_json(dir.path(), &["stats", "all"]);
    assert_eq!(all["total_minutes"], 0);
    assert_eq!(all["streak_days"], 0);

    let achievements = run_json(dir.path(), &["achievements"]);
    assert_eq!(achievements.as_array().unwrap().len(), 15);
}

#[test]
fn test_db_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["skill", "add", "Guitar"]);
    let summary = run_json(dir.path(), &["db", "rebuild"]);
    assert_eq!(summary["skills"], 1);
}

#[test]
fn test_journal_write_show_list() {
    let dir = tempfile::tempdir().unwrap();
    let skill = run_json(dir.path(), &["skill", "add", "Guitar"]);
    let skill_id = skill["id"].as_str().unwrap();

    let written = run_json(
        dir.path(),
        &[
            "journal", "write", "Barre chords", "--date", "2026-03-14", "--mood", "tired",
            "--skill", skill_id,
        ],
    );
    assert_eq!(written["date"], "2026-03-14");
    assert_eq!(written["mood"], "tired");
    assert_eq!(written["total_minutes"], 0);
    assert_eq!(written["skill_ids"][0], skill["id"]);

    let rewritten = run_json(dir.path(), &["journal", "write", "Cleaner barre", "--date", "2026-03-14"]);
    assert_eq!(rewritten["id"], written["id"]);
    assert_eq!(rewritten["skill_ids"].as_array().unwrap().len(), 0);

    let shown = run_json(dir.path(), &["journal", "show", "--date", "2026-03-14"]);
    assert_eq!(shown["content"], "Cleaner barre");

    let listed = run_json(dir.path(), &["journal", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, stderr, code) = run_cli(dir.path(), &["journal", "show", "--date", "2026-03-15"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no journal entry"), "stderr: {stderr}");
}
