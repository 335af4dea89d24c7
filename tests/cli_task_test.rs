//! Integration tests for task and subtask CRUD via the CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

// === Init tests ===

#[test]
fn test_init_creates_storage() {
    let env = TestEnv::new();
    env.alm()
        .args(["system", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));
}

#[test]
fn test_init_human_readable() {
    let env = TestEnv::new();
    env.alm()
        .args(["system", "init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized almanac"));
}

#[test]
fn test_init_already_initialized() {
    let env = TestEnv::init();
    env.alm()
        .args(["system", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":false"));
}

#[test]
fn test_commands_require_init() {
    let env = TestEnv::new();
    env.alm()
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));
}

// === Task create tests ===

#[test]
fn test_task_add_json() {
    let env = TestEnv::init();
    env.alm()
        .args(["task", "add", "English"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":\"alm-"))
        .stdout(predicate::str::contains("\"name\":\"English\""))
        .stdout(predicate::str::contains("\"task_type\":\"study\""));
}

#[test]
fn test_task_add_human() {
    let env = TestEnv::init();
    env.alm()
        .args(["task", "add", "Jogging", "--type", "life", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jogging [life]"));
}

#[test]
fn test_task_add_with_flags_and_hours() {
    let env = TestEnv::init();
    let task = env.run_json(&[
        "task",
        "add",
        "Math drills",
        "--hours",
        "6",
        "--high-frequency",
        "--overcome",
    ]);
    assert_eq!(task["weekly_hours"], 6.0);
    assert_eq!(task["is_high_frequency"], true);
    assert_eq!(task["is_overcome"], true);
    assert_eq!(task["effective_hours"], 6.0);
}

#[test]
fn test_task_add_empty_name_rejected() {
    let env = TestEnv::init();
    let stderr = env.run_err(&["task", "add", "   "]);
    assert!(stderr.contains("task name cannot be empty"));
}

#[test]
fn test_task_add_unknown_type_rejected() {
    let env = TestEnv::init();
    env.alm()
        .args(["task", "add", "Gaming", "--type", "gaming"])
        .assert()
        .failure();
}

#[test]
fn test_task_quick_defaults() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "quick", "  memorize 50 words  "]);
    assert_eq!(task["name"], "memorize 50 words");
    assert_eq!(task["task_type"], "study");
    assert_eq!(task["weekly_hours"], 0.0);
    assert_eq!(task["subtasks"].as_array().unwrap().len(), 0);
}

// === Subtask and effective hours tests ===

#[test]
fn test_subtask_sum_overrides_stale_weekly_hours() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English", "--hours", "5"]);
    let task_id = task["id"].as_str().unwrap();

    env.run_json(&[
        "task",
        "subtask",
        "add",
        task_id,
        "Vocabulary",
        "--hours",
        "3",
    ]);

    let shown = env.run_json(&["task", "show", task_id]);
    // weekly_hours stays stale at 5; effective hours follow the subtasks
    assert_eq!(shown["weekly_hours"], 5.0);
    assert_eq!(shown["effective_hours"], 3.0);

    env.run_json(&[
        "task",
        "subtask",
        "add",
        task_id,
        "Listening",
        "--hours",
        "1.5",
    ]);
    let shown = env.run_json(&["task", "show", task_id]);
    assert_eq!(shown["effective_hours"], 4.5);
}

#[test]
fn test_subtask_add_unknown_task() {
    let env = TestEnv::init();
    let stderr = env.run_err(&["task", "subtask", "add", "alm-0000", "Vocabulary"]);
    assert!(stderr.contains("not found") || stderr.contains("Not found"));
}

#[test]
fn test_subtask_negative_hours_rejected() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap();
    let stderr = env.run_err(&["task", "subtask", "add", task_id, "Vocabulary", "--hours=-1"]);
    assert!(stderr.contains("negative"));
}

#[test]
fn test_subtask_update_and_remove() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap();
    let subtask = env.run_json(&[
        "task",
        "subtask",
        "add",
        task_id,
        "Vocabulary",
        "--hours",
        "2",
    ]);
    let subtask_id = subtask["id"].as_str().unwrap();

    let updated = env.run_json(&[
        "task",
        "subtask",
        "update",
        subtask_id,
        "--hours",
        "4",
        "--high-frequency",
        "true",
    ]);
    assert_eq!(updated["hours"], 4.0);
    assert_eq!(updated["is_high_frequency"], true);

    let removed = env.run_json(&["task", "subtask", "rm", subtask_id]);
    assert_eq!(removed["removed"], true);
    // Second removal is a no-op
    let removed = env.run_json(&["task", "subtask", "rm", subtask_id]);
    assert_eq!(removed["removed"], false);
}

// === Task list tests ===

#[test]
fn test_task_list_insertion_order_and_filter() {
    let env = TestEnv::init();
    env.run_json(&["task", "add", "English"]);
    env.run_json(&["task", "add", "Jogging", "--type", "life"]);
    env.run_json(&["task", "add", "Math", "--high-frequency"]);

    let list = env.run_json(&["task", "list"]);
    assert_eq!(list["total"], 3);
    assert_eq!(list["high_frequency_count"], 1);
    let names: Vec<&str> = list["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["English", "Jogging", "Math"]);

    let study = env.run_json(&["task", "list", "--type", "study"]);
    assert_eq!(study["total"], 2);

    let stderr = env.run_err(&["task", "list", "--type", "gaming"]);
    assert!(stderr.contains("Unknown task type"));
}

// === Task update tests ===

#[test]
fn test_task_update_fields() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap();

    let updated = env.run_json(&[
        "task",
        "update",
        task_id,
        "--name",
        "English reading",
        "--type",
        "study",
        "--hours",
        "7",
        "--overcome",
        "true",
    ]);
    assert_eq!(updated["name"], "English reading");
    assert_eq!(updated["weekly_hours"], 7.0);
    assert_eq!(updated["is_overcome"], true);

    let stderr = env.run_err(&["task", "update", "alm-0000", "--name", "ghost"]);
    assert!(stderr.contains("not found"));
}

// === Task delete tests ===

#[test]
fn test_task_rm_is_idempotent() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap();
    let sub = env.run_json(&["task", "subtask", "add", task_id, "Vocabulary"]);
    let subtask_id = sub["id"].as_str().unwrap();

    let removed = env.run_json(&["task", "rm", task_id]);
    assert_eq!(removed["removed"], true);
    assert_eq!(removed["subtasks_removed"], 1);

    // Subtask lifecycle is bound to the parent
    let stderr = env.run_err(&["task", "show", task_id]);
    assert!(stderr.contains("not found"));
    let stderr = env.run_err(&["task", "subtask", "update", subtask_id, "--hours", "1"]);
    assert!(stderr.contains("not found"));

    let removed = env.run_json(&["task", "rm", task_id]);
    assert_eq!(removed["removed"], false);
}
