//! End-to-end smoke test: a day in the life of a profile.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_help_runs() {
    let env = TestEnv::new();
    env.alm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("study schedule"));
}

#[test]
fn test_full_day_workflow() {
    let env = TestEnv::init();

    // Lay out the day and the week's tasks
    env.run_json(&["day", "rollover", "--date", "2026-08-03"]);
    let english = env.run_json(&["task", "add", "English", "--hours", "5", "--high-frequency"]);
    let english_id = english["id"].as_str().unwrap().to_string();
    let sub = env.run_json(&[
        "task",
        "subtask",
        "add",
        &english_id,
        "Vocabulary",
        "--hours",
        "3",
    ]);
    let sub_id = sub["id"].as_str().unwrap().to_string();

    // Fill the morning
    let view = env.run_json(&["day", "show"]);
    let first = view["slots"][0]["id"].as_str().unwrap().to_string();
    env.run_json(&["slot", "bind", &first, &sub_id]);
    env.run_json(&["slot", "start", &first]);
    env.run_json(&["slot", "done", &first]);
    env.run_json(&["slot", "mood", &first, "focused"]);
    env.run_json(&["slot", "note", &first, "flashcards went well"]);

    // Quick-add grabs the next empty slot
    let quick = env.run_json(&["quick", "call study group"]);
    assert_eq!(quick["slot"]["time_range"], "08:00-09:00");

    // The AI pitches the afternoon; the user takes it
    let view = env.run_json(&["day", "show"]);
    let third = view["slots"][2]["id"].as_str().unwrap().to_string();
    env.run_json(&[
        "rec",
        "suggest",
        &third,
        "--ref",
        &english_id,
        "--tip",
        "Keep the streak going",
    ]);
    env.run_json(&["rec", "accept", &third]);

    // Derived views line up
    let view = env.run_json(&["day", "show"]);
    assert_eq!(view["overview"]["completed_slots"], 1);
    assert_eq!(view["overview"]["pending_slots"], 2);
    assert_eq!(view["mood_summary"]["dominant_mood"], "focused");

    let overview = env.run_json(&["stats", "overview", "--date", "2026-08-03"]);
    assert_eq!(overview["total_study_hours"], 1.0);
    assert_eq!(overview["ai_accept_rate"], 100);

    let report = env.run_json(&["stats", "frequent"]);
    assert_eq!(report["entries"][0]["name"], "English");

    // Human rendering stays available end to end
    env.alm()
        .args(["day", "show", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vocabulary"));
}
