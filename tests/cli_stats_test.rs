//! Integration tests for the statistics queries.

mod common;

use common::TestEnv;

/// Initialized env with a ten-slot day on Monday 2026-08-03.
fn setup_week() -> TestEnv {
    let env = TestEnv::init();
    std::fs::write(
        env.profile_root().join("config.toml"),
        "day_start = \"07:00\"\nday_end = \"17:00\"\nslot_minutes = 60\n",
    )
    .unwrap();
    env.run_json(&["day", "rollover", "--date", "2026-08-03"]);
    env
}

fn slot_ids(env: &TestEnv, date: &str) -> Vec<String> {
    env.run_json(&["day", "show", "--date", date])["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_weekly_overview_scenario() {
    let env = setup_week();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap().to_string();
    let slots = slot_ids(&env, "2026-08-03");

    // 10 slots: bind five, complete three, leave two in progress
    for slot in &slots[..5] {
        env.run_json(&["slot", "bind", slot, &task_id]);
    }
    for slot in &slots[..3] {
        env.run_json(&["slot", "done", slot]);
    }
    for slot in &slots[3..5] {
        env.run_json(&["slot", "start", slot]);
    }

    let overview = env.run_json(&["stats", "overview", "--date", "2026-08-05"]);
    assert_eq!(overview["week_start"], "2026-08-03");
    assert_eq!(overview["week_end"], "2026-08-09");
    assert_eq!(overview["total_slots"], 10);
    assert_eq!(overview["completed_slots"], 3);
    assert_eq!(overview["in_progress_slots"], 2);
    assert_eq!(overview["completion_rate"], 0.3);
    assert_eq!(overview["total_study_hours"], 3.0);
}

#[test]
fn test_weekly_overview_empty_week_has_zero_rate() {
    let env = TestEnv::init();
    let overview = env.run_json(&["stats", "overview", "--date", "2026-08-05"]);
    assert_eq!(overview["total_slots"], 0);
    assert_eq!(overview["completion_rate"], 0.0);
}

#[test]
fn test_overview_spans_the_whole_week() {
    let env = setup_week();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap().to_string();

    let monday = slot_ids(&env, "2026-08-03");
    env.run_json(&["slot", "bind", &monday[0], &task_id]);
    env.run_json(&["slot", "done", &monday[0]]);

    env.run_json(&["day", "rollover", "--date", "2026-08-04"]);
    let tuesday = slot_ids(&env, "2026-08-04");
    env.run_json(&["slot", "bind", &tuesday[0], &task_id]);
    env.run_json(&["slot", "done", &tuesday[0]]);

    let overview = env.run_json(&["stats", "overview", "--date", "2026-08-05"]);
    assert_eq!(overview["total_slots"], 20);
    assert_eq!(overview["completed_slots"], 2);
    assert_eq!(overview["total_study_hours"], 2.0);

    // The next ISO week sees none of it
    let next_week = env.run_json(&["stats", "overview", "--date", "2026-08-10"]);
    assert_eq!(next_week["total_slots"], 0);
}

#[test]
fn test_overview_flag_completion_and_ai_rate() {
    let env = setup_week();
    let flagged = env.run_json(&["task", "add", "Math", "--high-frequency", "--overcome"]);
    let flagged_id = flagged["id"].as_str().unwrap().to_string();
    let plain = env.run_json(&["task", "add", "English"]);
    let plain_id = plain["id"].as_str().unwrap().to_string();
    let slots = slot_ids(&env, "2026-08-03");

    env.run_json(&["slot", "bind", &slots[0], &flagged_id]);
    env.run_json(&["slot", "bind", &slots[1], &flagged_id]);
    env.run_json(&["slot", "bind", &slots[2], &plain_id]);
    env.run_json(&["slot", "done", &slots[0]]);
    env.run_json(&["slot", "done", &slots[2]]);

    env.run_json(&["rec", "suggest", &slots[3], "--ref", &plain_id]);
    env.run_json(&["rec", "accept", &slots[3]]);
    env.run_json(&["rec", "reject", &slots[4]]);

    let overview = env.run_json(&["stats", "overview", "--date", "2026-08-03"]);
    assert_eq!(overview["high_freq_complete"]["completed"], 1);
    assert_eq!(overview["high_freq_complete"]["total"], 2);
    assert_eq!(overview["overcome_complete"]["completed"], 1);
    assert_eq!(overview["overcome_complete"]["total"], 2);
    // One acceptance, one rejection
    assert_eq!(overview["ai_accept_rate"], 50);
}

#[test]
fn test_categories_cover_all_types_with_zeros() {
    let env = TestEnv::init();
    let task = env.run_json(&["task", "add", "English", "--hours", "5"]);
    let task_id = task["id"].as_str().unwrap().to_string();
    env.run_json(&["task", "subtask", "add", &task_id, "Vocabulary", "--hours", "3"]);
    env.run_json(&["task", "add", "Jogging", "--type", "life", "--hours", "2"]);

    let result = env.run_json(&["stats", "categories"]);
    let categories = result["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 4);
    // Effective hours: the subtask sum (3), not the stale stored 5
    assert_eq!(categories[0]["task_type"], "study");
    assert_eq!(categories[0]["hours"], 3.0);
    assert_eq!(categories[1]["task_type"], "life");
    assert_eq!(categories[1]["hours"], 2.0);
    assert_eq!(categories[2]["hours"], 0.0);
    assert_eq!(categories[3]["hours"], 0.0);
}

#[test]
fn test_frequent_report_sorted_by_effective_hours() {
    let env = TestEnv::init();
    env.run_json(&["task", "add", "Light", "--hours", "1", "--high-frequency"]);
    env.run_json(&["task", "add", "Heavy", "--hours", "8", "--high-frequency"]);
    let parent = env.run_json(&["task", "add", "Parent"]);
    let parent_id = parent["id"].as_str().unwrap().to_string();
    env.run_json(&[
        "task",
        "subtask",
        "add",
        &parent_id,
        "Drill",
        "--hours",
        "4",
        "--high-frequency",
    ]);
    env.run_json(&["task", "add", "Unflagged", "--hours", "9"]);

    let report = env.run_json(&["stats", "frequent"]);
    let entries = report["entries"].as_array().unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Heavy", "Drill", "Light"]);
    assert_eq!(entries[1]["kind"], "subtask");
}

#[test]
fn test_overcome_report_ties_break_by_creation_order() {
    let env = TestEnv::init();
    env.run_json(&["task", "add", "First", "--hours", "2", "--overcome"]);
    env.run_json(&["task", "add", "Second", "--hours", "2", "--overcome"]);

    let report = env.run_json(&["stats", "overcome"]);
    let names: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["First", "Second"]);
}

#[test]
fn test_task_hours_roll_subtask_slots_into_parent() {
    let env = setup_week();
    let task = env.run_json(&["task", "add", "English"]);
    let task_id = task["id"].as_str().unwrap().to_string();
    let subtask = env.run_json(&["task", "subtask", "add", &task_id, "Vocabulary"]);
    let subtask_id = subtask["id"].as_str().unwrap().to_string();
    let slots = slot_ids(&env, "2026-08-03");

    env.run_json(&["slot", "bind", &slots[0], &task_id]);
    env.run_json(&["slot", "bind", &slots[1], &subtask_id]);
    env.run_json(&["slot", "done", &slots[0]]);
    env.run_json(&["slot", "done", &slots[1]]);
    // Bound but not completed contributes nothing
    env.run_json(&["slot", "bind", &slots[2], &task_id]);

    let report = env.run_json(&["stats", "tasks", "--date", "2026-08-03"]);
    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "English");
    assert_eq!(entries[0]["hours"], 2.0);
}

#[test]
fn test_moods_distribution_and_dominant() {
    let env = setup_week();
    let slots = slot_ids(&env, "2026-08-03");
    env.run_json(&["slot", "mood", &slots[0], "tired"]);
    env.run_json(&["slot", "mood", &slots[1], "tired"]);
    env.run_json(&["slot", "mood", &slots[2], "happy"]);

    let result = env.run_json(&["stats", "moods"]);
    assert_eq!(result["total_records"], 3);
    assert_eq!(result["dominant_mood"], "tired");
    let distribution = result["distribution"].as_array().unwrap();
    assert_eq!(distribution.len(), 3);
    let focused = distribution
        .iter()
        .find(|c| c["mood"] == "focused")
        .unwrap();
    assert_eq!(focused["count"], 0);
}
