//! Integration tests for daily planning and tasks.
//!
//! - `gos today` applies each project's time budget to its open milestones
//! - `gos today --project --exclude` refills one project
//! - `gos task add/complete` for standalone and project tasks
//! - `gos points` aggregates the day's completions

mod common;

use common::TestEnv;
use predicates::prelude::*;

const BUDGET_TREE: &str = r#"[
    {"title": "Warm up", "estimatedMinutes": 30},
    {"title": "Scales", "estimatedMinutes": 20},
    {"title": "Piece", "estimatedMinutes": 50}
]"#;

fn milestone_titles(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_today_stops_at_first_overflow() {
    let env = TestEnv::new();
    env.create_project(&["Piano", "--minutes", "40", "--wbs", BUDGET_TREE]);

    let plan = env.json(&["today"]);
    let project = &plan["projects"][0];
    assert_eq!(project["budget_minutes"], 40);
    // 30 fits, 30 + 20 overflows, and selection stops there.
    assert_eq!(milestone_titles(&project["milestones"]), vec!["Warm up"]);
    assert_eq!(plan["total_daily_minutes"], 40);
}

#[test]
fn test_today_takes_oversized_first_item() {
    let env = TestEnv::new();
    env.create_project(&["Novel", "--minutes", "30", "--wbs", r#"[{"title": "Outline", "estimatedMinutes": 80}]"#]);

    let plan = env.json(&["today"]);
    assert_eq!(milestone_titles(&plan["projects"][0]["milestones"]), vec!["Outline"]);
}

#[test]
fn test_today_default_budget_when_unset() {
    let env = TestEnv::new();
    env.create_project(&["Piano", "--wbs", BUDGET_TREE]);

    let plan = env.json(&["today"]);
    assert_eq!(plan["projects"][0]["budget_minutes"], 60);
    assert_eq!(milestone_titles(&plan["projects"][0]["milestones"]), vec!["Warm up", "Scales"]);
    assert!(plan.get("total_daily_minutes").is_none());
}

#[test]
fn test_today_skips_completed_and_paused() {
    let env = TestEnv::new();
    let piano = env.create_project(&["Piano", "--minutes", "40", "--wbs", BUDGET_TREE]);
    let paused = env.create_project(&["Paused", "--wbs", BUDGET_TREE]);
    env.json(&["project", "update", &paused, "--status", "paused"]);

    let first = env.json(&["milestone", "list", &piano])["milestones"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();
    env.json(&["milestone", "complete", &first]);

    let plan = env.json(&["today"]);
    assert_eq!(plan["projects"].as_array().unwrap().len(), 1);
    // Scales (20) fits in 40; Piece (50) would overflow.
    assert_eq!(milestone_titles(&plan["projects"][0]["milestones"]), vec!["Scales"]);
}

#[test]
fn test_today_refill_excludes_ids() {
    let env = TestEnv::new();
    let id = env.create_project(&["Piano", "--minutes", "40", "--wbs", BUDGET_TREE]);
    let first = env.json(&["milestone", "list", &id])["milestones"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let extra = env.json(&["today", "--project", &id, "--exclude", &first]);
    assert_eq!(extra["excluded"][0], first.as_str());
    assert_eq!(milestone_titles(&extra["milestones"]), vec!["Scales"]);
}

#[test]
fn test_standalone_task_lifecycle() {
    let env = TestEnv::new();
    let added = env.json(&["task", "add", "File taxes", "--date", "2030-04-15"]);
    assert_eq!(added["kind"], "task");
    let id = added["item"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("gt-"));

    let plan = env.json(&["today", "--date", "2030-04-15"]);
    assert_eq!(plan["tasks"][0]["title"], "File taxes");
    assert_eq!(env.json(&["today", "--date", "2030-04-16"])["tasks"].as_array().unwrap().len(), 0);

    let completion = env.json(&["task", "complete", &id]);
    assert_eq!(completion["points_awarded"], 5);
    assert_eq!(env.json(&["today", "--date", "2030-04-15"])["tasks"].as_array().unwrap().len(), 0);

    let points = env.json(&["points"]);
    assert_eq!(points["points"], 5);
    assert_eq!(points["tasks_completed"], 1);
}

#[test]
fn test_project_task_becomes_manual_milestone() {
    let env = TestEnv::new();
    let id = env.create_project(&["Piano", "--wbs", BUDGET_TREE]);

    let added = env.json(&["task", "add", "Record a take", "--project", &id, "--estimate", "10"]);
    assert_eq!(added["kind"], "milestone");
    assert_eq!(added["item"]["is_manual"], true);
    assert_eq!(added["item"]["estimated_minutes"], 10);
    assert_eq!(added["item"]["order_index"], 3);
}

#[test]
fn test_project_milestone_rejects_plan_date() {
    let env = TestEnv::new();
    let id = env.create_project(&["Piano"]);
    env.gos()
        .args(["task", "add", "Record", "--project", &id, "--date", "2030-04-15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--daily"));

    let added = env.json(&["task", "add", "Record", "--project", &id, "--daily", "--date", "2030-04-15"]);
    assert_eq!(added["item"]["plan_date"], "2030-04-15");
    assert_eq!(env.json(&["today", "--date", "2030-04-15"])["tasks"][0]["title"], "Record");
    assert_eq!(env.json(&["milestone", "list", &id])["count"], 0);
}

#[test]
fn test_task_add_unknown_project() {
    let env = TestEnv::new();
    env.gos()
        .args(["task", "add", "Orphan", "--project", "gp-ffffff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not found"));
}

#[test]
fn test_human_today() {
    let env = TestEnv::new();
    env.create_project(&["Piano", "--minutes", "40", "--wbs", BUDGET_TREE]);
    env.gos()
        .args(["-H", "today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Piano"))
        .stdout(predicate::str::contains("[30 of 40 min]"))
        .stdout(predicate::str::contains("Warm up"));
}
