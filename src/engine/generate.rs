//! Model-driven project planning, daily budget suggestions and two-minute
//! breakdowns.
//!
//! Operations that write parse and validate the model's reply first; a reply
//! that doesn't fit leaves storage untouched.

use serde::{Deserialize, Serialize};

use crate::engine::projects::{self, NewProject};
use crate::engine::{parse_generated, require_positive_minutes};
use crate::llm::{CompletionOptions, LanguageModel};
use crate::models::prompts::{
    self, PLAN_PROJECT_PROMPT_TEMPLATE, SUGGEST_DAILY_MINUTES_PROMPT_TEMPLATE, TWO_MINUTE_BREAKDOWN_PROMPT_TEMPLATE,
};
use crate::models::{DEFAULT_DAILY_MINUTES, Project, WbsNode};
use crate::storage::Storage;
use crate::{Error, Result};

/// Estimate for a planned milestone the model gave no estimate for.
pub const DEFAULT_PLANNED_MINUTES: u32 = 60;

#[derive(Debug, Deserialize)]
struct PlanReply {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    milestones: Option<Vec<PlannedMilestone>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedMilestone {
    title: String,
    #[serde(default)]
    estimated_minutes: Option<i64>,
}

/// Turn a free-text goal into a project whose WBS is the model's milestone list.
pub fn plan_project(
    storage: &Storage,
    model: &dyn LanguageModel,
    options: &CompletionOptions,
    goal: &str,
    daily_minutes: Option<u32>,
) -> Result<Project> {
    let goal = goal.trim();
    if goal.is_empty() {
        return Err(Error::Validation("Goal must not be empty".to_string()));
    }
    let daily_minutes = require_positive_minutes(daily_minutes, "Daily minutes")?
        .unwrap_or(DEFAULT_DAILY_MINUTES);

    let minutes = daily_minutes.to_string();
    let prompt = prompts::render(
        PLAN_PROJECT_PROMPT_TEMPLATE,
        &[("goal", goal), ("daily_minutes", minutes.as_str())],
    );
    let raw = model.complete(&prompt, options)?;
    let reply: PlanReply = parse_generated(&raw)?;

    let mut tree = Vec::new();
    for planned in reply.milestones.unwrap_or_default() {
        let title = planned.title.trim();
        if title.is_empty() {
            return Err(parse_error("milestone title must not be empty", &raw));
        }
        let minutes = match planned.estimated_minutes {
            None | Some(0) => DEFAULT_PLANNED_MINUTES,
            Some(m) => u32::try_from(m)
                .map_err(|_| parse_error(&format!("estimatedMinutes out of range: {}", m), &raw))?,
        };
        tree.push(WbsNode::leaf(title, Some(minutes)));
    }

    let non_blank = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let project = projects::create_project(
        storage,
        NewProject {
            title: non_blank(reply.title).unwrap_or_else(|| goal.to_string()),
            target_description: non_blank(reply.description).unwrap_or_else(|| goal.to_string()),
            daily_minutes: Some(daily_minutes),
            wbs_tree: Some(tree),
        },
    )?;

    tracing::info!(project = %project.id, model = model.name(), "project planned");
    Ok(project)
}

/// Bounds and step for a suggested daily budget.
pub const MIN_SUGGESTED_MINUTES: u32 = 15;
pub const MAX_SUGGESTED_MINUTES: u32 = 240;
const SUGGESTED_MINUTES_STEP: u64 = 15;

/// The reply is a single number.
const SUGGESTION_MAX_TOKENS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinutesSuggestion {
    pub goal: String,
    pub daily_minutes: u32,
    /// False when the reply held no number and the default budget was used
    pub from_model: bool,
}

/// Ask the model how many minutes a day `goal` deserves.
///
/// The first number in the reply is rounded to the nearest multiple of 15
/// and clamped to 15..=240. A reply without a number falls back to the
/// default budget. `answers` are the user's replies to clarifying questions.
pub fn suggest_daily_minutes(model: &dyn LanguageModel, goal: &str, answers: &[String]) -> Result<MinutesSuggestion> {
    let goal = goal.trim();
    if goal.is_empty() {
        return Err(Error::Validation("Goal must not be empty".to_string()));
    }

    let answers = if answers.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = answers
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}. {}", i + 1, a.trim()))
            .collect();
        format!("The user's answers to clarifying questions:\n{}\n", lines.join("\n"))
    };
    let prompt = prompts::render(
        SUGGEST_DAILY_MINUTES_PROMPT_TEMPLATE,
        &[("goal", goal), ("answers", answers.as_str())],
    );
    let raw = model.complete(&prompt, &CompletionOptions::with_max_tokens(SUGGESTION_MAX_TOKENS))?;

    let (daily_minutes, from_model) = match first_number(&raw) {
        Some(n) => (normalize_minutes(n), true),
        None => {
            tracing::warn!(raw = %raw, "no number in budget suggestion; using the default");
            (DEFAULT_DAILY_MINUTES, false)
        }
    };
    Ok(MinutesSuggestion {
        goal: goal.to_string(),
        daily_minutes,
        from_model,
    })
}

fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    Some(digits.parse().unwrap_or(u64::MAX))
}

fn normalize_minutes(minutes: u64) -> u32 {
    let rounded = minutes.saturating_add(SUGGESTED_MINUTES_STEP / 2) / SUGGESTED_MINUTES_STEP * SUGGESTED_MINUTES_STEP;
    let clamped = rounded.clamp(u64::from(MIN_SUGGESTED_MINUTES), u64::from(MAX_SUGGESTED_MINUTES));
    u32::try_from(clamped).unwrap_or(MAX_SUGGESTED_MINUTES)
}

/// A two-minute starting action plus a nudge to begin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub two_minute_version: String,
    pub anti_procrastination_script: String,
}

fn request_breakdown(model: &dyn LanguageModel, options: &CompletionOptions, title: &str) -> Result<Breakdown> {
    let prompt = prompts::render(TWO_MINUTE_BREAKDOWN_PROMPT_TEMPLATE, &[("task_title", title)]);
    let raw = model.complete(&prompt, options)?;
    let mut breakdown: Breakdown = parse_generated(&raw)?;

    breakdown.two_minute_version = breakdown.two_minute_version.trim().to_string();
    breakdown.anti_procrastination_script = breakdown.anti_procrastination_script.trim().to_string();
    if breakdown.two_minute_version.is_empty() {
        return Err(parse_error("twoMinuteVersion must not be empty", &raw));
    }
    Ok(breakdown)
}

/// Generate and store a two-minute breakdown for a milestone.
pub fn breakdown_milestone(
    storage: &Storage,
    model: &dyn LanguageModel,
    options: &CompletionOptions,
    id: &str,
) -> Result<Breakdown> {
    let mut milestone = storage.get_milestone(id)?;
    let breakdown = request_breakdown(model, options, &milestone.title)?;

    milestone.two_minute_version = Some(breakdown.two_minute_version.clone());
    milestone.anti_procrastination_script = Some(breakdown.anti_procrastination_script.clone());
    storage.update_milestone(&milestone)?;
    Ok(breakdown)
}

/// Generate and store a two-minute breakdown for a daily task.
pub fn breakdown_task(
    storage: &Storage,
    model: &dyn LanguageModel,
    options: &CompletionOptions,
    id: &str,
) -> Result<Breakdown> {
    let mut task = storage.get_daily_task(id)?;
    let breakdown = request_breakdown(model, options, &task.title)?;

    task.two_minute_version = Some(breakdown.two_minute_version.clone());
    task.anti_procrastination_script = Some(breakdown.anti_procrastination_script.clone());
    storage.update_daily_task(&task)?;
    Ok(breakdown)
}

fn parse_error(message: &str, raw: &str) -> Error {
    tracing::warn!(message, raw, "rejected generated output");
    Error::GenerationParse {
        message: message.to_string(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plan::{AddedTask, add_task};
    use crate::engine::today;
    use crate::models::Milestone;
    use crate::test_utils::{ScriptedModel, TestEnv};

    #[test]
    fn test_plan_project_creates_milestones() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let model = ScriptedModel::new().reply(
            r#"```json
{"title": "Guitar basics", "description": "Play three chords cleanly",
 "milestones": [{"title": "Tune the guitar", "estimatedMinutes": 15}, {"title": "Learn G, C, D"}]}
```"#,
        );

        let project = plan_project(&storage, &model, &CompletionOptions::default(), "learn guitar", Some(30)).unwrap();
        assert_eq!(project.title, "Guitar basics");
        assert_eq!(project.target_description, "Play three chords cleanly");
        assert_eq!(project.daily_minutes, Some(30));
        assert!(model.prompts()[0].contains("Goal: learn guitar"));
        assert!(model.prompts()[0].contains("30 minutes"));

        let ms = storage.list_milestones(&project.id, false).unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0].estimated_minutes, Some(15));
        assert_eq!(ms[1].estimated_minutes, Some(DEFAULT_PLANNED_MINUTES));
        assert!(ms.iter().all(|m| !m.is_manual));
        assert_eq!(project.wbs_tree.map(|t| t.len()), Some(2));
    }

    #[test]
    fn test_plan_project_falls_back_to_goal() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let model = ScriptedModel::new().reply(r#"{"milestones": []}"#);

        let project = plan_project(&storage, &model, &CompletionOptions::default(), "Run a 5k", None).unwrap();
        assert_eq!(project.title, "Run a 5k");
        assert_eq!(project.target_description, "Run a 5k");
        assert_eq!(project.daily_minutes, Some(DEFAULT_DAILY_MINUTES));
    }

    #[test]
    fn test_plan_project_parse_failure_creates_nothing() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let model = ScriptedModel::new().reply("Here is your plan: step 1, step 2");

        let err = plan_project(&storage, &model, &CompletionOptions::default(), "x", None).unwrap_err();
        assert!(matches!(err, Error::GenerationParse { .. }));
        assert!(storage.list_projects(None).unwrap().is_empty());
    }

    #[test]
    fn test_plan_project_empty_goal() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let model = ScriptedModel::new();
        assert!(matches!(
            plan_project(&storage, &model, &CompletionOptions::default(), "  ", None),
            Err(Error::Validation(_))
        ));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_normalize_minutes() {
        assert_eq!(normalize_minutes(45), 45);
        assert_eq!(normalize_minutes(52), 45);
        assert_eq!(normalize_minutes(53), 60);
        assert_eq!(normalize_minutes(0), MIN_SUGGESTED_MINUTES);
        assert_eq!(normalize_minutes(7), MIN_SUGGESTED_MINUTES);
        assert_eq!(normalize_minutes(600), MAX_SUGGESTED_MINUTES);
        assert_eq!(normalize_minutes(u64::MAX), MAX_SUGGESTED_MINUTES);
    }

    #[test]
    fn test_suggest_daily_minutes_reads_first_number() {
        let model = ScriptedModel::new().reply("I'd say 50 minutes, maybe 90 on weekends.");
        let answers = vec!["Weekday evenings only".to_string()];

        let suggestion = suggest_daily_minutes(&model, "Learn Spanish", &answers).unwrap();
        assert_eq!(suggestion.daily_minutes, 45);
        assert!(suggestion.from_model);
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Goal: Learn Spanish"));
        assert!(prompt.contains("1. Weekday evenings only"));
    }

    #[test]
    fn test_suggest_daily_minutes_without_number_uses_default() {
        let model = ScriptedModel::new().reply("It depends on your schedule.");
        let suggestion = suggest_daily_minutes(&model, "Learn Spanish", &[]).unwrap();
        assert_eq!(suggestion.daily_minutes, DEFAULT_DAILY_MINUTES);
        assert!(!suggestion.from_model);
        assert!(!model.prompts()[0].contains("clarifying questions"));
    }

    #[test]
    fn test_suggest_daily_minutes_empty_goal() {
        let model = ScriptedModel::new();
        assert!(matches!(
            suggest_daily_minutes(&model, " ", &[]),
            Err(Error::Validation(_))
        ));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_breakdown_milestone_stores_fields() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage
            .create_project(&Project::new("gp-000001".into(), "P".into(), String::new()))
            .unwrap();
        storage
            .add_milestone(&Milestone::new("gm-000001".into(), "gp-000001".into(), "Write chapter 1".into(), 0))
            .unwrap();
        let model = ScriptedModel::new().reply(
            r#"{"twoMinuteVersion": "Open the draft and write one sentence", "antiProcrastinationScript": "Just one sentence."}"#,
        );

        let breakdown = breakdown_milestone(&storage, &model, &CompletionOptions::default(), "gm-000001").unwrap();
        assert_eq!(breakdown.two_minute_version, "Open the draft and write one sentence");
        assert!(model.prompts()[0].contains("Task: Write chapter 1"));

        let stored = storage.get_milestone("gm-000001").unwrap();
        assert_eq!(stored.two_minute_version.as_deref(), Some("Open the draft and write one sentence"));
        assert_eq!(stored.anti_procrastination_script.as_deref(), Some("Just one sentence."));
    }

    #[test]
    fn test_breakdown_task_parse_failure_mutates_nothing() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let AddedTask::Task(task) = add_task(&storage, "File taxes", None, None, today()).unwrap() else {
            panic!("expected a standalone task");
        };
        let model = ScriptedModel::new().reply(r#"{"twoMinuteVersion": ""}"#);

        assert!(matches!(
            breakdown_task(&storage, &model, &CompletionOptions::default(), &task.id),
            Err(Error::GenerationParse { .. })
        ));
        assert_eq!(storage.get_daily_task(&task.id).unwrap().two_minute_version, None);
    }
}
