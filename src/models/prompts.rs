//! Prompt templates sent to the language model.
//!
//! Placeholders are written as `{name}` and filled in with [`render`].
//! Every template asks for bare JSON; replies are still passed through
//! `llm::strip_code_fences` because models wrap JSON in fences anyway.

/// Sent after three consecutive inactive days.
/// Placeholders: `{title}`, `{days}`, `{target}`, `{open_milestones}`.
pub const REDUCE_DIFFICULTY_PROMPT_TEMPLATE: &str = r#"The project "{title}" has had no progress for {days} consecutive days.
Current target: {target}
Open milestones (id, title, estimated minutes):
{open_milestones}

Suggest how to make this project easier to resume. You may rewrite the target description and/or lower the estimated minutes of open milestones. Only reference milestone ids from the list above.

Reply with JSON only, no other text:
{"newTargetDescription": "optional revised target", "milestoneAdjustments": [{"milestoneId": "gm-xxxxxx", "newEstimatedMinutes": 15}]}
Both fields are optional; omit a field to leave it unchanged."#;

/// Sent after seven or more consecutive inactive days.
/// Placeholders: `{title}`, `{days}`, `{target}`, `{open_milestones}`.
pub const REDEFINE_GOALS_PROMPT_TEMPLATE: &str = r#"The project "{title}" has had no progress for {days} consecutive days.
Current target: {target}
Open milestones (id, title, estimated minutes):
{open_milestones}

Suggest a redefined stage goal that the user can realistically restart with. You may rewrite the target description and/or propose new, smaller milestones.

Reply with JSON only, no other text:
{"newTargetDescription": "optional revised target", "newMilestones": [{"title": "A small concrete step", "estimatedMinutes": 20}]}
Both fields are optional; omit a field to leave it unchanged."#;

/// Turns a free-text goal into a project with a flat milestone list.
/// Placeholders: `{goal}`, `{daily_minutes}`.
pub const PLAN_PROJECT_PROMPT_TEMPLATE: &str = r#"You are a work-breakdown-structure expert. Produce a structured plan for this goal.

Goal: {goal}
Suggested daily investment: {daily_minutes} minutes

Return 3-6 concrete, executable milestones of 30-120 minutes each.

Reply with JSON only, no other text:
{"title": "Short project title", "description": "One-sentence project description", "milestones": [{"title": "First concrete step", "estimatedMinutes": 45}]}"#;

/// Asks for a daily time budget for a goal.
/// Placeholders: `{goal}`, `{answers}` (empty when there are none).
pub const SUGGEST_DAILY_MINUTES_PROMPT_TEMPLATE: &str = r#"Suggest a reasonable daily time investment in minutes for the project goal below.

Goal: {goal}
{answers}
Reply with a single number only: a multiple of 15 between 15 and 240. No explanation."#;

/// Splits a task into a two-minute starting action plus a nudge.
/// Placeholder: `{task_title}`.
pub const TWO_MINUTE_BREAKDOWN_PROMPT_TEMPLATE: &str = r#"You help people start tasks they are avoiding. Break the task below into one concrete action that can be started within two minutes, and write a short, direct message that pushes the user to start right now.

Task: {task_title}

Reply with JSON only, no other text:
{"twoMinuteVersion": "e.g. open the editor and create the file", "antiProcrastinationScript": "e.g. You already know the first step. Do it now."}"#;

/// Fill `{name}` placeholders in a template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}
