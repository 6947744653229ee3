//! Difficulty adjustment for stalled projects.
//!
//! Two modes, picked from the stagnation count: exactly 3 days asks the model
//! to make the project easier (rewrite the target, lower estimates); 7 or more
//! asks it to redefine the goal (rewrite the target, add smaller milestones).
//! Any other count is a successful no-op.
//!
//! The reply is parsed and validated in full before anything is written, and
//! all writes happen in one transaction. A reply that can't be parsed is a
//! [`Error::GenerationParse`] and leaves the project exactly as it was; a
//! reply that parses but asks for nothing is a successful, empty adjustment.

use serde::{Deserialize, Serialize};

use crate::engine::{parse_generated, progress};
use crate::llm::{CompletionOptions, LanguageModel};
use crate::models::prompts::{self, REDEFINE_GOALS_PROMPT_TEMPLATE, REDUCE_DIFFICULTY_PROMPT_TEMPLATE};
use crate::models::{AI_MILESTONE_ORDER_INDEX, DEFAULT_LEAF_MINUTES, Milestone, Project};
use crate::storage::{MILESTONE_PREFIX, Storage, generate_id};
use crate::{Error, Result};

/// What the model is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustMode {
    ReduceDifficulty,
    RedefineGoals,
}

impl AdjustMode {
    /// 3 → reduce, 7 and up → redefine, anything else → nothing.
    pub fn for_stagnation(days: u32) -> Option<Self> {
        match days {
            3 => Some(AdjustMode::ReduceDifficulty),
            d if d >= 7 => Some(AdjustMode::RedefineGoals),
            _ => None,
        }
    }

    fn template(&self) -> &'static str {
        match self {
            AdjustMode::ReduceDifficulty => REDUCE_DIFFICULTY_PROMPT_TEMPLATE,
            AdjustMode::RedefineGoals => REDEFINE_GOALS_PROMPT_TEMPLATE,
        }
    }
}

/// Result of an [`DifficultyAdjuster::adjust`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjustOutcome {
    /// The stagnation count doesn't call for an adjustment.
    NotNeeded { project_id: String, stagnation_days: u32 },
    Applied(AppliedAdjustment),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAdjustment {
    pub project_id: String,
    pub mode: AdjustMode,
    pub target_rewritten: bool,
    /// Milestones whose estimate changed
    pub reestimated: usize,
    /// IDs of milestones added
    pub added: Vec<String>,
    pub progress_percent: u8,
}

impl AppliedAdjustment {
    pub fn is_empty(&self) -> bool {
        !self.target_rewritten && self.reestimated == 0 && self.added.is_empty()
    }
}

/// Reply shape shared by both modes; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustmentReply {
    #[serde(default)]
    new_target_description: Option<String>,
    #[serde(default)]
    milestone_adjustments: Option<Vec<EstimateChange>>,
    #[serde(default)]
    new_milestones: Option<Vec<NewMilestone>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateChange {
    #[serde(alias = "milestoneId")]
    id: String,
    new_estimated_minutes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMilestone {
    title: String,
    #[serde(default)]
    estimated_minutes: Option<i64>,
}

/// A validated reply, ready to apply.
struct Plan {
    target: Option<String>,
    estimates: Vec<(String, u32)>,
    additions: Vec<(String, u32)>,
}

/// Asks the language model for adjustments and applies them.
pub struct DifficultyAdjuster {
    model: Box<dyn LanguageModel>,
    options: CompletionOptions,
}

impl DifficultyAdjuster {
    pub fn new(model: Box<dyn LanguageModel>, options: CompletionOptions) -> Self {
        Self { model, options }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Adjust `project_id` for a stagnation count of `stagnation_days`.
    pub fn adjust(&self, storage: &Storage, project_id: &str, stagnation_days: u32) -> Result<AdjustOutcome> {
        let project = storage.get_project(project_id)?;
        let Some(mode) = AdjustMode::for_stagnation(stagnation_days) else {
            tracing::debug!(project = project_id, stagnation_days, "no adjustment needed");
            return Ok(AdjustOutcome::NotNeeded {
                project_id: project_id.to_string(),
                stagnation_days,
            });
        };

        let open = storage.list_milestones(project_id, true)?;
        let prompt = build_prompt(mode, &project, stagnation_days, &open);

        tracing::info!(project = project_id, ?mode, model = self.model.name(), "requesting adjustment");
        let raw = self.model.complete(&prompt, &self.options)?;
        let reply: AdjustmentReply = parse_generated(&raw)?;
        let plan = validate(reply, &raw)?;

        let applied = storage.in_transaction(|s| apply(s, &project, mode, &plan, &raw))?;
        tracing::info!(
            project = project_id,
            ?mode,
            target_rewritten = applied.target_rewritten,
            reestimated = applied.reestimated,
            added = applied.added.len(),
            "adjustment applied"
        );
        Ok(AdjustOutcome::Applied(applied))
    }
}

fn build_prompt(mode: AdjustMode, project: &Project, days: u32, open: &[Milestone]) -> String {
    let listing = if open.is_empty() {
        "(none)".to_string()
    } else {
        open.iter()
            .map(|m| {
                let minutes = m.estimated_minutes.filter(|m| *m > 0).unwrap_or(crate::models::DEFAULT_ESTIMATE_MINUTES);
                format!("- [{}] {} ({} min)", m.id, m.title, minutes)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let target = if project.target_description.trim().is_empty() {
        "(none)"
    } else {
        project.target_description.as_str()
    };
    let days = days.to_string();

    prompts::render(
        mode.template(),
        &[
            ("title", project.title.as_str()),
            ("days", days.as_str()),
            ("target", target),
            ("open_milestones", listing.as_str()),
        ],
    )
}

fn invalid(message: String, raw: &str) -> Error {
    tracing::warn!(%message, raw, "rejected generated adjustment");
    Error::GenerationParse {
        message,
        raw: raw.to_string(),
    }
}

fn validate(reply: AdjustmentReply, raw: &str) -> Result<Plan> {
    let target = reply
        .new_target_description
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut estimates = Vec::new();
    for change in reply.milestone_adjustments.unwrap_or_default() {
        let minutes = u32::try_from(change.new_estimated_minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| {
                invalid(
                    format!(
                        "newEstimatedMinutes must be a positive integer (milestone {}: {})",
                        change.id, change.new_estimated_minutes
                    ),
                    raw,
                )
            })?;
        estimates.push((change.id, minutes));
    }

    let mut additions = Vec::new();
    for new in reply.new_milestones.unwrap_or_default() {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(invalid("new milestone title must not be empty".to_string(), raw));
        }
        let minutes = match new.estimated_minutes {
            None | Some(0) => DEFAULT_LEAF_MINUTES,
            Some(m) => u32::try_from(m).map_err(|_| {
                invalid(format!("estimatedMinutes out of range for \"{}\": {}", title, m), raw)
            })?,
        };
        additions.push((title, minutes));
    }

    Ok(Plan {
        target,
        estimates,
        additions,
    })
}

fn apply(
    storage: &Storage,
    project: &Project,
    mode: AdjustMode,
    plan: &Plan,
    raw: &str,
) -> Result<AppliedAdjustment> {
    // Every referenced milestone must belong to this project before anything is written.
    // An id the model made up is bad output, not a missing record.
    for (id, _) in &plan.estimates {
        let owned = match storage.get_milestone(id) {
            Ok(milestone) => milestone.project_id == project.id,
            Err(Error::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !owned {
            return Err(invalid(
                format!("milestone {} is not part of project {}", id, project.id),
                raw,
            ));
        }
    }

    if let Some(target) = &plan.target {
        storage.set_target_description(&project.id, target)?;
    }
    for (id, minutes) in &plan.estimates {
        storage.set_milestone_estimate(id, *minutes)?;
    }

    let mut added = Vec::new();
    if !plan.additions.is_empty() {
        let base = storage
            .max_order_index(&project.id)?
            .map_or(AI_MILESTONE_ORDER_INDEX, |max| max.saturating_add(1).max(AI_MILESTONE_ORDER_INDEX));
        let milestones: Vec<Milestone> = plan
            .additions
            .iter()
            .enumerate()
            .map(|(i, (title, minutes))| {
                let seed = format!("{}:adjust:{}:{}", project.id, i, title);
                let mut m = Milestone::new(
                    generate_id(MILESTONE_PREFIX, &seed),
                    project.id.clone(),
                    title.clone(),
                    base + i as i64,
                );
                m.estimated_minutes = Some(*minutes);
                m.is_manual = true;
                m
            })
            .collect();
        storage.add_milestones(&milestones)?;
        added = milestones.into_iter().map(|m| m.id).collect();
    }

    let progress_percent = progress::refresh(storage, &project.id)?;

    Ok(AppliedAdjustment {
        project_id: project.id.clone(),
        mode,
        target_rewritten: plan.target.is_some(),
        reestimated: plan.estimates.len(),
        added,
        progress_percent,
    })
}
