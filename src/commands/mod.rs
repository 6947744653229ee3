//! Command implementations for the gos CLI.
//!
//! Each command opens the store in the data directory, calls into the
//! [`engine`](crate::engine), and returns a result that renders as JSON or as
//! human-readable text. Commands are grouped by entity:
//! - `project_*` - Project lifecycle and AI planning
//! - `milestone_*` - Manual milestones, completion, breakdowns
//! - `wbs_*` - Reading and applying a project's WBS tree
//! - `task_*` - Daily tasks
//! - `today`, `sweep_run`, `adjust`, `points` - Planning and recovery
//! - `config_*` - config.kdl / state.kdl

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{self, ConfigOverrides, KeyFile, ResolvedSettings, mask_secret};
use crate::engine::adjust::{AdjustOutcome, DifficultyAdjuster};
use crate::engine::generate::{self, Breakdown, MinutesSuggestion};
use crate::engine::plan::{self, AddedTask, DailyPlan, DailyPoints, MilestoneCompletion, TaskCompletion};
use crate::engine::projects::{self, NewProject, ProjectDetail, ProjectUpdate};
use crate::engine::stagnation::{self, SweepReport};
use crate::engine::wbs_sync::{self, WbsSyncReport};
use crate::engine::today as local_today;
use crate::llm::{CompletionOptions, LanguageModel, build_provider};
use crate::models::wbs::{self, WbsLeaf, WbsNode};
use crate::models::{Milestone, Project, ProjectStatus};
use crate::storage::Storage;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

fn open_storage(data_dir: &Path) -> Result<Storage> {
    Storage::open(data_dir)
}

/// Build the configured language model and its request options.
fn language_model(
    data_dir: &Path,
    overrides: &ConfigOverrides,
) -> Result<(Box<dyn LanguageModel>, CompletionOptions)> {
    let settings = config::resolve(data_dir, overrides)?.llm_settings();
    let model = build_provider(&settings);
    tracing::debug!(provider = %settings.provider, model = model.name(), "language model ready");
    Ok((model, settings.completion_options()))
}

fn parse_status(status: Option<&str>) -> Result<Option<ProjectStatus>> {
    status
        .map(|s| s.parse::<ProjectStatus>().map_err(Error::Validation))
        .transpose()
}

fn estimate_label(minutes: Option<u32>) -> String {
    minutes.map_or_else(|| "no estimate".to_string(), |m| format!("{} min", m))
}

fn milestone_line(out: &mut String, m: &Milestone) {
    let check = if m.completed { "x" } else { " " };
    let manual = if m.is_manual { " [manual]" } else { "" };
    let _ = writeln!(
        out,
        "  [{}] {} {} ({}){}",
        check,
        m.id,
        m.title,
        estimate_label(m.estimated_minutes),
        manual
    );
}

// === Project Commands ===

#[derive(Serialize)]
pub struct ProjectCreated {
    #[serde(flatten)]
    pub project: Project,
    pub milestone_count: usize,
}

impl Output for ProjectCreated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created project {} \"{}\" with {} milestone(s)",
            self.project.id, self.project.title, self.milestone_count
        )
    }
}

fn created(storage: &Storage, project: Project) -> Result<ProjectCreated> {
    let milestone_count = storage.list_milestones(&project.id, false)?.len();
    Ok(ProjectCreated {
        project,
        milestone_count,
    })
}

/// Create a project. `wbs_json` is an optional initial tree in wire format.
pub fn project_create(
    data_dir: &Path,
    title: String,
    target: Option<String>,
    daily_minutes: Option<u32>,
    wbs_json: Option<String>,
) -> Result<ProjectCreated> {
    let wbs_tree = wbs_json.as_deref().map(wbs::parse_tree).transpose()?;
    let daily_minutes = match daily_minutes {
        Some(m) => Some(m),
        None => config::read_config(data_dir)?.default_daily_minutes,
    };

    let storage = open_storage(data_dir)?;
    let project = projects::create_project(
        &storage,
        NewProject {
            title,
            target_description: target.unwrap_or_default(),
            daily_minutes,
            wbs_tree,
        },
    )?;
    created(&storage, project)
}

/// Ask the language model to plan a project from a goal.
pub fn project_plan(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    goal: &str,
    daily_minutes: Option<u32>,
) -> Result<ProjectCreated> {
    let (model, options) = language_model(data_dir, overrides)?;
    let storage = open_storage(data_dir)?;
    let project = generate::plan_project(&storage, model.as_ref(), &options, goal, daily_minutes)?;
    created(&storage, project)
}

/// Ask the language model for a daily budget for a goal.
pub fn project_suggest_minutes(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    goal: &str,
    answers: &[String],
) -> Result<MinutesSuggestion> {
    let (model, _options) = language_model(data_dir, overrides)?;
    generate::suggest_daily_minutes(model.as_ref(), goal, answers)
}

impl Output for MinutesSuggestion {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let note = if self.from_model { "" } else { " (default; the model gave no number)" };
        format!("Suggested daily budget: {} min{}", self.daily_minutes, note)
    }
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }

        let mut out = format!("{} project(s):\n\n", self.count);
        for p in &self.projects {
            let budget = p
                .daily_minutes
                .map_or_else(String::new, |m| format!(", {} min/day", m));
            let _ = writeln!(
                out,
                "{} [{}] {} - {}%{}, stagnant {} day(s)",
                p.id, p.status, p.title, p.progress_percent, budget, p.stagnation_days
            );
        }
        out.trim_end().to_string()
    }
}

pub fn project_list(data_dir: &Path, status: Option<&str>, all: bool) -> Result<ProjectList> {
    let status = parse_status(status)?;
    let storage = open_storage(data_dir)?;
    let projects = projects::list_projects(&storage, status, all)?;
    let count = projects.len();
    Ok(ProjectList { projects, count })
}

impl Output for ProjectDetail {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let p = &self.project;
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", p.id, p.title);
        let _ = writeln!(out, "  Status: {}", p.status);
        if !p.target_description.is_empty() {
            let _ = writeln!(out, "  Target: {}", p.target_description);
        }
        if let Some(m) = p.daily_minutes {
            let _ = writeln!(out, "  Daily budget: {} min", m);
        }
        let _ = writeln!(
            out,
            "  Progress: {}% ({}/{} milestones)",
            self.progress.percent, self.progress.completed, self.progress.total
        );
        let _ = writeln!(out, "  Stagnation: {} day(s)", p.stagnation_days);
        if let Some(date) = p.last_activity_date {
            let _ = writeln!(out, "  Last activity: {}", date);
        }
        if !self.milestones.is_empty() {
            out.push_str("\nMilestones:\n");
            for m in &self.milestones {
                milestone_line(&mut out, m);
            }
        }
        out.trim_end().to_string()
    }
}

pub fn project_show(data_dir: &Path, id: &str) -> Result<ProjectDetail> {
    let storage = open_storage(data_dir)?;
    projects::show_project(&storage, id)
}

#[derive(Serialize)]
pub struct ProjectUpdated {
    pub id: String,
    pub updated_fields: Vec<String>,
    pub project: Project,
}

impl Output for ProjectUpdated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.updated_fields.is_empty() {
            format!("No changes to project {}", self.id)
        } else {
            format!("Updated project {}: {}", self.id, self.updated_fields.join(", "))
        }
    }
}

pub fn project_update(
    data_dir: &Path,
    id: &str,
    title: Option<String>,
    target: Option<String>,
    daily_minutes: Option<u32>,
    status: Option<&str>,
) -> Result<ProjectUpdated> {
    let update = ProjectUpdate {
        title,
        target_description: target,
        daily_minutes,
        status: parse_status(status)?,
    };

    let mut updated_fields = Vec::new();
    if update.title.is_some() {
        updated_fields.push("title".to_string());
    }
    if update.target_description.is_some() {
        updated_fields.push("target_description".to_string());
    }
    if update.daily_minutes.is_some() {
        updated_fields.push("daily_minutes".to_string());
    }
    if update.status.is_some() {
        updated_fields.push("status".to_string());
    }

    let storage = open_storage(data_dir)?;
    let project = if update.is_empty() {
        storage.get_project(id)?
    } else {
        projects::update_project(&storage, id, update)?
    };
    Ok(ProjectUpdated {
        id: project.id.clone(),
        updated_fields,
        project,
    })
}

#[derive(Serialize)]
pub struct ProjectDeleted {
    pub id: String,
    pub title: String,
}

impl Output for ProjectDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted project {} \"{}\"", self.id, self.title)
    }
}

pub fn project_delete(data_dir: &Path, id: &str) -> Result<ProjectDeleted> {
    let storage = open_storage(data_dir)?;
    let project = projects::delete_project(&storage, id)?;
    Ok(ProjectDeleted {
        id: project.id,
        title: project.title,
    })
}

// === Milestone Commands ===

impl Output for Milestone {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Added milestone {} \"{}\" to {} ({})",
            self.id,
            self.title,
            self.project_id,
            estimate_label(self.estimated_minutes)
        )
    }
}

pub fn milestone_add(
    data_dir: &Path,
    project_id: &str,
    title: &str,
    estimated_minutes: Option<u32>,
) -> Result<Milestone> {
    let storage = open_storage(data_dir)?;
    plan::add_milestone(&storage, project_id, title, estimated_minutes)
}

#[derive(Serialize)]
pub struct MilestoneList {
    pub project_id: String,
    pub milestones: Vec<Milestone>,
    pub count: usize,
}

impl Output for MilestoneList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.milestones.is_empty() {
            return format!("No milestones for {}.", self.project_id);
        }
        let mut out = format!("{} milestone(s) for {}:\n", self.count, self.project_id);
        for m in &self.milestones {
            milestone_line(&mut out, m);
        }
        out.trim_end().to_string()
    }
}

pub fn milestone_list(data_dir: &Path, project_id: &str, incomplete_only: bool) -> Result<MilestoneList> {
    let storage = open_storage(data_dir)?;
    storage.get_project(project_id)?;
    let milestones = storage.list_milestones(project_id, incomplete_only)?;
    let count = milestones.len();
    Ok(MilestoneList {
        project_id: project_id.to_string(),
        milestones,
        count,
    })
}

impl Output for MilestoneCompletion {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if !self.newly_completed {
            return format!("Milestone {} was already complete", self.milestone.id);
        }
        format!(
            "Completed milestone {} \"{}\" (+{} points, project now {}%)",
            self.milestone.id, self.milestone.title, self.points_awarded, self.progress_percent
        )
    }
}

pub fn milestone_complete(data_dir: &Path, id: &str) -> Result<MilestoneCompletion> {
    let storage = open_storage(data_dir)?;
    plan::complete_milestone(&storage, id)
}

#[derive(Serialize)]
pub struct BreakdownResult {
    pub id: String,
    #[serde(flatten)]
    pub breakdown: Breakdown,
}

impl Output for BreakdownResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Two-minute version of {}:\n  {}", self.id, self.breakdown.two_minute_version);
        if !self.breakdown.anti_procrastination_script.is_empty() {
            let _ = write!(out, "\n\n{}", self.breakdown.anti_procrastination_script);
        }
        out
    }
}

pub fn milestone_breakdown(data_dir: &Path, overrides: &ConfigOverrides, id: &str) -> Result<BreakdownResult> {
    let storage = open_storage(data_dir)?;
    storage.get_milestone(id)?;
    let (model, options) = language_model(data_dir, overrides)?;
    let breakdown = generate::breakdown_milestone(&storage, model.as_ref(), &options, id)?;
    Ok(BreakdownResult {
        id: id.to_string(),
        breakdown,
    })
}

// === WBS Commands ===

#[derive(Serialize)]
pub struct WbsView {
    pub project_id: String,
    pub tree: Vec<WbsNode>,
    /// The leaves in milestone order, with default estimates filled in
    pub leaves: Vec<WbsLeaf>,
}

impl Output for WbsView {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.tree.is_empty() {
            return format!("Project {} has no WBS tree.", self.project_id);
        }
        let mut out = format!("WBS for {}:\n", self.project_id);
        write_tree(&mut out, &self.tree, 1);
        out.trim_end().to_string()
    }
}

fn write_tree(out: &mut String, nodes: &[WbsNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node {
            WbsNode::Leaf {
                title,
                estimated_minutes,
            } => {
                let _ = writeln!(out, "{}- {} ({})", indent, title, estimate_label(*estimated_minutes));
            }
            WbsNode::Group { title, children } => {
                let _ = writeln!(out, "{}+ {}", indent, title);
                write_tree(out, children, depth + 1);
            }
        }
    }
}

pub fn wbs_show(data_dir: &Path, project_id: &str) -> Result<WbsView> {
    let storage = open_storage(data_dir)?;
    let tree = wbs_sync::stored_tree(&storage, project_id)?;
    let leaves = wbs::flatten(&tree);
    Ok(WbsView {
        project_id: project_id.to_string(),
        tree,
        leaves,
    })
}

impl Output for WbsSyncReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Synchronized {}: removed {}, created {}, kept {} manual milestone(s); progress {}%",
            self.project_id, self.removed, self.created, self.preserved_manual, self.progress_percent
        )
    }
}

/// Replace a project's WBS tree. The tree comes from `file` (`-` for stdin) or `tree_json`.
pub fn wbs_apply(
    data_dir: &Path,
    project_id: &str,
    tree_json: Option<String>,
    file: Option<PathBuf>,
) -> Result<WbsSyncReport> {
    let raw = match (tree_json, file) {
        (Some(_), Some(_)) => {
            return Err(Error::Validation("Pass the tree inline or with --file, not both".to_string()));
        }
        (Some(json), None) => json,
        (None, Some(path)) if path.as_os_str() == "-" => std::io::read_to_string(std::io::stdin())?,
        (None, Some(path)) => fs::read_to_string(&path)?,
        (None, None) => {
            return Err(Error::Validation("A WBS tree is required (inline JSON or --file)".to_string()));
        }
    };
    let tree = wbs::parse_tree(&raw)?;

    let storage = open_storage(data_dir)?;
    wbs_sync::apply_tree(&storage, project_id, &tree)
}

// === Task Commands ===

impl Output for AddedTask {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self {
            AddedTask::Milestone(m) => m.to_human(),
            AddedTask::Task(t) => format!("Added task {} \"{}\" for {}", t.id, t.title, t.plan_date),
        }
    }
}

pub fn task_add(
    data_dir: &Path,
    title: &str,
    project_id: Option<&str>,
    estimated_minutes: Option<u32>,
    date: Option<NaiveDate>,
    daily: bool,
) -> Result<AddedTask> {
    let storage = open_storage(data_dir)?;
    match project_id {
        Some(project_id) if daily => {
            plan::add_project_task(&storage, project_id, title, date.unwrap_or_else(local_today))
                .map(AddedTask::Task)
        }
        Some(_) if date.is_some() => Err(Error::Validation(
            "A project milestone has no plan date; add --daily to plan it as a task for that day".to_string(),
        )),
        _ => plan::add_task(
            &storage,
            title,
            project_id,
            estimated_minutes,
            date.unwrap_or_else(local_today),
        ),
    }
}

impl Output for TaskCompletion {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if !self.newly_completed {
            return format!("Task {} was already complete", self.task.id);
        }
        format!(
            "Completed task {} \"{}\" (+{} points)",
            self.task.id, self.task.title, self.points_awarded
        )
    }
}

pub fn task_complete(data_dir: &Path, id: &str) -> Result<TaskCompletion> {
    let storage = open_storage(data_dir)?;
    plan::complete_task(&storage, id)
}

pub fn task_breakdown(data_dir: &Path, overrides: &ConfigOverrides, id: &str) -> Result<BreakdownResult> {
    let storage = open_storage(data_dir)?;
    storage.get_daily_task(id)?;
    let (model, options) = language_model(data_dir, overrides)?;
    let breakdown = generate::breakdown_task(&storage, model.as_ref(), &options, id)?;
    Ok(BreakdownResult {
        id: id.to_string(),
        breakdown,
    })
}

// === Planning Commands ===

impl Output for DailyPlan {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("Plan for {}", self.date);
        if let Some(total) = self.total_daily_minutes {
            let _ = write!(out, " ({} min budgeted)", total);
        }
        out.push('\n');

        if self.projects.is_empty() && self.tasks.is_empty() {
            out.push_str("\nNothing planned.");
            return out;
        }
        for p in &self.projects {
            let _ = writeln!(
                out,
                "\n{} {} [{} of {} min]",
                p.project_id,
                p.title,
                p.planned_minutes(),
                p.budget_minutes
            );
            if p.milestones.is_empty() {
                out.push_str("  (no open milestones)\n");
            }
            for m in &p.milestones {
                milestone_line(&mut out, m);
            }
        }
        if !self.tasks.is_empty() {
            out.push_str("\nTasks:\n");
            for t in &self.tasks {
                let _ = writeln!(out, "  [ ] {} {}", t.id, t.title);
            }
        }
        out.trim_end().to_string()
    }
}

pub fn today(data_dir: &Path, date: Option<NaiveDate>) -> Result<DailyPlan> {
    let storage = open_storage(data_dir)?;
    plan::plan_day(&storage, date.unwrap_or_else(local_today))
}

#[derive(Serialize)]
pub struct ExtraPlan {
    pub project_id: String,
    pub excluded: Vec<String>,
    pub milestones: Vec<Milestone>,
}

impl Output for ExtraPlan {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.milestones.is_empty() {
            return format!("No more open milestones for {}.", self.project_id);
        }
        let mut out = format!("More for {}:\n", self.project_id);
        for m in &self.milestones {
            milestone_line(&mut out, m);
        }
        out.trim_end().to_string()
    }
}

pub fn today_extra(data_dir: &Path, project_id: &str, exclude: Vec<String>) -> Result<ExtraPlan> {
    let storage = open_storage(data_dir)?;
    let milestones = plan::plan_project_extra(&storage, project_id, &exclude)?;
    Ok(ExtraPlan {
        project_id: project_id.to_string(),
        excluded: exclude,
        milestones,
    })
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepRun {
    Completed { model: String, report: SweepReport },
    /// A sweep was already recorded for the date.
    Skipped { date: NaiveDate, last_sweep_date: NaiveDate },
}

impl Output for SweepRun {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let (model, report) = match self {
            SweepRun::Skipped { date, .. } => {
                return format!(
                    "Sweep already ran for {}. Use --force to pick up projects it has not evaluated.",
                    date
                );
            }
            SweepRun::Completed { model, report } => (model, report),
        };

        let mut out = format!(
            "Sweep for {}: {} project(s) checked, {} adjustment(s) triggered ({})\n",
            report.date, report.projects_checked, report.adjustments_triggered, model
        );
        if report.already_evaluated > 0 {
            let _ = writeln!(out, "  {} project(s) already evaluated for this day", report.already_evaluated);
        }
        for p in &report.projects {
            let state = if p.active_today {
                "active".to_string()
            } else {
                format!("stagnant {} day(s)", p.stagnation_days)
            };
            let escalation = match p.escalation {
                Some(stagnation::Escalation::MicroTasks) => " -> try two-minute versions today",
                Some(stagnation::Escalation::ReduceDifficulty) => " -> reduce difficulty",
                Some(stagnation::Escalation::RedefineGoals) => " -> redefine goals",
                None => "",
            };
            let _ = writeln!(out, "  {} {}: {}{}", p.project_id, p.title, state, escalation);
        }
        if !report.errors.is_empty() {
            out.push_str("\nErrors:\n");
            for e in &report.errors {
                let _ = writeln!(out, "  {}: {}", e.project_id.as_deref().unwrap_or("sweep"), e.message);
            }
        }
        out.trim_end().to_string()
    }
}

/// Run the stagnation sweep for `date`, once per day unless `force` is set.
///
/// A forced rerun still evaluates each project at most once for the day; it
/// only picks up projects the earlier run didn't reach.
pub fn sweep_run(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    date: Option<NaiveDate>,
    force: bool,
) -> Result<SweepRun> {
    let date = date.unwrap_or_else(local_today);
    let storage = open_storage(data_dir)?;

    if !force {
        if let Some(last) = stagnation::last_sweep_date(&storage)? {
            if last >= date {
                tracing::info!(%date, %last, "sweep already ran; skipping");
                return Ok(SweepRun::Skipped {
                    date,
                    last_sweep_date: last,
                });
            }
        }
    }

    let (model, options) = language_model(data_dir, overrides)?;
    let adjuster = DifficultyAdjuster::new(model, options);
    let report = stagnation::run_daily_sweep(&storage, &adjuster, date)?;
    Ok(SweepRun::Completed {
        model: adjuster.model_name().to_string(),
        report,
    })
}

impl Output for AdjustOutcome {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self {
            AdjustOutcome::NotNeeded {
                project_id,
                stagnation_days,
            } => format!(
                "No adjustment for {} at {} stagnant day(s) (needs exactly 3, or 7 and up)",
                project_id, stagnation_days
            ),
            AdjustOutcome::Applied(a) if a.is_empty() => {
                format!("Model suggested no changes for {}", a.project_id)
            }
            AdjustOutcome::Applied(a) => {
                let mut parts = Vec::new();
                if a.target_rewritten {
                    parts.push("rewrote the target".to_string());
                }
                if a.reestimated > 0 {
                    parts.push(format!("re-estimated {} milestone(s)", a.reestimated));
                }
                if !a.added.is_empty() {
                    parts.push(format!("added {}", a.added.join(", ")));
                }
                format!("Adjusted {}: {}; progress {}%", a.project_id, parts.join("; "), a.progress_percent)
            }
        }
    }
}

/// Run the difficulty adjuster directly. Without `days` the project's current
/// stagnation count is used.
pub fn adjust(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    project_id: &str,
    days: Option<u32>,
) -> Result<AdjustOutcome> {
    let storage = open_storage(data_dir)?;
    let days = match days {
        Some(d) => d,
        None => storage.get_project(project_id)?.stagnation_days,
    };
    let (model, options) = language_model(data_dir, overrides)?;
    DifficultyAdjuster::new(model, options).adjust(&storage, project_id, days)
}

impl Output for DailyPoints {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{}: {} point(s) from {} milestone(s) and {} task(s)",
            self.date, self.points, self.milestones_completed, self.tasks_completed
        )
    }
}

pub fn points(data_dir: &Path, date: Option<NaiveDate>) -> Result<DailyPoints> {
    let storage = open_storage(data_dir)?;
    plan::points_on(&storage, date.unwrap_or_else(local_today))
}

// === Config Commands ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub data_dir: PathBuf,
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let width = self.entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
        let mut out = format!("Data directory: {}\n\n", self.data_dir.display());
        for e in &self.entries {
            let _ = writeln!(out, "{:width$}  {}  ({})", e.key, e.value, e.source, width = width);
        }
        out.trim_end().to_string()
    }
}

fn entry(key: &str, value: impl ToString, source: impl ToString) -> ConfigEntry {
    ConfigEntry {
        key: key.to_string(),
        value: value.to_string(),
        source: source.to_string(),
    }
}

fn config_entries(settings: &ResolvedSettings) -> Vec<ConfigEntry> {
    let api_key = match (&settings.api_key, settings.masked_api_key()) {
        (Some(resolved), Some(masked)) => entry("llm-api-key", masked, &resolved.source),
        _ => entry("llm-api-key", "(not set)", "default"),
    };
    vec![
        entry(
            "default-daily-minutes",
            settings.default_daily_minutes.value,
            &settings.default_daily_minutes.source,
        ),
        entry("llm-provider", settings.provider.value, &settings.provider.source),
        entry("llm-model", &settings.model.value, &settings.model.source),
        entry("llm-base-url", &settings.base_url.value, &settings.base_url.source),
        entry("llm-timeout-secs", settings.timeout_secs.value, &settings.timeout_secs.source),
        entry("llm-max-tokens", settings.max_tokens.value, &settings.max_tokens.source),
        api_key,
    ]
}

pub fn config_show(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ConfigShow> {
    let settings = config::resolve(data_dir, overrides)?;
    Ok(ConfigShow {
        data_dir: data_dir.to_path_buf(),
        entries: config_entries(&settings),
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub file: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.file)
    }
}

pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let file = config::set_value(data_dir, key, value)?;
    let (value, file) = match file {
        KeyFile::State => (mask_secret(value.trim()), config::STATE_FILE),
        KeyFile::Config => (value.trim().to_string(), config::CONFIG_FILE),
    };
    Ok(ConfigSet {
        key: key.to_string(),
        value,
        file: file.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_project_create_uses_config_default_budget() {
        let env = TestEnv::new();
        config_set(env.data_path(), "default-daily-minutes", "45").unwrap();

        let created = project_create(env.data_path(), "Read more".into(), None, None, None).unwrap();
        assert_eq!(created.project.daily_minutes, Some(45));

        let explicit = project_create(env.data_path(), "Write".into(), None, Some(20), None).unwrap();
        assert_eq!(explicit.project.daily_minutes, Some(20));
    }

    #[test]
    fn test_project_create_with_tree() {
        let env = TestEnv::new();
        let tree = r#"[{"title": "A", "children": [{"title": "A1"}, {"title": "A2", "estimatedMinutes": 10}]}]"#;
        let created =
            project_create(env.data_path(), "Tree".into(), Some("goal".into()), None, Some(tree.into())).unwrap();
        assert_eq!(created.milestone_count, 2);
        assert!(created.to_human().contains("2 milestone(s)"));

        let json: serde_json::Value = serde_json::from_str(&created.to_json()).unwrap();
        assert_eq!(json["milestone_count"], 2);
        assert_eq!(json["title"], "Tree");
    }

    #[test]
    fn test_project_create_rejects_bad_tree() {
        let env = TestEnv::new();
        let result = project_create(env.data_path(), "X".into(), None, None, Some("{not json".into()));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_project_update_reports_fields() {
        let env = TestEnv::new();
        let created = project_create(env.data_path(), "A".into(), None, None, None).unwrap();

        let none = project_update(env.data_path(), &created.project.id, None, None, None, None).unwrap();
        assert!(none.updated_fields.is_empty());

        let updated =
            project_update(env.data_path(), &created.project.id, None, None, Some(15), Some("paused")).unwrap();
        assert_eq!(updated.updated_fields, vec!["daily_minutes", "status"]);
        assert_eq!(updated.project.status, ProjectStatus::Paused);

        assert!(matches!(
            project_update(env.data_path(), &created.project.id, None, None, None, Some("sleeping")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_wbs_apply_requires_one_source() {
        let env = TestEnv::new();
        let created = project_create(env.data_path(), "A".into(), None, None, None).unwrap();
        let id = &created.project.id;

        assert!(matches!(wbs_apply(env.data_path(), id, None, None), Err(Error::Validation(_))));
        assert!(matches!(
            wbs_apply(env.data_path(), id, Some("[]".into()), Some(PathBuf::from("tree.json"))),
            Err(Error::Validation(_))
        ));

        let path = env.data_path().join("tree.json");
        fs::write(&path, r#"[{"title": "Only"}]"#).unwrap();
        let report = wbs_apply(env.data_path(), id, None, Some(path)).unwrap();
        assert_eq!(report.created, 1);

        let view = wbs_show(env.data_path(), id).unwrap();
        assert_eq!(view.leaves.len(), 1);
        assert_eq!(view.leaves[0].estimated_minutes, 30);
    }

    #[test]
    fn test_sweep_run_once_per_day() {
        let env = TestEnv::new();
        project_create(env.data_path(), "A".into(), None, None, None).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let overrides = ConfigOverrides::default();

        let first = sweep_run(env.data_path(), &overrides, Some(date), false).unwrap();
        assert!(matches!(first, SweepRun::Completed { .. }));

        let second = sweep_run(env.data_path(), &overrides, Some(date), false).unwrap();
        assert!(matches!(second, SweepRun::Skipped { .. }));
        assert!(second.to_human().contains("--force"));

        let late = project_create(env.data_path(), "B".into(), None, None, None).unwrap();
        let forced = sweep_run(env.data_path(), &overrides, Some(date), true).unwrap();
        let SweepRun::Completed { report, .. } = forced else {
            panic!("forced sweep should run");
        };
        assert_eq!(report.projects_checked, 1);
        assert_eq!(report.already_evaluated, 1);
        assert_eq!(report.projects[0].project_id, late.project.id);
    }

    #[test]
    fn test_config_set_masks_secrets() {
        let env = TestEnv::new();
        let set = config_set(env.data_path(), "llm-api-key", "sk-abcdefghijklmnop").unwrap();
        assert_eq!(set.value, "sk-a...mnop");
        assert_eq!(set.file, "state.kdl");

        let shown = config_show(env.data_path(), &ConfigOverrides::default()).unwrap();
        let key = shown.entries.iter().find(|e| e.key == "llm-api-key").unwrap();
        assert!(!key.value.contains("abcdefgh"));
    }

    #[test]
    fn test_milestone_list_unknown_project() {
        let env = TestEnv::new();
        assert!(matches!(
            milestone_list(env.data_path(), "gp-ffffff", false),
            Err(Error::NotFound(_))
        ));
    }
}
