//! Stagnation tracking and the daily sweep.
//!
//! Once a day every active project is checked for activity: a milestone
//! completed today, or a project task planned for today and completed. Activity
//! resets the counter to 0; otherwise it goes up by one. Escalations fire on
//! the exact post-increment value only:
//!
//! | days | action |
//! |------|--------|
//! | 2    | advisory: switch to two-minute versions (logged) |
//! | 3    | reduce-difficulty adjustment |
//! | 7    | redefine-goals adjustment |
//!
//! Each project is evaluated at most once per day. Its new counter and the
//! evaluation date are stored in one write, after any adjustment it triggered
//! has run. A sweep that dies partway can simply be run again for the same
//! day: projects it already evaluated are skipped, and a project whose
//! adjustment was cut off is evaluated and dispatched again.
//!
//! [`run_daily_sweep`] also records the date it ran for (see
//! [`last_sweep_date`]) so callers can skip a day that is already done.

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::adjust::DifficultyAdjuster;
use crate::engine::local_date;
use crate::models::{Project, ProjectStatus};
use crate::storage::Storage;
use crate::Result;

/// Config key holding the date of the last sweep.
pub const LAST_SWEEP_KEY: &str = "last_sweep_date";

/// A project's state after one day's evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ActiveToday,
    Stagnant(u32),
}

/// Escalation fired by a stagnation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    /// Advisory only: nudge the user toward two-minute task versions.
    MicroTasks,
    ReduceDifficulty,
    RedefineGoals,
}

impl Escalation {
    pub fn for_days(days: u32) -> Option<Self> {
        match days {
            2 => Some(Escalation::MicroTasks),
            3 => Some(Escalation::ReduceDifficulty),
            7 => Some(Escalation::RedefineGoals),
            _ => None,
        }
    }

    /// Whether this escalation calls the difficulty adjuster.
    pub fn dispatches(&self) -> bool {
        !matches!(self, Escalation::MicroTasks)
    }
}

/// The day's transition from the prior counter and today's activity.
pub fn evaluate(prior_days: u32, active_today: bool) -> Transition {
    if active_today {
        Transition::ActiveToday
    } else {
        Transition::Stagnant(prior_days.saturating_add(1))
    }
}

/// Whether the project saw any activity on `today`.
pub fn had_activity(storage: &Storage, project_id: &str, today: NaiveDate) -> Result<bool> {
    let completed_today = storage
        .list_milestones(project_id, false)?
        .iter()
        .filter_map(|m| m.completed_at)
        .any(|at| local_date(at) == today);
    if completed_today {
        return Ok(true);
    }
    Ok(storage.count_completed_project_tasks(project_id, today)? > 0)
}

/// Per-project sweep result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSweep {
    pub project_id: String,
    pub title: String,
    pub active_today: bool,
    pub stagnation_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

/// A part of the sweep that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    /// `None` for failures outside any one project, such as recording the sweep date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub message: String,
    /// The project's state is intact and the next escalation can retry
    pub recoverable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub date: NaiveDate,
    /// Projects evaluated by this run
    pub projects_checked: usize,
    /// Active projects skipped because an earlier run already evaluated them for `date`
    pub already_evaluated: usize,
    /// Adjustments attempted, successful or not
    pub adjustments_triggered: usize,
    pub errors: Vec<SweepFailure>,
    pub projects: Vec<ProjectSweep>,
}

/// Evaluate every active project for `today`.
///
/// Projects are processed one by one. A failure in one (store error, model
/// unavailable, unparseable reply) is recorded in the report and the sweep
/// moves on. Only failing to list the projects aborts the sweep.
pub fn run_daily_sweep(storage: &Storage, adjuster: &DifficultyAdjuster, today: NaiveDate) -> Result<SweepReport> {
    let projects = storage.list_projects(Some(ProjectStatus::Active))?;
    tracing::info!(%today, projects = projects.len(), "starting stagnation sweep");

    let mut report = SweepReport {
        date: today,
        projects_checked: 0,
        already_evaluated: 0,
        adjustments_triggered: 0,
        errors: Vec::new(),
        projects: Vec::new(),
    };

    for project in &projects {
        if project.last_evaluated_date.is_some_and(|d| d >= today) {
            tracing::debug!(project = %project.id, "already evaluated today");
            report.already_evaluated += 1;
            continue;
        }

        report.projects_checked += 1;
        if let Err(e) = sweep_project(storage, adjuster, project, today, &mut report) {
            tracing::warn!(project = %project.id, error = %e, "sweep failed for project");
            report.errors.push(SweepFailure {
                project_id: Some(project.id.clone()),
                message: e.to_string(),
                recoverable: e.is_recoverable(),
            });
        }
    }

    if let Err(e) = storage.set_config(LAST_SWEEP_KEY, &today.to_string()) {
        tracing::warn!(error = %e, "could not record sweep date");
        report.errors.push(SweepFailure {
            project_id: None,
            message: format!("Could not record sweep date: {}", e),
            recoverable: e.is_recoverable(),
        });
    }

    tracing::info!(
        checked = report.projects_checked,
        skipped = report.already_evaluated,
        adjustments = report.adjustments_triggered,
        errors = report.errors.len(),
        "stagnation sweep finished"
    );
    Ok(report)
}

fn sweep_project(
    storage: &Storage,
    adjuster: &DifficultyAdjuster,
    project: &Project,
    today: NaiveDate,
    report: &mut SweepReport,
) -> Result<()> {
    let active_today = had_activity(storage, &project.id, today)?;

    let days = match evaluate(project.stagnation_days, active_today) {
        Transition::ActiveToday => 0,
        Transition::Stagnant(days) => days,
    };
    let escalation = if active_today { None } else { Escalation::for_days(days) };

    // The dispatch runs before the counter is stored, so an interrupted
    // sweep leaves this project unevaluated and the rerun dispatches again.
    let adjusted = match escalation {
        Some(Escalation::MicroTasks) => {
            tracing::warn!(
                project = %project.id,
                days,
                "no progress for 2 days; switch to two-minute versions of today's tasks"
            );
            Ok(())
        }
        Some(e) if e.dispatches() => {
            report.adjustments_triggered += 1;
            adjuster.adjust(storage, &project.id, days).map(|_| ())
        }
        _ => Ok(()),
    };

    storage.record_evaluation(&project.id, today, days, active_today)?;
    report.projects.push(ProjectSweep {
        project_id: project.id.clone(),
        title: project.title.clone(),
        active_today,
        stagnation_days: days,
        escalation,
    });

    adjusted
}

/// The date the last sweep ran for, if any.
pub fn last_sweep_date(storage: &Storage) -> Result<Option<NaiveDate>> {
    Ok(storage
        .get_config(LAST_SWEEP_KEY)?
        .and_then(|raw| raw.parse::<NaiveDate>().ok()))
}
