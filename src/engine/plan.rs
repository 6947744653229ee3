//! Daily plans, completions and behavior points.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::engine::budget::select_by_time_budget;
use crate::engine::{local_day_bounds, progress, require_positive_minutes, require_title};
use crate::models::{
    BehaviorKind, BehaviorLog, DEFAULT_DAILY_MINUTES, DEFAULT_ESTIMATE_MINUTES, DailyTask, Milestone,
    ProjectStatus, TASK_COMPLETION_POINTS,
};
use crate::storage::{MILESTONE_PREFIX, Storage, TASK_PREFIX, generate_id};
use crate::Result;

/// One project's share of the day.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPlan {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_minutes: Option<u32>,
    /// Budget actually applied (the project's, else the default)
    pub budget_minutes: u32,
    pub milestones: Vec<Milestone>,
}

impl ProjectPlan {
    pub fn planned_minutes(&self) -> u32 {
        self.milestones
            .iter()
            .map(|m| m.estimated_minutes.filter(|e| *e > 0).unwrap_or(DEFAULT_ESTIMATE_MINUTES))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyPlan {
    pub date: NaiveDate,
    pub projects: Vec<ProjectPlan>,
    /// Incomplete tasks planned for the date, in creation order
    pub tasks: Vec<DailyTask>,
    /// Sum of the active projects' daily budgets; absent when none set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_daily_minutes: Option<u32>,
}

/// Build the plan for `date`: each active project's incomplete milestones cut
/// down to its daily budget, plus the date's open tasks.
pub fn plan_day(storage: &Storage, date: NaiveDate) -> Result<DailyPlan> {
    let mut projects = Vec::new();
    let mut total = 0u32;

    // Oldest project first so the plan order is stable as projects are added.
    let mut active = storage.list_projects(Some(ProjectStatus::Active))?;
    active.reverse();

    for project in active {
        total = total.saturating_add(project.daily_minutes.unwrap_or(0));
        let open = storage.list_milestones(&project.id, true)?;
        let selected = select_by_time_budget(&open, project.daily_minutes).to_vec();
        projects.push(ProjectPlan {
            project_id: project.id,
            title: project.title,
            daily_minutes: project.daily_minutes,
            budget_minutes: project.daily_minutes.unwrap_or(DEFAULT_DAILY_MINUTES),
            milestones: selected,
        });
    }

    Ok(DailyPlan {
        date,
        projects,
        tasks: storage.list_daily_tasks(date, false)?,
        total_daily_minutes: (total > 0).then_some(total),
    })
}

/// Select milestones for one project after dropping `exclude`, e.g. to refill
/// a day once some of its items were swapped out.
pub fn plan_project_extra(storage: &Storage, project_id: &str, exclude: &[String]) -> Result<Vec<Milestone>> {
    let project = storage.get_project(project_id)?;
    let open: Vec<Milestone> = storage
        .list_milestones(project_id, true)?
        .into_iter()
        .filter(|m| !exclude.contains(&m.id))
        .collect();
    Ok(select_by_time_budget(&open, project.daily_minutes).to_vec())
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneCompletion {
    pub milestone: Milestone,
    /// False when the milestone was already complete and nothing changed
    pub newly_completed: bool,
    pub points_awarded: u32,
    pub progress_percent: u8,
}

/// Mark a milestone complete, award points and recompute progress.
///
/// Completing an already-complete milestone changes nothing; `completed_at`
/// keeps its first value.
pub fn complete_milestone(storage: &Storage, id: &str) -> Result<MilestoneCompletion> {
    let completion = storage.in_transaction(|s| {
        let mut milestone = s.get_milestone(id)?;
        if milestone.completed {
            let progress_percent = s.get_project(&milestone.project_id)?.progress_percent;
            return Ok(MilestoneCompletion {
                milestone,
                newly_completed: false,
                points_awarded: 0,
                progress_percent,
            });
        }

        milestone.completed = true;
        milestone.completed_at = Some(Utc::now());
        s.update_milestone(&milestone)?;

        let points = milestone.completion_points();
        s.add_behavior_log(
            &BehaviorLog::new(BehaviorKind::MilestoneCompletion, milestone.id.clone(), points),
            Some(milestone.project_id.as_str()),
        )?;
        let progress_percent = progress::refresh(s, &milestone.project_id)?;

        Ok(MilestoneCompletion {
            milestone,
            newly_completed: true,
            points_awarded: points,
            progress_percent,
        })
    })?;

    if completion.newly_completed {
        tracing::info!(
            milestone = %completion.milestone.id,
            project = %completion.milestone.project_id,
            points = completion.points_awarded,
            progress = completion.progress_percent,
            "milestone completed"
        );
    }
    Ok(completion)
}

/// Append a manual milestone after the project's current last one.
pub fn add_milestone(
    storage: &Storage,
    project_id: &str,
    title: &str,
    estimated_minutes: Option<u32>,
) -> Result<Milestone> {
    let title = require_title(title, "Milestone")?;
    let estimated_minutes = require_positive_minutes(estimated_minutes, "Estimate")?;

    storage.in_transaction(|s| {
        s.get_project(project_id)?;
        let order_index = s.max_order_index(project_id)?.map_or(0, |max| max.saturating_add(1));

        let mut milestone = Milestone::new(
            generate_id(MILESTONE_PREFIX, &format!("{}:{}", project_id, title)),
            project_id.to_string(),
            title.clone(),
            order_index,
        );
        milestone.estimated_minutes = Some(estimated_minutes.unwrap_or(DEFAULT_ESTIMATE_MINUTES));
        milestone.is_manual = true;
        s.add_milestone(&milestone)?;
        progress::refresh(s, project_id)?;
        Ok(milestone)
    })
}

/// What [`add_task`] created.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum AddedTask {
    Milestone(Milestone),
    Task(DailyTask),
}

/// Add a task. Scoped to a project it becomes a manual milestone of that
/// project; otherwise a standalone task for `date`.
pub fn add_task(
    storage: &Storage,
    title: &str,
    project_id: Option<&str>,
    estimated_minutes: Option<u32>,
    date: NaiveDate,
) -> Result<AddedTask> {
    if let Some(project_id) = project_id {
        return add_milestone(storage, project_id, title, estimated_minutes).map(AddedTask::Milestone);
    }

    let title = require_title(title, "Task")?;
    let task = DailyTask::new(
        generate_id(TASK_PREFIX, &format!("{}:{}", date, title)),
        title,
        date,
    );
    storage.add_daily_task(&task)?;
    Ok(AddedTask::Task(task))
}

/// Add a task for `date` scoped to a project. It stays a daily task rather
/// than a milestone, and completing it counts as activity on the project.
pub fn add_project_task(storage: &Storage, project_id: &str, title: &str, date: NaiveDate) -> Result<DailyTask> {
    let title = require_title(title, "Task")?;

    storage.in_transaction(|s| {
        s.get_project(project_id)?;
        let mut task = DailyTask::new(
            generate_id(TASK_PREFIX, &format!("{}:{}:{}", project_id, date, title)),
            title.clone(),
            date,
        );
        task.project_id = Some(project_id.to_string());
        s.add_daily_task(&task)?;
        Ok(task)
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCompletion {
    pub task: DailyTask,
    pub newly_completed: bool,
    pub points_awarded: u32,
}

/// Mark a daily task complete and award points. Idempotent like milestones.
pub fn complete_task(storage: &Storage, id: &str) -> Result<TaskCompletion> {
    storage.in_transaction(|s| {
        let mut task = s.get_daily_task(id)?;
        if task.completed {
            return Ok(TaskCompletion {
                task,
                newly_completed: false,
                points_awarded: 0,
            });
        }

        task.completed = true;
        task.completed_at = Some(Utc::now());
        s.update_daily_task(&task)?;
        s.add_behavior_log(
            &BehaviorLog::new(BehaviorKind::TaskCompletion, task.id.clone(), TASK_COMPLETION_POINTS),
            task.project_id.as_deref(),
        )?;

        Ok(TaskCompletion {
            task,
            newly_completed: true,
            points_awarded: TASK_COMPLETION_POINTS,
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoints {
    pub date: NaiveDate,
    pub points: u32,
    pub milestones_completed: usize,
    pub tasks_completed: usize,
}

/// Points earned on a local calendar day.
pub fn points_on(storage: &Storage, date: NaiveDate) -> Result<DailyPoints> {
    let (start, end) = local_day_bounds(date);
    let logs = storage.list_behavior_logs(start, end)?;

    let mut summary = DailyPoints {
        date,
        points: 0,
        milestones_completed: 0,
        tasks_completed: 0,
    };
    for log in &logs {
        summary.points = summary.points.saturating_add(log.points);
        match log.kind {
            BehaviorKind::MilestoneCompletion => summary.milestones_completed += 1,
            BehaviorKind::TaskCompletion => summary.tasks_completed += 1,
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{local_date, today};
    use crate::models::Project;
    use crate::test_utils::TestEnv;
    use crate::Error;

    fn setup(daily_minutes: Option<u32>, estimates: &[Option<u32>]) -> (TestEnv, Storage) {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let mut project = Project::new("gp-000001".into(), "Piano".into(), String::new());
        project.daily_minutes = daily_minutes;
        storage.create_project(&project).unwrap();
        let ms: Vec<Milestone> = estimates
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut m = Milestone::new(format!("gm-00000{}", i + 1), "gp-000001".into(), format!("M{}", i + 1), i as i64);
                m.estimated_minutes = *e;
                m
            })
            .collect();
        storage.add_milestones(&ms).unwrap();
        (env, storage)
    }

    fn ids(ms: &[Milestone]) -> Vec<&str> {
        ms.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_plan_day_applies_budget_per_project() {
        let (_env, storage) = setup(Some(40), &[Some(30), Some(20), Some(50)]);
        let plan = plan_day(&storage, today()).unwrap();

        assert_eq!(plan.projects.len(), 1);
        assert_eq!(ids(&plan.projects[0].milestones), vec!["gm-000001"]);
        assert_eq!(plan.projects[0].planned_minutes(), 30);
        assert_eq!(plan.total_daily_minutes, Some(40));
    }

    #[test]
    fn test_plan_day_default_budget_and_no_total() {
        let (_env, storage) = setup(None, &[None, None, None]);
        let plan = plan_day(&storage, today()).unwrap();
        assert_eq!(plan.projects[0].budget_minutes, 60);
        assert_eq!(plan.projects[0].milestones.len(), 2);
        assert_eq!(plan.total_daily_minutes, None);
    }

    #[test]
    fn test_plan_day_skips_completed_and_includes_tasks() {
        let (_env, storage) = setup(Some(60), &[Some(20), Some(20)]);
        complete_milestone(&storage, "gm-000001").unwrap();
        let date = today();
        add_task(&storage, "Call the bank", None, None, date).unwrap();

        let plan = plan_day(&storage, date).unwrap();
        assert_eq!(ids(&plan.projects[0].milestones), vec!["gm-000002"]);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].title, "Call the bank");
    }

    #[test]
    fn test_plan_project_extra_excludes() {
        let (_env, storage) = setup(Some(60), &[Some(30), Some(30), Some(30)]);
        let extra = plan_project_extra(&storage, "gp-000001", &["gm-000001".to_string()]).unwrap();
        assert_eq!(ids(&extra), vec!["gm-000002", "gm-000003"]);
    }

    #[test]
    fn test_complete_milestone_updates_progress() {
        let (_env, storage) = setup(None, &[None, None, None, None]);

        let first = complete_milestone(&storage, "gm-000001").unwrap();
        assert!(first.newly_completed);
        assert_eq!(first.progress_percent, 25);
        assert_eq!(first.points_awarded, 3);

        let second = complete_milestone(&storage, "gm-000002").unwrap();
        assert_eq!(second.progress_percent, 50);
        assert_eq!(storage.get_project("gp-000001").unwrap().progress_percent, 50);
    }

    #[test]
    fn test_complete_milestone_twice_keeps_timestamp() {
        let (_env, storage) = setup(None, &[Some(40)]);
        let first = complete_milestone(&storage, "gm-000001").unwrap();
        let again = complete_milestone(&storage, "gm-000001").unwrap();

        assert!(!again.newly_completed);
        assert_eq!(again.points_awarded, 0);
        assert_eq!(again.milestone.completed_at, first.milestone.completed_at);
        assert_eq!(points_on(&storage, local_date(Utc::now())).unwrap().points, 4);
    }

    #[test]
    fn test_complete_missing_milestone() {
        let (_env, storage) = setup(None, &[]);
        assert!(matches!(complete_milestone(&storage, "gm-ffffff"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_milestone_appends_manual() {
        let (_env, storage) = setup(None, &[None, None]);
        complete_milestone(&storage, "gm-000001").unwrap();

        let added = add_milestone(&storage, "gp-000001", "Extra practice", None).unwrap();
        assert!(added.is_manual);
        assert_eq!(added.order_index, 2);
        assert_eq!(added.estimated_minutes, Some(25));
        assert_eq!(storage.get_project("gp-000001").unwrap().progress_percent, 33);
    }

    #[test]
    fn test_add_milestone_validation() {
        let (_env, storage) = setup(None, &[]);
        assert!(matches!(
            add_milestone(&storage, "gp-000001", "", None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            add_milestone(&storage, "gp-000001", "x", Some(0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            add_milestone(&storage, "gp-ffffff", "x", None),
            Err(Error::NotFound(_))
        ));
        let first = add_milestone(&storage, "gp-000001", "First", None).unwrap();
        assert_eq!(first.order_index, 0);
    }

    #[test]
    fn test_add_task_with_project_is_milestone() {
        let (_env, storage) = setup(None, &[]);
        let added = add_task(&storage, "Tune", Some("gp-000001"), Some(10), today()).unwrap();
        assert!(matches!(added, AddedTask::Milestone(ref m) if m.is_manual && m.estimated_minutes == Some(10)));
    }

    #[test]
    fn test_add_project_task_keeps_a_daily_task() {
        let (_env, storage) = setup(None, &[Some(30)]);
        let date = today();
        let task = add_project_task(&storage, "gp-000001", "Practice scales", date).unwrap();
        assert_eq!(task.project_id.as_deref(), Some("gp-000001"));
        assert_eq!(storage.list_milestones("gp-000001", false).unwrap().len(), 1);
        assert_eq!(plan_day(&storage, date).unwrap().tasks[0].id, task.id);

        complete_task(&storage, &task.id).unwrap();
        assert_eq!(storage.count_completed_project_tasks("gp-000001", date).unwrap(), 1);
    }

    #[test]
    fn test_add_project_task_unknown_project() {
        let (_env, storage) = setup(None, &[]);
        assert!(matches!(
            add_project_task(&storage, "gp-ffffff", "Orphan", today()),
            Err(Error::NotFound(_))
        ));
        assert!(storage.list_daily_tasks(today(), true).unwrap().is_empty());
    }

    #[test]
    fn test_complete_task_awards_points_once() {
        let (_env, storage) = setup(None, &[]);
        let date = today();
        let AddedTask::Task(task) = add_task(&storage, "Laundry", None, None, date).unwrap() else {
            panic!("expected a standalone task");
        };

        let done = complete_task(&storage, &task.id).unwrap();
        assert_eq!(done.points_awarded, TASK_COMPLETION_POINTS);
        assert!(complete_task(&storage, &task.id).unwrap().points_awarded == 0);

        let points = points_on(&storage, local_date(Utc::now())).unwrap();
        assert_eq!(points.points, TASK_COMPLETION_POINTS);
        assert_eq!(points.tasks_completed, 1);
        assert!(storage.list_daily_tasks(date, false).unwrap().is_empty());
    }
}
