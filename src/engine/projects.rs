//! Project lifecycle.

use serde::Serialize;

use crate::engine::progress::project_progress;
use crate::engine::{require_positive_minutes, require_title, wbs_sync};
use crate::models::wbs;
use crate::models::{Milestone, Project, ProjectProgress, ProjectStatus, WbsNode};
use crate::storage::{PROJECT_PREFIX, Storage, generate_id};
use crate::Result;

/// Fields for a new project.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub target_description: String,
    pub daily_minutes: Option<u32>,
    /// Initial WBS; its leaves become the first milestones
    pub wbs_tree: Option<Vec<WbsNode>>,
}

/// Fields to change on an existing project. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub target_description: Option<String>,
    pub daily_minutes: Option<u32>,
    pub status: Option<ProjectStatus>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.target_description.is_none()
            && self.daily_minutes.is_none()
            && self.status.is_none()
    }
}

/// A project with its milestones in order.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub progress: ProjectProgress,
    pub milestones: Vec<Milestone>,
}

/// Create a project, synchronizing milestones from its tree when it has one.
pub fn create_project(storage: &Storage, new: NewProject) -> Result<Project> {
    let title = require_title(&new.title, "Project")?;
    let daily_minutes = require_positive_minutes(new.daily_minutes, "Daily minutes")?;
    if let Some(tree) = &new.wbs_tree {
        wbs::validate(tree)?;
    }

    let mut project = Project::new(
        generate_id(PROJECT_PREFIX, &title),
        title,
        new.target_description.trim().to_string(),
    );
    project.daily_minutes = daily_minutes;

    storage.in_transaction(|s| {
        s.create_project(&project)?;
        if let Some(tree) = &new.wbs_tree {
            wbs_sync::sync(s, &project.id, tree)?;
        }
        Ok(())
    })?;

    tracing::info!(project = %project.id, title = %project.title, "project created");
    storage.get_project(&project.id)
}

/// List projects, newest first. Without a status filter only active projects
/// are listed unless `all` is set.
pub fn list_projects(storage: &Storage, status: Option<ProjectStatus>, all: bool) -> Result<Vec<Project>> {
    match (status, all) {
        (Some(status), _) => storage.list_projects(Some(status)),
        (None, true) => storage.list_projects(None),
        (None, false) => storage.list_projects(Some(ProjectStatus::Active)),
    }
}

pub fn show_project(storage: &Storage, id: &str) -> Result<ProjectDetail> {
    let project = storage.get_project(id)?;
    let milestones = storage.list_milestones(id, false)?;
    let progress = project_progress(storage, id)?;
    Ok(ProjectDetail {
        project,
        progress,
        milestones,
    })
}

/// Apply `update` to a project.
pub fn update_project(storage: &Storage, id: &str, update: ProjectUpdate) -> Result<Project> {
    let title = update.title.as_deref().map(|t| require_title(t, "Project")).transpose()?;
    let daily_minutes = require_positive_minutes(update.daily_minutes, "Daily minutes")?;

    let mut project = storage.get_project(id)?;
    if let Some(title) = title {
        project.title = title;
    }
    if let Some(target) = update.target_description {
        project.target_description = target.trim().to_string();
    }
    if daily_minutes.is_some() {
        project.daily_minutes = daily_minutes;
    }
    if let Some(status) = update.status {
        project.status = status;
    }
    storage.update_project(&project)?;

    storage.get_project(id)
}

/// Delete a project and everything that belongs to it.
pub fn delete_project(storage: &Storage, id: &str) -> Result<Project> {
    let project = storage.get_project(id)?;
    storage.delete_project(id)?;
    tracing::info!(project = %id, "project deleted");
    Ok(project)
}
