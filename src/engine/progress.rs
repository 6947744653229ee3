//! Progress aggregation.
//!
//! A project's `progress_percent` is derived: `round(100 * done / total)` over
//! its milestones, 0 when it has none. Every recompute refreshes all active
//! projects in one pass, so a single write path can't leave a sibling stale.

use std::collections::HashMap;

use crate::models::{ProjectProgress, ProjectStatus};
use crate::storage::Storage;
use crate::Result;

/// Recompute progress for `project_id` and every active project, atomically.
///
/// Returns the target project's new percentage.
pub fn recompute(storage: &Storage, project_id: &str) -> Result<u8> {
    storage.in_transaction(|s| refresh(s, project_id))
}

/// Non-transactional core of [`recompute`], for callers already inside a transaction.
pub(crate) fn refresh(storage: &Storage, project_id: &str) -> Result<u8> {
    let target = storage.get_project(project_id)?;

    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for m in storage.list_active_project_milestones()? {
        let entry = counts.entry(m.project_id).or_default();
        entry.0 += 1;
        if m.completed {
            entry.1 += 1;
        }
    }

    let mut target_percent = None;
    for project in storage.list_projects(Some(ProjectStatus::Active))? {
        let (total, done) = counts.get(&project.id).copied().unwrap_or_default();
        let progress = ProjectProgress::new(total, done);
        if project.progress_percent != progress.percent {
            storage.set_progress_percent(&project.id, progress.percent)?;
            tracing::debug!(
                project = %project.id,
                from = project.progress_percent,
                to = progress.percent,
                "progress updated"
            );
        }
        if project.id == target.id {
            target_percent = Some(progress.percent);
        }
    }

    // Inactive projects aren't part of the batch but still get their own refresh.
    match target_percent {
        Some(percent) => Ok(percent),
        None => {
            let progress = project_progress(storage, &target.id)?;
            if target.progress_percent != progress.percent {
                storage.set_progress_percent(&target.id, progress.percent)?;
            }
            Ok(progress.percent)
        }
    }
}

/// Milestone counts and percentage for one project, read fresh from storage.
pub fn project_progress(storage: &Storage, project_id: &str) -> Result<ProjectProgress> {
    let milestones = storage.list_milestones(project_id, false)?;
    let done = milestones.iter().filter(|m| m.completed).count();
    Ok(ProjectProgress::new(milestones.len(), done))
}
