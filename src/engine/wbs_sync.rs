//! WBS synchronization.
//!
//! Applying a tree stores it on the project, then rebuilds the project's
//! WBS-managed milestones from its leaves: every non-manual milestone is
//! deleted and the flattened leaves are inserted fresh, ordered by position.
//! Manual milestones (user- or AI-added) are never touched.
//!
//! Rebuilding is destructive: a leaf that keeps its title across an edit still
//! comes back as a new, incomplete milestone, so its completion state is lost.
//! Matching leaves to existing milestones by title would preserve it; that is
//! not done here.

use serde::Serialize;

use crate::engine::progress;
use crate::models::wbs::{self, WbsNode};
use crate::models::Milestone;
use crate::storage::{MILESTONE_PREFIX, Storage, generate_id};
use crate::Result;

/// What a single [`apply_tree`] call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WbsSyncReport {
    pub project_id: String,
    /// Non-manual milestones deleted
    pub removed: usize,
    /// Milestones created from leaves
    pub created: usize,
    /// Manual milestones left in place
    pub preserved_manual: usize,
    pub progress_percent: u8,
}

/// Store `tree` on the project and resynchronize its milestones, in one transaction.
pub fn apply_tree(storage: &Storage, project_id: &str, tree: &[WbsNode]) -> Result<WbsSyncReport> {
    wbs::validate(tree)?;
    let report = storage.in_transaction(|s| sync(s, project_id, tree))?;

    tracing::info!(
        project = %report.project_id,
        removed = report.removed,
        created = report.created,
        preserved_manual = report.preserved_manual,
        "WBS applied"
    );
    Ok(report)
}

/// Non-transactional core of [`apply_tree`]. `tree` must already be validated.
pub(crate) fn sync(storage: &Storage, project_id: &str, tree: &[WbsNode]) -> Result<WbsSyncReport> {
    storage.get_project(project_id)?;
    storage.set_wbs_tree(project_id, tree)?;

    let removed = storage.delete_non_manual_milestones(project_id)?;

    let milestones: Vec<Milestone> = wbs::flatten(tree)
        .into_iter()
        .enumerate()
        .map(|(i, leaf)| {
            let seed = format!("{}:{}:{}", project_id, i, leaf.title);
            let mut m = Milestone::new(
                generate_id(MILESTONE_PREFIX, &seed),
                project_id.to_string(),
                leaf.title,
                i as i64,
            );
            m.estimated_minutes = Some(leaf.estimated_minutes);
            m
        })
        .collect();
    storage.add_milestones(&milestones)?;

    let preserved_manual = storage
        .list_milestones(project_id, false)?
        .iter()
        .filter(|m| m.is_manual)
        .count();
    let progress_percent = progress::refresh(storage, project_id)?;

    Ok(WbsSyncReport {
        project_id: project_id.to_string(),
        removed,
        created: milestones.len(),
        preserved_manual,
        progress_percent,
    })
}

/// The tree stored on a project, or an empty forest.
pub fn stored_tree(storage: &Storage, project_id: &str) -> Result<Vec<WbsNode>> {
    Ok(storage.get_project(project_id)?.wbs_tree.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, WbsLeaf};
    use crate::test_utils::TestEnv;
    use crate::Error;
    use chrono::Utc;

    fn setup() -> (TestEnv, Storage) {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage
            .create_project(&Project::new("gp-000001".into(), "P".into(), String::new()))
            .unwrap();
        (env, storage)
    }

    fn titles(storage: &Storage) -> Vec<String> {
        storage
            .list_milestones("gp-000001", false)
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect()
    }

    fn sample_tree() -> Vec<WbsNode> {
        wbs::parse_tree(r#"[{"title":"A","children":[{"title":"A1"},{"title":"A2"}]},{"title":"B"}]"#)
            .unwrap()
    }

    #[test]
    fn test_apply_tree_creates_leaves_in_order() {
        let (_env, storage) = setup();
        let report = apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(report.removed, 0);
        assert_eq!(titles(&storage), vec!["A1", "A2", "B"]);

        let ms = storage.list_milestones("gp-000001", false).unwrap();
        assert_eq!(ms.iter().map(|m| m.order_index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(ms.iter().all(|m| !m.is_manual && m.estimated_minutes == Some(30)));
    }

    #[test]
    fn test_reapply_removes_dropped_leaf_only() {
        let (_env, storage) = setup();
        apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();

        let edited = wbs::parse_tree(r#"[{"title":"A","children":[{"title":"A1"}]},{"title":"B"}]"#)
            .unwrap();
        let report = apply_tree(&storage, "gp-000001", &edited).unwrap();

        assert_eq!(report.removed, 3);
        assert_eq!(report.created, 2);
        assert_eq!(titles(&storage), vec!["A1", "B"]);
    }

    #[test]
    fn test_manual_milestones_survive_resync() {
        let (_env, storage) = setup();
        apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();
        let mut manual = Milestone::new("gm-aaaaaa".into(), "gp-000001".into(), "Extra".into(), 9999);
        manual.is_manual = true;
        storage.add_milestone(&manual).unwrap();

        for _ in 0..3 {
            let report = apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();
            assert_eq!(report.preserved_manual, 1);
        }

        let reloaded = storage.get_milestone("gm-aaaaaa").unwrap();
        assert_eq!(reloaded, manual);
        assert_eq!(titles(&storage), vec!["A1", "A2", "B", "Extra"]);
    }

    #[test]
    fn test_resync_discards_completion_state() {
        let (_env, storage) = setup();
        apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();
        let mut first = storage.list_milestones("gp-000001", false).unwrap().remove(0);
        first.completed = true;
        first.completed_at = Some(Utc::now());
        storage.update_milestone(&first).unwrap();

        apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();

        let ms = storage.list_milestones("gp-000001", false).unwrap();
        assert_eq!(ms[0].title, "A1");
        assert!(!ms[0].completed);
        assert_eq!(storage.get_project("gp-000001").unwrap().progress_percent, 0);
    }

    #[test]
    fn test_stored_tree_flattens_to_created_leaves() {
        let (_env, storage) = setup();
        let tree = vec![
            WbsNode::group("Phase", vec![WbsNode::leaf("X", Some(15)), WbsNode::leaf("Y", None)]),
            WbsNode::leaf("Z", Some(90)),
        ];
        apply_tree(&storage, "gp-000001", &tree).unwrap();

        let stored = stored_tree(&storage, "gp-000001").unwrap();
        let created: Vec<WbsLeaf> = storage
            .list_milestones("gp-000001", false)
            .unwrap()
            .into_iter()
            .map(|m| WbsLeaf {
                title: m.title,
                estimated_minutes: m.estimated_minutes.unwrap_or_default(),
            })
            .collect();
        assert_eq!(wbs::flatten(&stored), created);
    }

    #[test]
    fn test_invalid_tree_changes_nothing() {
        let (_env, storage) = setup();
        apply_tree(&storage, "gp-000001", &sample_tree()).unwrap();

        let bad = vec![WbsNode::leaf("  ", None)];
        assert!(matches!(apply_tree(&storage, "gp-000001", &bad), Err(Error::Validation(_))));
        assert_eq!(titles(&storage), vec!["A1", "A2", "B"]);
        assert_eq!(stored_tree(&storage, "gp-000001").unwrap(), sample_tree());
    }

    #[test]
    fn test_unknown_project_is_not_found() {
        let (_env, storage) = setup();
        assert!(matches!(
            apply_tree(&storage, "gp-ffffff", &sample_tree()),
            Err(Error::NotFound(_))
        ));
    }
}
