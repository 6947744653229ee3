//! Data models for growthos entities.
//!
//! This module defines the core data structures:
//! - `Project` - A long-running goal with a daily time budget and stagnation counter
//! - `Milestone` - A schedulable unit of work belonging to a project
//! - `DailyTask` - A task planned for a specific day, optionally scoped to a project
//! - `BehaviorLog` - Points awarded when work is completed
//! - `WbsNode` - The typed work-breakdown tree stored on a project

pub mod prompts;
pub mod wbs;

pub use wbs::{WbsLeaf, WbsNode};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily budget used when a project has none.
pub const DEFAULT_DAILY_MINUTES: u32 = 60;

/// Estimate assumed for a work item with no positive estimate.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 25;

/// Estimate given to WBS leaves that don't carry one.
pub const DEFAULT_LEAF_MINUTES: u32 = 30;

/// Order index for AI-inserted milestones, after everything the WBS produces.
pub const AI_MILESTONE_ORDER_INDEX: i64 = 9999;

/// Points awarded for completing a daily task.
pub const TASK_COMPLETION_POINTS: u32 = 5;

/// Project lifecycle status. Only active projects are planned and swept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" | "done" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(format!("Unknown project status: {}", s)),
        }
    }
}

/// A long-running goal broken into milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (e.g., "gp-a1b2c3")
    pub id: String,

    pub title: String,

    /// Free-text description of what "done" looks like
    pub target_description: String,

    #[serde(default)]
    pub status: ProjectStatus,

    /// Target daily investment in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_minutes: Option<u32>,

    /// Derived completion percentage (0-100)
    #[serde(default)]
    pub progress_percent: u8,

    /// Consecutive days without activity
    #[serde(default)]
    pub stagnation_days: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<NaiveDate>,

    /// Day the sweep last evaluated this project; a sweep never counts a day twice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_date: Option<NaiveDate>,

    /// Work breakdown tree the milestone list is synchronized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wbs_tree: Option<Vec<WbsNode>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new active project with no milestones.
    pub fn new(id: String, title: String, target_description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            target_description,
            status: ProjectStatus::Active,
            daily_minutes: None,
            progress_percent: 0,
            stagnation_days: 0,
            last_activity_date: None,
            last_evaluated_date: None,
            wbs_tree: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

/// A schedulable unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier (e.g., "gm-a1b2c3")
    pub id: String,

    pub project_id: String,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,

    /// Selection and display order; ties fall back to insertion order
    #[serde(default)]
    pub order_index: i64,

    #[serde(default)]
    pub completed: bool,

    /// Set once, when the milestone is first completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Added by a user or the language model; survives WBS resyncs
    #[serde(default)]
    pub is_manual: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_minute_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anti_procrastination_script: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Milestone {
    /// Create a new incomplete, WBS-managed milestone.
    pub fn new(id: String, project_id: String, title: String, order_index: i64) -> Self {
        Self {
            id,
            project_id,
            title,
            estimated_minutes: None,
            order_index,
            completed: false,
            completed_at: None,
            is_manual: false,
            two_minute_version: None,
            anti_procrastination_script: None,
            created_at: Utc::now(),
        }
    }

    /// Points awarded for completing this milestone: one per ten estimated minutes, at least one.
    pub fn completion_points(&self) -> u32 {
        let estimate = self
            .estimated_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_ESTIMATE_MINUTES);
        ((estimate + 5) / 10).max(1)
    }
}

/// A task planned for one day. With a project it counts as activity for that project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    /// Unique identifier (e.g., "gt-a1b2c3")
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    pub title: String,

    pub plan_date: NaiveDate,

    #[serde(default)]
    pub completed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_minute_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anti_procrastination_script: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl DailyTask {
    pub fn new(id: String, title: String, plan_date: NaiveDate) -> Self {
        Self {
            id,
            project_id: None,
            title,
            plan_date,
            completed: false,
            completed_at: None,
            two_minute_version: None,
            anti_procrastination_script: None,
            created_at: Utc::now(),
        }
    }
}

/// What earned the points in a behavior log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    MilestoneCompletion,
    TaskCompletion,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::MilestoneCompletion => "milestone_completion",
            BehaviorKind::TaskCompletion => "task_completion",
        }
    }
}

impl std::str::FromStr for BehaviorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "milestone_completion" => Ok(BehaviorKind::MilestoneCompletion),
            "task_completion" => Ok(BehaviorKind::TaskCompletion),
            _ => Err(format!("Unknown behavior kind: {}", s)),
        }
    }
}

/// Points earned by completing a milestone or task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorLog {
    pub kind: BehaviorKind,

    /// ID of the milestone or daily task that was completed
    pub source_id: String,

    pub points: u32,

    pub logged_at: DateTime<Utc>,
}

impl BehaviorLog {
    pub fn new(kind: BehaviorKind, source_id: String, points: u32) -> Self {
        Self {
            kind,
            source_id,
            points,
            logged_at: Utc::now(),
        }
    }
}

/// Completion statistics for a project's milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub total: usize,
    pub completed: usize,
    /// `round(100 * completed / total)`, 0 when there are no milestones
    pub percent: u8,
}

impl ProjectProgress {
    pub fn new(total: usize, completed: usize) -> Self {
        let percent = if total > 0 {
            // Integer round-half-up of 100 * completed / total.
            ((completed * 200 + total) / (total * 2)).min(100) as u8
        } else {
            0
        };
        Self {
            total,
            completed,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_serialization_roundtrip() {
        let mut project = Project::new(
            "gp-abc123".to_string(),
            "Learn Rust".to_string(),
            "Ship a CLI".to_string(),
        );
        project.wbs_tree = Some(vec![WbsNode::leaf("Read the book", Some(45))]);
        let json = serde_json::to_string(&project).unwrap();
        let deserialized: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(project, deserialized);
    }

    #[test]
    fn test_project_status_serialization() {
        let json = serde_json::to_string(&ProjectStatus::Paused).unwrap();
        assert_eq!(json, r#""paused""#);
    }

    #[test]
    fn test_project_status_from_str() {
        assert_eq!("active".parse::<ProjectStatus>().unwrap(), ProjectStatus::Active);
        assert_eq!("ARCHIVED".parse::<ProjectStatus>().unwrap(), ProjectStatus::Archived);
        assert_eq!("done".parse::<ProjectStatus>().unwrap(), ProjectStatus::Completed);
        assert!("stalled".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_milestone_default_values() {
        let json = r#"{"id":"gm-abc123","project_id":"gp-abc123","title":"M1","created_at":"2026-01-01T00:00:00Z"}"#;
        let milestone: Milestone = serde_json::from_str(json).unwrap();
        assert_eq!(milestone.order_index, 0);
        assert!(!milestone.completed);
        assert!(!milestone.is_manual);
        assert!(milestone.estimated_minutes.is_none());
    }

    #[test]
    fn test_milestone_completion_points() {
        let mut milestone = Milestone::new("gm-1".into(), "gp-1".into(), "M".into(), 0);
        // Unset estimate counts as 25 minutes, which rounds up to 3
        assert_eq!(milestone.completion_points(), 3);

        milestone.estimated_minutes = Some(4);
        assert_eq!(milestone.completion_points(), 1);

        milestone.estimated_minutes = Some(60);
        assert_eq!(milestone.completion_points(), 6);

        milestone.estimated_minutes = Some(0);
        assert_eq!(milestone.completion_points(), 3);
    }

    #[test]
    fn test_project_progress_calculation() {
        assert_eq!(ProjectProgress::new(0, 0).percent, 0);
        assert_eq!(ProjectProgress::new(4, 1).percent, 25);
        assert_eq!(ProjectProgress::new(4, 2).percent, 50);
        assert_eq!(ProjectProgress::new(3, 1).percent, 33);
        assert_eq!(ProjectProgress::new(3, 2).percent, 67);
        assert_eq!(ProjectProgress::new(8, 1).percent, 13);
        assert_eq!(ProjectProgress::new(5, 5).percent, 100);
    }

    #[test]
    fn test_behavior_kind_from_str() {
        assert_eq!(
            "task_completion".parse::<BehaviorKind>().unwrap(),
            BehaviorKind::TaskCompletion
        );
        assert!("unknown".parse::<BehaviorKind>().is_err());
    }
}
