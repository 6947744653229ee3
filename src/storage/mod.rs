//! Storage layer for growthos data.
//!
//! All entities live in a single SQLite database (`growthos.db`) under the
//! data directory (`GOS_DATA_DIR`, else `~/.local/share/growthos/`).
//!
//! Individual methods are atomic. Multi-step engine operations (WBS resync,
//! applying a difficulty adjustment, completing a milestone) wrap their
//! steps in [`Storage::in_transaction`] so a failure rolls everything back.
//!
//! There is no row-level locking between processes: two concurrent
//! requests touching the same project (say, a WBS resync racing a milestone
//! completion) can still lose one another's update. SQLite serializes the
//! writes but nothing detects the stale read.

use crate::models::{
    BehaviorKind, BehaviorLog, DailyTask, Milestone, Project, ProjectStatus, WbsNode,
};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GOS_DATA_DIR";

/// Database file name inside the data directory.
pub const DB_FILE: &str = "growthos.db";

/// Prefix for project IDs.
pub const PROJECT_PREFIX: &str = "gp";
/// Prefix for milestone IDs.
pub const MILESTONE_PREFIX: &str = "gm";
/// Prefix for daily task IDs.
pub const TASK_PREFIX: &str = "gt";

const MILESTONE_COLUMNS: &str = "id, project_id, title, estimated_minutes, order_index, completed, \
     completed_at, is_manual, two_minute_version, anti_procrastination_script, created_at";

const TASK_COLUMNS: &str = "id, project_id, title, plan_date, completed, completed_at, \
     two_minute_version, anti_procrastination_script, created_at";

const PROJECT_COLUMNS: &str = "id, title, target_description, status, daily_minutes, \
     progress_percent, stagnation_days, last_activity_date, wbs_tree, created_at, updated_at, \
     last_evaluated_date";

/// Storage manager for one data directory.
pub struct Storage {
    /// Directory holding the database and config files
    pub root: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open storage in `data_dir`, creating the directory and schema if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: data_dir.to_path_buf(),
            conn,
        })
    }

    /// Check if a database exists in `data_dir`.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(DB_FILE).exists()
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                target_description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'active',
                daily_minutes INTEGER,
                progress_percent INTEGER NOT NULL DEFAULT 0,
                stagnation_days INTEGER NOT NULL DEFAULT 0,
                last_activity_date TEXT,
                wbs_tree TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_evaluated_date TEXT
            );

            CREATE TABLE IF NOT EXISTS milestones (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                estimated_minutes INTEGER,
                order_index INTEGER NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                is_manual INTEGER NOT NULL DEFAULT 0,
                two_minute_version TEXT,
                anti_procrastination_script TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                plan_date TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                two_minute_version TEXT,
                anti_procrastination_script TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS behavior_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                source_id TEXT NOT NULL,
                project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
                points INTEGER NOT NULL,
                logged_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
            CREATE INDEX IF NOT EXISTS idx_milestones_project ON milestones(project_id, order_index);
            CREATE INDEX IF NOT EXISTS idx_daily_tasks_date ON daily_tasks(plan_date);
            CREATE INDEX IF NOT EXISTS idx_daily_tasks_project ON daily_tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_behavior_logs_time ON behavior_logs(logged_at);

            -- Key/value bookkeeping (e.g. last sweep date)
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Run `f` inside a transaction. Any error rolls back every write made by `f`.
    ///
    /// Transactions don't nest: `f` must not call `in_transaction` itself.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Get the data directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // === Project Operations ===

    /// Create a new project.
    pub fn create_project(&self, project: &Project) -> Result<()> {
        let tree = project.wbs_tree.as_deref().map(tree_to_json).transpose()?;
        self.conn.execute(
            r#"
            INSERT INTO projects
            (id, title, target_description, status, daily_minutes, progress_percent,
             stagnation_days, last_activity_date, wbs_tree, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                project.id,
                project.title,
                project.target_description,
                project.status.as_str(),
                project.daily_minutes,
                project.progress_percent,
                project.stagnation_days,
                project.last_activity_date,
                tree,
                project.created_at,
                project.updated_at,
                project.last_evaluated_date,
            ],
        )?;
        Ok(())
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], project_from_row)
            .optional()?;

        match row {
            Some(raw) => raw.into_project(),
            None => Err(Error::NotFound(format!("Project not found: {}", id))),
        }
    }

    /// List projects, newest first, optionally filtered by status.
    pub fn list_projects(&self, status: Option<ProjectStatus>) -> Result<Vec<Project>> {
        let mut sql = format!("SELECT {} FROM projects", PROJECT_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(s) = status {
            sql.push_str(" WHERE status = ?");
            params_vec.push(Box::new(s.as_str()));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawProject::into_project).collect()
    }

    /// Update every mutable field of a project.
    pub fn update_project(&self, project: &Project) -> Result<()> {
        let tree = project.wbs_tree.as_deref().map(tree_to_json).transpose()?;
        let changed = self.conn.execute(
            r#"
            UPDATE projects SET
                title = ?2, target_description = ?3, status = ?4, daily_minutes = ?5,
                progress_percent = ?6, stagnation_days = ?7, last_activity_date = ?8,
                wbs_tree = ?9, updated_at = ?10, last_evaluated_date = ?11
            WHERE id = ?1
            "#,
            params![
                project.id,
                project.title,
                project.target_description,
                project.status.as_str(),
                project.daily_minutes,
                project.progress_percent,
                project.stagnation_days,
                project.last_activity_date,
                tree,
                Utc::now(),
                project.last_evaluated_date,
            ],
        )?;
        expect_row(changed, "Project", &project.id)
    }

    /// Delete a project. Milestones, daily tasks and behavior logs go with it.
    pub fn delete_project(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        expect_row(changed, "Project", id)
    }

    /// Overwrite a project's stored progress percentage.
    pub fn set_progress_percent(&self, id: &str, percent: u8) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET progress_percent = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, percent, Utc::now()],
        )?;
        expect_row(changed, "Project", id)
    }

    /// Store a project's WBS tree.
    pub fn set_wbs_tree(&self, id: &str, tree: &[WbsNode]) -> Result<()> {
        let json = tree_to_json(tree)?;
        let changed = self.conn.execute(
            "UPDATE projects SET wbs_tree = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, json, Utc::now()],
        )?;
        expect_row(changed, "Project", id)
    }

    /// Replace a project's target description.
    pub fn set_target_description(&self, id: &str, description: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET target_description = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, description, Utc::now()],
        )?;
        expect_row(changed, "Project", id)
    }

    /// Store one day's stagnation evaluation in a single write.
    ///
    /// Saves the new counter and marks the project as evaluated for `date`.
    /// When the project was active, `date` also becomes its last activity date.
    pub fn record_evaluation(&self, id: &str, date: NaiveDate, days: u32, active: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET stagnation_days = ?2, last_evaluated_date = ?3, \
             last_activity_date = CASE WHEN ?4 THEN ?3 ELSE last_activity_date END, updated_at = ?5 \
             WHERE id = ?1",
            params![id, days, date, active, Utc::now()],
        )?;
        expect_row(changed, "Project", id)
    }

    // === Milestone Operations ===

    /// Add a single milestone.
    pub fn add_milestone(&self, milestone: &Milestone) -> Result<()> {
        self.add_milestones(std::slice::from_ref(milestone))
    }

    /// Insert milestones in order. Insertion order breaks `order_index` ties.
    pub fn add_milestones(&self, milestones: &[Milestone]) -> Result<()> {
        let sql = format!(
            "INSERT INTO milestones ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            MILESTONE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for m in milestones {
            stmt.execute(params![
                m.id,
                m.project_id,
                m.title,
                m.estimated_minutes,
                m.order_index,
                m.completed,
                m.completed_at,
                m.is_manual,
                m.two_minute_version,
                m.anti_procrastination_script,
                m.created_at,
            ])?;
        }
        Ok(())
    }

    /// Get a milestone by ID.
    pub fn get_milestone(&self, id: &str) -> Result<Milestone> {
        let sql = format!("SELECT {} FROM milestones WHERE id = ?1", MILESTONE_COLUMNS);
        self.conn
            .query_row(&sql, [id], milestone_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Milestone not found: {}", id)))
    }

    /// List a project's milestones in selection order.
    pub fn list_milestones(&self, project_id: &str, incomplete_only: bool) -> Result<Vec<Milestone>> {
        let mut sql = format!(
            "SELECT {} FROM milestones WHERE project_id = ?1",
            MILESTONE_COLUMNS
        );
        if incomplete_only {
            sql.push_str(" AND completed = 0");
        }
        sql.push_str(" ORDER BY order_index ASC, seq ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let milestones = stmt
            .query_map([project_id], milestone_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(milestones)
    }

    /// List the milestones of every active project.
    pub fn list_active_project_milestones(&self) -> Result<Vec<Milestone>> {
        let sql = format!(
            "SELECT {} FROM milestones WHERE project_id IN \
             (SELECT id FROM projects WHERE status = 'active') \
             ORDER BY project_id, order_index ASC, seq ASC",
            prefixed_columns("milestones", MILESTONE_COLUMNS)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let milestones = stmt
            .query_map([], milestone_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(milestones)
    }

    /// Update every mutable field of a milestone.
    pub fn update_milestone(&self, m: &Milestone) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE milestones SET
                title = ?2, estimated_minutes = ?3, order_index = ?4, completed = ?5,
                completed_at = ?6, is_manual = ?7, two_minute_version = ?8,
                anti_procrastination_script = ?9
            WHERE id = ?1
            "#,
            params![
                m.id,
                m.title,
                m.estimated_minutes,
                m.order_index,
                m.completed,
                m.completed_at,
                m.is_manual,
                m.two_minute_version,
                m.anti_procrastination_script,
            ],
        )?;
        expect_row(changed, "Milestone", &m.id)
    }

    /// Change a milestone's estimate.
    pub fn set_milestone_estimate(&self, id: &str, minutes: u32) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE milestones SET estimated_minutes = ?2 WHERE id = ?1",
            params![id, minutes],
        )?;
        expect_row(changed, "Milestone", id)
    }

    /// Delete every milestone of a project that the WBS manages.
    /// Manual milestones are left alone. Returns the number deleted.
    pub fn delete_non_manual_milestones(&self, project_id: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM milestones WHERE project_id = ?1 AND is_manual = 0",
            [project_id],
        )?;
        Ok(deleted)
    }

    /// Highest order index in a project, if it has any milestones.
    pub fn max_order_index(&self, project_id: &str) -> Result<Option<i64>> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(order_index) FROM milestones WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    // === Daily Task Operations ===

    /// Add a daily task.
    pub fn add_daily_task(&self, task: &DailyTask) -> Result<()> {
        let sql = format!(
            "INSERT INTO daily_tasks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            TASK_COLUMNS
        );
        self.conn.execute(
            &sql,
            params![
                task.id,
                task.project_id,
                task.title,
                task.plan_date,
                task.completed,
                task.completed_at,
                task.two_minute_version,
                task.anti_procrastination_script,
                task.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a daily task by ID.
    pub fn get_daily_task(&self, id: &str) -> Result<DailyTask> {
        let sql = format!("SELECT {} FROM daily_tasks WHERE id = ?1", TASK_COLUMNS);
        self.conn
            .query_row(&sql, [id], task_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    /// List the tasks planned for a date, in creation order.
    pub fn list_daily_tasks(&self, date: NaiveDate, include_completed: bool) -> Result<Vec<DailyTask>> {
        let mut sql = format!(
            "SELECT {} FROM daily_tasks WHERE plan_date = ?1",
            TASK_COLUMNS
        );
        if !include_completed {
            sql.push_str(" AND completed = 0");
        }
        sql.push_str(" ORDER BY created_at ASC, seq ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([date], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Update every mutable field of a daily task.
    pub fn update_daily_task(&self, task: &DailyTask) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE daily_tasks SET
                project_id = ?2, title = ?3, plan_date = ?4, completed = ?5, completed_at = ?6,
                two_minute_version = ?7, anti_procrastination_script = ?8
            WHERE id = ?1
            "#,
            params![
                task.id,
                task.project_id,
                task.title,
                task.plan_date,
                task.completed,
                task.completed_at,
                task.two_minute_version,
                task.anti_procrastination_script,
            ],
        )?;
        expect_row(changed, "Task", &task.id)
    }

    /// Count a project's completed tasks planned for `date`.
    pub fn count_completed_project_tasks(&self, project_id: &str, date: NaiveDate) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_tasks WHERE project_id = ?1 AND plan_date = ?2 AND completed = 1",
            params![project_id, date],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Behavior Log Operations ===

    /// Record points earned.
    pub fn add_behavior_log(&self, log: &BehaviorLog, project_id: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO behavior_logs (kind, source_id, project_id, points, logged_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![log.kind.as_str(), log.source_id, project_id, log.points, log.logged_at],
        )?;
        Ok(())
    }

    /// List behavior logs in `[start, end)`, oldest first.
    pub fn list_behavior_logs(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BehaviorLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, source_id, points, logged_at FROM behavior_logs \
             WHERE logged_at >= ?1 AND logged_at < ?2 ORDER BY logged_at ASC, id ASC",
        )?;
        let logs = stmt
            .query_map(params![start, end], |row| {
                let kind: String = row.get(0)?;
                Ok(BehaviorLog {
                    kind: kind.parse::<BehaviorKind>().map_err(|e| conversion_error(0, e))?,
                    source_id: row.get(1)?,
                    points: row.get(2)?,
                    logged_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    // === Config Operations ===

    /// Get a bookkeeping value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a bookkeeping value.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Project row before its WBS tree has been decoded.
struct RawProject {
    project: Project,
    wbs_tree: Option<String>,
}

impl RawProject {
    fn into_project(self) -> Result<Project> {
        let mut project = self.project;
        project.wbs_tree = match self.wbs_tree {
            Some(json) => Some(serde_json::from_str::<Vec<WbsNode>>(&json)?),
            None => None,
        };
        Ok(project)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<RawProject> {
    let status: String = row.get(3)?;
    Ok(RawProject {
        project: Project {
            id: row.get(0)?,
            title: row.get(1)?,
            target_description: row.get(2)?,
            status: status
                .parse::<ProjectStatus>()
                .map_err(|e| conversion_error(3, e))?,
            daily_minutes: row.get(4)?,
            progress_percent: row.get(5)?,
            stagnation_days: row.get(6)?,
            last_activity_date: row.get(7)?,
            wbs_tree: None,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            last_evaluated_date: row.get(11)?,
        },
        wbs_tree: row.get(8)?,
    })
}

fn milestone_from_row(row: &Row<'_>) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        estimated_minutes: row.get(3)?,
        order_index: row.get(4)?,
        completed: row.get(5)?,
        completed_at: row.get(6)?,
        is_manual: row.get(7)?,
        two_minute_version: row.get(8)?,
        anti_procrastination_script: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<DailyTask> {
    Ok(DailyTask {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        plan_date: row.get(3)?,
        completed: row.get(4)?,
        completed_at: row.get(5)?,
        two_minute_version: row.get(6)?,
        anti_procrastination_script: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn prefixed_columns(table: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", table, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn tree_to_json(tree: &[WbsNode]) -> Result<String> {
    Ok(serde_json::to_string(tree)?)
}

fn expect_row(changed: usize, kind: &str, id: &str) -> Result<()> {
    if changed == 0 {
        return Err(Error::NotFound(format!("{} not found: {}", kind, id)));
    }
    Ok(())
}

/// Resolve the data directory: `GOS_DATA_DIR` if set, else `<data_dir>/growthos`.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("growthos"))
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<6 hex chars>`
/// - Project prefix: "gp"
/// - Milestone prefix: "gm"
/// - Daily task prefix: "gt"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..6])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(&format!("{}-", prefix)) else {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    };

    if suffix.len() != 6 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 6 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}
