//! CLI argument definitions for gos.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::ConfigOverrides;
use crate::llm::ProviderKind;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GOS_GIT_COMMIT"),
    ", built ",
    env!("GOS_BUILD_TIMESTAMP"),
    ")"
);

/// gos - daily planning and stagnation recovery for long-running projects.
///
/// Start with `gos project create` or `gos project plan`, then `gos today` to see what to work on.
#[derive(Parser, Debug)]
#[command(name = "gos")]
#[command(author, version, long_version = LONG_VERSION, about = "Plan each day from your projects and recover when they stall", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding growthos.db, config.kdl and state.kdl
    #[arg(long, global = true, env = "GOS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Language model provider (aliyun, openai, deepseek, claude)
    #[arg(long, global = true)]
    pub provider: Option<ProviderKind>,

    /// Model name for the provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the provider API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout for the language model, in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Language model overrides given on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            provider: self.provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Milestone management commands
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Work-breakdown tree commands
    Wbs {
        #[command(subcommand)]
        command: WbsCommands,
    },

    /// Daily task commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Show the plan for a day (start here!)
    ///
    /// Each active project contributes its open milestones up to its daily
    /// budget. With --project, lists what else fits after dropping --exclude ids.
    Today {
        /// Plan date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Refill one project's selection instead of planning the whole day
        #[arg(long)]
        project: Option<String>,

        /// Milestone IDs to leave out of the refill
        #[arg(long, requires = "project")]
        exclude: Vec<String>,
    },

    /// Stagnation sweep commands
    Sweep {
        #[command(subcommand)]
        command: SweepCommands,
    },

    /// Ask the language model to adjust a stalled project
    Adjust {
        /// Project ID
        project: String,

        /// Stagnation days to adjust for (default: the project's current count)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Show points earned on a day
    Points {
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project title
        title: String,

        /// What "done" looks like
        #[arg(short, long)]
        target: Option<String>,

        /// Daily time budget in minutes
        #[arg(short, long)]
        minutes: Option<u32>,

        /// Initial WBS tree as JSON
        #[arg(long)]
        wbs: Option<String>,
    },

    /// Create a project from a goal, with milestones planned by the language model
    Plan {
        /// Free-text goal
        goal: String,

        /// Daily time budget in minutes
        #[arg(short, long)]
        minutes: Option<u32>,
    },

    /// Ask the language model for a daily budget (15-240 minutes) for a goal
    SuggestMinutes {
        /// Free-text goal
        goal: String,

        /// Answer to a clarifying question (repeatable)
        #[arg(long = "answer")]
        answers: Vec<String>,
    },

    /// List projects (active only unless --all or --status)
    List {
        /// Filter by status (active, paused, completed, archived)
        #[arg(long, value_parser = ["active", "paused", "completed", "archived"])]
        status: Option<String>,

        /// Include projects of every status
        #[arg(short, long)]
        all: bool,
    },

    /// Show a project with its milestones and progress
    Show {
        /// Project ID
        id: String,
    },

    /// Update a project
    Update {
        /// Project ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New target description
        #[arg(short, long)]
        target: Option<String>,

        /// New daily time budget in minutes
        #[arg(short, long)]
        minutes: Option<u32>,

        /// New status
        #[arg(long, value_parser = ["active", "paused", "completed", "archived"])]
        status: Option<String>,
    },

    /// Delete a project with its milestones, tasks and points
    Delete {
        /// Project ID
        id: String,
    },
}

/// Milestone subcommands
#[derive(Subcommand, Debug)]
pub enum MilestoneCommands {
    /// Add a manual milestone at the end of a project
    Add {
        /// Project ID
        project: String,

        /// Milestone title
        title: String,

        /// Estimated minutes
        #[arg(short, long)]
        estimate: Option<u32>,
    },

    /// List a project's milestones in order
    List {
        /// Project ID
        project: String,

        /// Only incomplete milestones
        #[arg(long)]
        open: bool,
    },

    /// Mark a milestone complete
    Complete {
        /// Milestone ID
        id: String,
    },

    /// Generate a two-minute version of a milestone
    Breakdown {
        /// Milestone ID
        id: String,
    },
}

/// WBS subcommands
#[derive(Subcommand, Debug)]
pub enum WbsCommands {
    /// Show a project's stored tree
    Show {
        /// Project ID
        project: String,
    },

    /// Replace a project's tree and rebuild its milestones
    ///
    /// Non-manual milestones are deleted and recreated from the tree's
    /// leaves, so their completion state is lost. Manual milestones stay.
    Apply {
        /// Project ID
        project: String,

        /// Tree as JSON
        tree: Option<String>,

        /// Read the tree from a file ('-' for stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task (a manual milestone when --project is given without --daily)
    Add {
        /// Task title
        title: String,

        /// Project to add it to
        #[arg(short, long)]
        project: Option<String>,

        /// Estimated minutes (project milestones only)
        #[arg(short, long, requires = "project", conflicts_with = "daily")]
        estimate: Option<u32>,

        /// Keep it a task for the day, scoped to --project, instead of a milestone
        #[arg(long, requires = "project")]
        daily: bool,

        /// Plan date (YYYY-MM-DD, default today; standalone and --daily tasks)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a task complete
    Complete {
        /// Task ID
        id: String,
    },

    /// Generate a two-minute version of a task
    Breakdown {
        /// Task ID
        id: String,
    },
}

/// Sweep subcommands
#[derive(Subcommand, Debug)]
pub enum SweepCommands {
    /// Run the daily stagnation sweep over all active projects
    Run {
        /// Sweep date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Run even if a sweep was already recorded for the date; projects
        /// already evaluated for it are still skipped
        #[arg(long)]
        force: bool,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration with the source of each value
    Show,

    /// Set a configuration value
    Set {
        /// Key (e.g. llm-provider, default-daily-minutes, llm-api-key)
        key: String,

        /// Value
        value: String,
    },
}
