//! gos CLI - daily planning and stagnation recovery for long-running projects.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use growthos::cli::{
    Cli, Commands, ConfigCommands, MilestoneCommands, ProjectCommands, SweepCommands, TaskCommands,
    WbsCommands,
};
use growthos::commands::{self, Output};
use growthos::config::ConfigOverrides;
use growthos::storage::get_data_dir;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human = cli.human_readable;
    let overrides = cli.overrides();

    let result = resolve_data_dir(cli.data_dir)
        .and_then(|data_dir| run_command(cli.command, &data_dir, &overrides, human));

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            let err = serde_json::json!({
                "error": e.to_string(),
                "recoverable": e.is_recoverable(),
            });
            eprintln!("{}", err);
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays parseable. `GOS_LOG` takes precedence
/// over `RUST_LOG`; `GOS_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GOS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("GOS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// --data-dir flag (or GOS_DATA_DIR) > platform data directory.
fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf, growthos::Error> {
    match explicit {
        Some(path) => Ok(path),
        None => get_data_dir(),
    }
}

fn run_command(
    command: Commands,
    data_dir: &Path,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), growthos::Error> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Create {
                title,
                target,
                minutes,
                wbs,
            } => {
                let result = commands::project_create(data_dir, title, target, minutes, wbs)?;
                output(&result, human);
            }
            ProjectCommands::Plan { goal, minutes } => {
                let result = commands::project_plan(data_dir, overrides, &goal, minutes)?;
                output(&result, human);
            }
            ProjectCommands::SuggestMinutes { goal, answers } => {
                let result = commands::project_suggest_minutes(data_dir, overrides, &goal, &answers)?;
                output(&result, human);
            }
            ProjectCommands::List { status, all } => {
                let result = commands::project_list(data_dir, status.as_deref(), all)?;
                output(&result, human);
            }
            ProjectCommands::Show { id } => {
                let result = commands::project_show(data_dir, &id)?;
                output(&result, human);
            }
            ProjectCommands::Update {
                id,
                title,
                target,
                minutes,
                status,
            } => {
                let result =
                    commands::project_update(data_dir, &id, title, target, minutes, status.as_deref())?;
                output(&result, human);
            }
            ProjectCommands::Delete { id } => {
                let result = commands::project_delete(data_dir, &id)?;
                output(&result, human);
            }
        },

        Commands::Milestone { command } => match command {
            MilestoneCommands::Add {
                project,
                title,
                estimate,
            } => {
                let result = commands::milestone_add(data_dir, &project, &title, estimate)?;
                output(&result, human);
            }
            MilestoneCommands::List { project, open } => {
                let result = commands::milestone_list(data_dir, &project, open)?;
                output(&result, human);
            }
            MilestoneCommands::Complete { id } => {
                let result = commands::milestone_complete(data_dir, &id)?;
                output(&result, human);
            }
            MilestoneCommands::Breakdown { id } => {
                let result = commands::milestone_breakdown(data_dir, overrides, &id)?;
                output(&result, human);
            }
        },

        Commands::Wbs { command } => match command {
            WbsCommands::Show { project } => {
                let result = commands::wbs_show(data_dir, &project)?;
                output(&result, human);
            }
            WbsCommands::Apply {
                project,
                tree,
                file,
            } => {
                let result = commands::wbs_apply(data_dir, &project, tree, file)?;
                output(&result, human);
            }
        },

        Commands::Task { command } => match command {
            TaskCommands::Add {
                title,
                project,
                estimate,
                daily,
                date,
            } => {
                let result = commands::task_add(data_dir, &title, project.as_deref(), estimate, date, daily)?;
                output(&result, human);
            }
            TaskCommands::Complete { id } => {
                let result = commands::task_complete(data_dir, &id)?;
                output(&result, human);
            }
            TaskCommands::Breakdown { id } => {
                let result = commands::task_breakdown(data_dir, overrides, &id)?;
                output(&result, human);
            }
        },

        Commands::Today {
            date,
            project,
            exclude,
        } => match project {
            Some(project) => {
                let result = commands::today_extra(data_dir, &project, exclude)?;
                output(&result, human);
            }
            None => {
                let result = commands::today(data_dir, date)?;
                output(&result, human);
            }
        },

        Commands::Sweep { command } => match command {
            SweepCommands::Run { date, force } => {
                let result = commands::sweep_run(data_dir, overrides, date, force)?;
                output(&result, human);
            }
        },

        Commands::Adjust { project, days } => {
            let result = commands::adjust(data_dir, overrides, &project, days)?;
            output(&result, human);
        }

        Commands::Points { date } => {
            let result = commands::points(data_dir, date)?;
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(data_dir, overrides)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(data_dir, &key, &value)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
