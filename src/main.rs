//! Almanac CLI - a study schedule and task analytics tool.

use almanac::cli::{
    Cli, Commands, ConfigCommands, DayCommands, RecCommands, SlotCommands, StatsCommands,
    SubtaskCommands, SystemCommands, TaskCommands,
};
use almanac::commands::{self, print};
use almanac::models::TaskType;
use almanac::{action_log, storage, Error};
use clap::Parser;
use std::path::Path;
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    let root = match storage::storage_root(cli.data_dir.as_deref(), &cli.profile) {
        Ok(root) => root,
        Err(e) => {
            report_error(&e, human);
            process::exit(1);
        }
    };

    let cmd_name = command_name(&cli.command);
    let args_json = serde_json::to_value(&cli.command).unwrap_or_default();

    let start = Instant::now();
    let result = run_command(cli.command, &root, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (silently fails if logging is disabled or errors out)
    let _ = action_log::log_action(&root, cmd_name, args_json, success, error, duration);

    if let Err(e) = result {
        report_error(&e, human);
        process::exit(1);
    }
}

fn report_error(error: &Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
}

/// Space-joined command path for the action log (e.g., "task add").
fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Task { command } => match command {
            TaskCommands::Add { .. } => "task add",
            TaskCommands::Quick { .. } => "task quick",
            TaskCommands::Update { .. } => "task update",
            TaskCommands::Rm { .. } => "task rm",
            TaskCommands::List { .. } => "task list",
            TaskCommands::Show { .. } => "task show",
            TaskCommands::Subtask { command } => match command {
                SubtaskCommands::Add { .. } => "task subtask add",
                SubtaskCommands::Update { .. } => "task subtask update",
                SubtaskCommands::Rm { .. } => "task subtask rm",
            },
        },
        Commands::Quick { .. } => "quick",
        Commands::Day { command } => match command {
            DayCommands::Rollover { .. } => "day rollover",
            DayCommands::Show { .. } => "day show",
        },
        Commands::Slot { command } => match command {
            SlotCommands::Bind { .. } => "slot bind",
            SlotCommands::Unbind { .. } => "slot unbind",
            SlotCommands::Start { .. } => "slot start",
            SlotCommands::Done { .. } => "slot done",
            SlotCommands::Reopen { .. } => "slot reopen",
            SlotCommands::Mood { .. } => "slot mood",
            SlotCommands::Note { .. } => "slot note",
        },
        Commands::Rec { command } => match command {
            RecCommands::Suggest { .. } => "rec suggest",
            RecCommands::Accept { .. } => "rec accept",
            RecCommands::Reject { .. } => "rec reject",
            RecCommands::Show { .. } => "rec show",
            RecCommands::List => "rec list",
        },
        Commands::Stats { command } => match command {
            StatsCommands::Overview { .. } => "stats overview",
            StatsCommands::Categories => "stats categories",
            StatsCommands::Frequent => "stats frequent",
            StatsCommands::Overcome => "stats overcome",
            StatsCommands::Tasks { .. } => "stats tasks",
            StatsCommands::Moods { .. } => "stats moods",
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { .. } => "config get",
            ConfigCommands::Set { .. } => "config set",
            ConfigCommands::List => "config list",
        },
        Commands::System { command } => match command {
            SystemCommands::Init => "system init",
            SystemCommands::Status => "system status",
            SystemCommands::Rebuild => "system rebuild",
        },
    }
}

fn run_command(command: Commands, root: &Path, human: bool) -> Result<(), Error> {
    match command {
        Commands::Task { command } => match command {
            TaskCommands::Add {
                name,
                task_type,
                category,
                hours,
                high_frequency,
                overcome,
            } => {
                let result = commands::task_add(
                    root,
                    &name,
                    task_type,
                    category,
                    hours,
                    high_frequency,
                    overcome,
                )?;
                print(&result, human);
            }
            TaskCommands::Quick { text } => {
                let result = commands::task_quick(root, &text)?;
                print(&result, human);
            }
            TaskCommands::Update {
                id,
                name,
                task_type,
                category,
                hours,
                high_frequency,
                overcome,
            } => {
                let result = commands::task_update(
                    root,
                    &id,
                    name,
                    task_type,
                    category,
                    hours,
                    high_frequency,
                    overcome,
                )?;
                print(&result, human);
            }
            TaskCommands::Rm { id } => {
                let result = commands::task_remove(root, &id)?;
                print(&result, human);
            }
            TaskCommands::List { task_type } => {
                let filter = match task_type.as_str() {
                    "all" => None,
                    other => Some(other.parse::<TaskType>().map_err(Error::InvalidInput)?),
                };
                let result = commands::task_list(root, filter)?;
                print(&result, human);
            }
            TaskCommands::Show { id } => {
                let result = commands::task_show(root, &id)?;
                print(&result, human);
            }
            TaskCommands::Subtask { command } => match command {
                SubtaskCommands::Add {
                    task_id,
                    name,
                    hours,
                    high_frequency,
                    overcome,
                } => {
                    let result = commands::subtask_add(
                        root,
                        &task_id,
                        &name,
                        hours,
                        high_frequency,
                        overcome,
                    )?;
                    print(&result, human);
                }
                SubtaskCommands::Update {
                    id,
                    name,
                    hours,
                    high_frequency,
                    overcome,
                } => {
                    let result =
                        commands::subtask_update(root, &id, name, hours, high_frequency, overcome)?;
                    print(&result, human);
                }
                SubtaskCommands::Rm { id } => {
                    let result = commands::subtask_remove(root, &id)?;
                    print(&result, human);
                }
            },
        },

        Commands::Quick { text } => {
            let result = commands::quick_add_and_bind(root, &text)?;
            print(&result, human);
        }

        Commands::Day { command } => match command {
            DayCommands::Rollover { date } => {
                let result = commands::day_rollover(root, date)?;
                print(&result, human);
            }
            DayCommands::Show { date } => {
                let result = commands::day_show(root, date)?;
                print(&result, human);
            }
        },

        Commands::Slot { command } => match command {
            SlotCommands::Bind { slot_id, target_id } => {
                let result = commands::slot_bind(root, &slot_id, &target_id)?;
                print(&result, human);
            }
            SlotCommands::Unbind { slot_id } => {
                let result = commands::slot_unbind(root, &slot_id)?;
                print(&result, human);
            }
            SlotCommands::Start { slot_id } => {
                let result = commands::slot_start(root, &slot_id)?;
                print(&result, human);
            }
            SlotCommands::Done { slot_id } => {
                let result = commands::slot_done(root, &slot_id)?;
                print(&result, human);
            }
            SlotCommands::Reopen {
                slot_id,
                in_progress,
            } => {
                let result = commands::slot_reopen(root, &slot_id, in_progress)?;
                print(&result, human);
            }
            SlotCommands::Mood { slot_id, mood } => {
                let result = commands::slot_mood(root, &slot_id, mood)?;
                print(&result, human);
            }
            SlotCommands::Note { slot_id, text } => {
                let result = commands::slot_note(root, &slot_id, text.as_deref().unwrap_or(""))?;
                print(&result, human);
            }
        },

        Commands::Rec { command } => match command {
            RecCommands::Suggest {
                slot_id,
                target_id,
                tip,
            } => {
                let result = commands::rec_suggest(root, &slot_id, target_id, tip)?;
                print(&result, human);
            }
            RecCommands::Accept { slot_id } => {
                let result = commands::rec_accept(root, &slot_id)?;
                print(&result, human);
            }
            RecCommands::Reject { slot_id } => {
                let result = commands::rec_reject(root, &slot_id)?;
                print(&result, human);
            }
            RecCommands::Show { slot_id } => {
                let result = commands::rec_show(root, &slot_id)?;
                print(&result, human);
            }
            RecCommands::List => {
                let result = commands::rec_list(root)?;
                print(&result, human);
            }
        },

        Commands::Stats { command } => match command {
            StatsCommands::Overview { date } => {
                let result = commands::stats_overview(root, date)?;
                print(&result, human);
            }
            StatsCommands::Categories => {
                let result = commands::stats_categories(root)?;
                print(&result, human);
            }
            StatsCommands::Frequent => {
                let result = commands::stats_frequent(root)?;
                print(&result, human);
            }
            StatsCommands::Overcome => {
                let result = commands::stats_overcome(root)?;
                print(&result, human);
            }
            StatsCommands::Tasks { date } => {
                let result = commands::stats_tasks(root, date)?;
                print(&result, human);
            }
            StatsCommands::Moods { days } => {
                let result = commands::stats_moods(root, days)?;
                print(&result, human);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(root, &key)?;
                print(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(root, &key, &value)?;
                print(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config_list(root)?;
                print(&result, human);
            }
        },

        Commands::System { command } => match command {
            SystemCommands::Init => {
                let result = commands::system_init(root)?;
                print(&result, human);
            }
            SystemCommands::Status => {
                let result = commands::system_status(root)?;
                print(&result, human);
            }
            SystemCommands::Rebuild => {
                let result = commands::system_rebuild(root)?;
                print(&result, human);
            }
        },
    }

    Ok(())
}
