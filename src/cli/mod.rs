//! CLI argument definitions for Almanac.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::models::Mood;

/// Almanac - a study schedule and task analytics tool.
///
/// Start with `alm system init`, then `alm day rollover` to lay out today's
/// slots and `alm task add` / `alm quick` to fill them.
#[derive(Parser, Debug)]
#[command(name = "alm")]
#[command(author, version, about = "A CLI engine for study schedules: tasks, time slots, and weekly analytics", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Profile (user) whose schedule to operate on.
    /// Each profile keeps fully independent data.
    #[arg(
        short = 'p',
        long = "profile",
        global = true,
        env = "ALM_PROFILE",
        default_value = "default"
    )]
    pub profile: String,

    /// Base data directory override. Profiles still get their own
    /// subdirectory inside it.
    #[arg(long = "data-dir", global = true, env = "ALM_DATA_DIR")]
    pub data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug, Serialize)]
pub enum Commands {
    /// Task and subtask management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Create a task from free text and bind it to the next empty slot
    Quick {
        /// Free-form task text, e.g. "review English vocabulary"
        text: String,
    },

    /// Daily grid commands
    Day {
        #[command(subcommand)]
        command: DayCommands,
    },

    /// Time-slot commands
    Slot {
        #[command(subcommand)]
        command: SlotCommands,
    },

    /// AI recommendation commands
    Rec {
        #[command(subcommand)]
        command: RecCommands,
    },

    /// Statistics queries
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Task management commands
#[derive(Subcommand, Debug, Serialize)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task name
        name: String,

        /// Activity type: study, life, work, or play
        #[arg(long = "type", default_value = "study")]
        task_type: crate::models::TaskType,

        /// Display category label
        #[arg(long)]
        category: Option<String>,

        /// Planned hours per week
        #[arg(long, default_value_t = 0.0)]
        hours: f64,

        /// Mark as high-frequency
        #[arg(long)]
        high_frequency: bool,

        /// Mark as overcome (behind schedule)
        #[arg(long)]
        overcome: bool,
    },

    /// Create a bare study task from free text
    Quick {
        /// Free-form task text
        text: String,
    },

    /// Update task fields
    Update {
        /// Task ID (e.g., alm-a1b2)
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        task_type: Option<crate::models::TaskType>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        hours: Option<f64>,

        /// true or false
        #[arg(long)]
        high_frequency: Option<bool>,

        /// true or false
        #[arg(long)]
        overcome: Option<bool>,
    },

    /// Delete a task, its subtasks, and any slot bindings to them
    Rm {
        /// Task ID
        id: String,
    },

    /// List tasks in creation order
    List {
        /// Filter by type: study, life, work, play, or all
        #[arg(long = "type", default_value = "all")]
        task_type: String,
    },

    /// Show one task with its subtasks
    Show {
        /// Task ID
        id: String,
    },

    /// Subtask management commands
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
}

/// Subtask management commands
#[derive(Subcommand, Debug, Serialize)]
pub enum SubtaskCommands {
    /// Add a subtask to a task
    Add {
        /// Parent task ID
        task_id: String,

        /// Subtask name
        name: String,

        /// Planned hours
        #[arg(long, default_value_t = 0.0)]
        hours: f64,

        /// Mark as high-frequency
        #[arg(long)]
        high_frequency: bool,

        /// Mark as overcome (behind schedule)
        #[arg(long)]
        overcome: bool,
    },

    /// Update subtask fields
    Update {
        /// Subtask ID (e.g., alms-a1b2)
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        hours: Option<f64>,

        /// true or false
        #[arg(long)]
        high_frequency: Option<bool>,

        /// true or false
        #[arg(long)]
        overcome: Option<bool>,
    },

    /// Delete a subtask and any slot bindings to it
    Rm {
        /// Subtask ID
        id: String,
    },
}

/// Daily grid commands
#[derive(Subcommand, Debug, Serialize)]
pub enum DayCommands {
    /// Generate the slot grid for a new day from the template
    Rollover {
        /// Day to generate (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a day's schedule with overview and mood tally
    Show {
        /// Day to show (defaults to the current day)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// Time-slot commands
#[derive(Subcommand, Debug, Serialize)]
pub enum SlotCommands {
    /// Bind a task or subtask to a slot
    Bind {
        /// Slot ID (e.g., almt-a1b2)
        slot_id: String,

        /// Task or subtask ID to bind
        target_id: String,
    },

    /// Clear a slot's binding (mood and note are kept)
    Unbind {
        /// Slot ID
        slot_id: String,
    },

    /// Start working a pending slot
    Start {
        /// Slot ID
        slot_id: String,
    },

    /// Mark a slot completed
    Done {
        /// Slot ID
        slot_id: String,
    },

    /// Undo a completion
    Reopen {
        /// Slot ID
        slot_id: String,

        /// Reopen to in-progress instead of pending
        #[arg(long)]
        in_progress: bool,
    },

    /// Set a slot's mood; repeating the same mood clears it
    Mood {
        /// Slot ID
        slot_id: String,

        /// happy, focused, or tired
        mood: Mood,
    },

    /// Set a slot's note; omit the text to clear it
    Note {
        /// Slot ID
        slot_id: String,

        /// Note text
        text: Option<String>,
    },
}

/// AI recommendation commands
#[derive(Subcommand, Debug, Serialize)]
pub enum RecCommands {
    /// Stamp an AI suggestion on a slot (done by the AI collaborator)
    Suggest {
        /// Slot ID
        slot_id: String,

        /// Suggested task or subtask ID to bind on acceptance
        #[arg(long = "ref")]
        target_id: Option<String>,

        /// Tip text shown with the suggestion
        #[arg(long)]
        tip: Option<String>,
    },

    /// Accept a slot's recommendation and bind the suggested task
    Accept {
        /// Slot ID
        slot_id: String,
    },

    /// Reject a slot's recommendation
    Reject {
        /// Slot ID
        slot_id: String,
    },

    /// Show a slot's recommendation and current decision
    Show {
        /// Slot ID
        slot_id: String,
    },

    /// List the full decision history
    List,
}

/// Statistics queries
#[derive(Subcommand, Debug, Serialize)]
pub enum StatsCommands {
    /// Weekly completion overview
    Overview {
        /// Any date inside the target ISO week (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Effective hours per task type
    Categories,

    /// High-frequency tasks and subtasks, busiest first
    Frequent,

    /// Overcome tasks and subtasks, busiest first
    Overcome,

    /// Completed hours per task for the week
    Tasks {
        /// Any date inside the target ISO week (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mood distribution over recent days
    Moods {
        /// Number of trailing days to include
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug, Serialize)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// List all configuration entries
    List,
}

/// System administration commands
#[derive(Subcommand, Debug, Serialize)]
pub enum SystemCommands {
    /// Initialize storage for the profile
    Init,

    /// Show version, build info, and entity counts
    Status,

    /// Rebuild the SQLite cache from the JSONL history
    Rebuild,
}
