//! Command implementations for the alm CLI.
//!
//! This module contains the business logic for each CLI command and is the
//! single entry point surrounding collaborators call. Commands sequence
//! operations across the task store, the slot grid, and the recommendation
//! ledger; multi-step commands are all-or-nothing, and every derived view
//! is recomputed from storage on each call.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

use crate::models::{
    DayOverview, Decision, Mood, SlotRef, SlotStatus, Subtask, Task, TaskType, TimeSlot,
    WeeklyOverview,
};
use crate::stats::{self, CategoryHours, FlagCompletion, FlagEntry, MoodSummary, TaskHours};
use crate::storage::{SlotTemplate, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    /// Format for human-readable output.
    fn human(&self) -> String;
}

/// Print a command result as JSON (default) or human-readable text.
pub fn print(result: &impl Output, human: bool) {
    if human {
        println!("{}", result.human());
    } else {
        match serde_json::to_string(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!(r#"{{"error": "{}"}}"#, e),
        }
    }
}

fn fmt_hours(hours: f64) -> String {
    format!("{:.1}h", stats::round1(hours))
}

// === System commands ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub root: String,
}

impl Output for InitResult {
    fn human(&self) -> String {
        if self.initialized {
            format!("Initialized almanac at {}", self.root)
        } else {
            format!("Almanac already initialized at {}", self.root)
        }
    }
}

/// Initialize storage for a profile. Idempotent: a second init reports
/// `initialized: false` and succeeds.
pub fn system_init(root: &Path) -> Result<InitResult> {
    if Storage::exists(root) {
        return Ok(InitResult {
            initialized: false,
            root: root.display().to_string(),
        });
    }
    Storage::init(root)?;
    SlotTemplate::default().save(root)?;
    Ok(InitResult {
        initialized: true,
        root: root.display().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub initialized: bool,
    pub root: String,
    pub version: &'static str,
    pub built_at: &'static str,
    pub commit: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decisions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_day: Option<NaiveDate>,
}

impl Output for StatusResult {
    fn human(&self) -> String {
        let mut out = format!(
            "almanac {} ({} built {})\nData: {}\n",
            self.version, self.commit, self.built_at, self.root
        );
        if self.initialized {
            let _ = writeln!(
                out,
                "Tasks: {} ({} subtasks)\nSlots: {}\nDecisions: {}",
                self.tasks.unwrap_or(0),
                self.subtasks.unwrap_or(0),
                self.slots.unwrap_or(0),
                self.decisions.unwrap_or(0),
            );
            match self.current_day {
                Some(day) => {
                    let _ = writeln!(out, "Current day: {}", day);
                }
                None => {
                    let _ = writeln!(out, "Current day: none (run `alm day rollover`)");
                }
            }
        } else {
            out.push_str("Not initialized: run `alm system init` first\n");
        }
        out.trim_end().to_string()
    }
}

/// Report version, build info, and entity counts.
pub fn system_status(root: &Path) -> Result<StatusResult> {
    let mut result = StatusResult {
        initialized: Storage::exists(root),
        root: root.display().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        built_at: env!("ALM_BUILD_TIMESTAMP"),
        commit: env!("ALM_GIT_COMMIT"),
        tasks: None,
        subtasks: None,
        slots: None,
        decisions: None,
        current_day: None,
    };
    if result.initialized {
        let storage = Storage::open(root)?;
        let (tasks, subtasks, slots, decisions) = storage.counts()?;
        result.tasks = Some(tasks);
        result.subtasks = Some(subtasks);
        result.slots = Some(slots);
        result.decisions = Some(decisions);
        result.current_day = storage.latest_day()?;
    }
    Ok(result)
}

#[derive(Debug, Serialize)]
pub struct RebuildResult {
    pub tasks: usize,
    pub subtasks: usize,
    pub slots: usize,
    pub decisions: usize,
}

impl Output for RebuildResult {
    fn human(&self) -> String {
        format!(
            "Rebuilt cache: {} tasks, {} subtasks, {} slots, {} decisions",
            self.tasks, self.subtasks, self.slots, self.decisions
        )
    }
}

/// Rebuild the SQLite cache from the JSONL history.
pub fn system_rebuild(root: &Path) -> Result<RebuildResult> {
    let mut storage = Storage::open(root)?;
    storage.rebuild_cache()?;
    let (tasks, subtasks, slots, decisions) = storage.counts()?;
    Ok(RebuildResult {
        tasks,
        subtasks,
        slots,
        decisions,
    })
}

// === Task commands ===

/// A task with its subtasks and derived effective hours.
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub effective_hours: f64,
    pub subtasks: Vec<Subtask>,
}

impl Output for TaskView {
    fn human(&self) -> String {
        let mut out = format!(
            "{}: {} [{}] {}",
            self.task.id,
            self.task.name,
            self.task.task_type,
            fmt_hours(self.effective_hours)
        );
        if let Some(category) = &self.task.category {
            let _ = write!(out, " ({})", category);
        }
        if self.task.is_high_frequency {
            out.push_str(" #high-frequency");
        }
        if self.task.is_overcome {
            out.push_str(" #overcome");
        }
        for subtask in &self.subtasks {
            let _ = write!(
                out,
                "\n  {}: {} {}",
                subtask.id,
                subtask.name,
                fmt_hours(subtask.hours)
            );
        }
        out
    }
}

fn task_view(storage: &Storage, task: Task) -> Result<TaskView> {
    let effective_hours = storage.effective_hours(&task.id)?;
    let subtasks = storage.list_subtasks(&task.id)?;
    Ok(TaskView {
        task,
        effective_hours: stats::round1(effective_hours),
        subtasks,
    })
}

/// Create a task.
#[allow(clippy::too_many_arguments)]
pub fn task_add(
    root: &Path,
    name: &str,
    task_type: TaskType,
    category: Option<String>,
    weekly_hours: f64,
    is_high_frequency: bool,
    is_overcome: bool,
) -> Result<TaskView> {
    let mut storage = Storage::open(root)?;
    let task = storage.create_task(
        name,
        task_type,
        category,
        weekly_hours,
        is_high_frequency,
        is_overcome,
    )?;
    task_view(&storage, task)
}

/// Create a bare study task from free text.
pub fn task_quick(root: &Path, text: &str) -> Result<TaskView> {
    let mut storage = Storage::open(root)?;
    let task = storage.quick_add_task(text)?;
    task_view(&storage, task)
}

/// Update task fields; only the provided ones change.
#[allow(clippy::too_many_arguments)]
pub fn task_update(
    root: &Path,
    id: &str,
    name: Option<String>,
    task_type: Option<TaskType>,
    category: Option<String>,
    weekly_hours: Option<f64>,
    is_high_frequency: Option<bool>,
    is_overcome: Option<bool>,
) -> Result<TaskView> {
    let mut storage = Storage::open(root)?;
    let mut task = storage.get_task(id)?;
    if let Some(name) = name {
        task.name = name;
    }
    if let Some(task_type) = task_type {
        task.task_type = task_type;
    }
    if let Some(category) = category {
        task.category = if category.is_empty() {
            None
        } else {
            Some(category)
        };
    }
    if let Some(weekly_hours) = weekly_hours {
        task.weekly_hours = weekly_hours;
    }
    if let Some(flag) = is_high_frequency {
        task.is_high_frequency = flag;
    }
    if let Some(flag) = is_overcome {
        task.is_overcome = flag;
    }
    task.updated_at = chrono::Utc::now();
    storage.update_task(&task)?;
    task_view(&storage, task)
}

#[derive(Debug, Serialize)]
pub struct TaskRemoved {
    pub id: String,
    pub removed: bool,
    pub subtasks_removed: usize,
    pub slots_cleared: usize,
}

impl Output for TaskRemoved {
    fn human(&self) -> String {
        if self.removed {
            format!(
                "Removed {} ({} subtasks, {} slot bindings cleared)",
                self.id, self.subtasks_removed, self.slots_cleared
            )
        } else {
            format!("Task {} was already gone; nothing to do", self.id)
        }
    }
}

/// Delete a task. Idempotent.
pub fn task_remove(root: &Path, id: &str) -> Result<TaskRemoved> {
    let mut storage = Storage::open(root)?;
    match storage.delete_task(id)? {
        Some(removal) => Ok(TaskRemoved {
            id: id.to_string(),
            removed: true,
            subtasks_removed: removal.subtasks_removed,
            slots_cleared: removal.slots_cleared,
        }),
        None => Ok(TaskRemoved {
            id: id.to_string(),
            removed: false,
            subtasks_removed: 0,
            slots_cleared: 0,
        }),
    }
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskView>,
    pub total: usize,
    pub high_frequency_count: usize,
    pub overcome_count: usize,
}

impl Output for TaskList {
    fn human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }
        let mut out = format!(
            "{} tasks ({} high-frequency, {} overcome)",
            self.total, self.high_frequency_count, self.overcome_count
        );
        for view in &self.tasks {
            let _ = write!(out, "\n{}", view.human());
        }
        out
    }
}

/// List tasks in insertion order, optionally filtered by type.
pub fn task_list(root: &Path, task_type: Option<TaskType>) -> Result<TaskList> {
    let storage = Storage::open(root)?;
    let tasks = storage.list_tasks(task_type)?;
    let high_frequency_count = tasks.iter().filter(|t| t.is_high_frequency).count();
    let overcome_count = tasks.iter().filter(|t| t.is_overcome).count();
    let total = tasks.len();

    let mut views = Vec::new();
    for task in tasks {
        views.push(task_view(&storage, task)?);
    }
    Ok(TaskList {
        tasks: views,
        total,
        high_frequency_count,
        overcome_count,
    })
}

/// Show one task with its subtasks.
pub fn task_show(root: &Path, id: &str) -> Result<TaskView> {
    let storage = Storage::open(root)?;
    let task = storage.get_task(id)?;
    task_view(&storage, task)
}

// === Subtask commands ===

#[derive(Debug, Serialize)]
pub struct SubtaskView {
    #[serde(flatten)]
    pub subtask: Subtask,
}

impl Output for SubtaskView {
    fn human(&self) -> String {
        let mut out = format!(
            "{}: {} {} (task {})",
            self.subtask.id,
            self.subtask.name,
            fmt_hours(self.subtask.hours),
            self.subtask.task_id
        );
        if self.subtask.is_high_frequency {
            out.push_str(" #high-frequency");
        }
        if self.subtask.is_overcome {
            out.push_str(" #overcome");
        }
        out
    }
}

/// Add a subtask to a task.
pub fn subtask_add(
    root: &Path,
    task_id: &str,
    name: &str,
    hours: f64,
    is_high_frequency: bool,
    is_overcome: bool,
) -> Result<SubtaskView> {
    let mut storage = Storage::open(root)?;
    let subtask = storage.add_subtask(task_id, name, hours, is_high_frequency, is_overcome)?;
    Ok(SubtaskView { subtask })
}

/// Update subtask fields; only the provided ones change.
pub fn subtask_update(
    root: &Path,
    id: &str,
    name: Option<String>,
    hours: Option<f64>,
    is_high_frequency: Option<bool>,
    is_overcome: Option<bool>,
) -> Result<SubtaskView> {
    let mut storage = Storage::open(root)?;
    let mut subtask = storage.get_subtask(id)?;
    if let Some(name) = name {
        subtask.name = name;
    }
    if let Some(hours) = hours {
        subtask.hours = hours;
    }
    if let Some(flag) = is_high_frequency {
        subtask.is_high_frequency = flag;
    }
    if let Some(flag) = is_overcome {
        subtask.is_overcome = flag;
    }
    subtask.updated_at = chrono::Utc::now();
    storage.update_subtask(&subtask)?;
    Ok(SubtaskView { subtask })
}

#[derive(Debug, Serialize)]
pub struct SubtaskRemoved {
    pub id: String,
    pub removed: bool,
}

impl Output for SubtaskRemoved {
    fn human(&self) -> String {
        if self.removed {
            format!("Removed {}", self.id)
        } else {
            format!("Subtask {} was already gone; nothing to do", self.id)
        }
    }
}

/// Delete a subtask. Idempotent.
pub fn subtask_remove(root: &Path, id: &str) -> Result<SubtaskRemoved> {
    let mut storage = Storage::open(root)?;
    let removed = storage.delete_subtask(id)?;
    Ok(SubtaskRemoved {
        id: id.to_string(),
        removed,
    })
}

// === Day commands ===

#[derive(Debug, Serialize)]
pub struct RolloverResult {
    pub date: NaiveDate,
    pub generated: usize,
}

impl Output for RolloverResult {
    fn human(&self) -> String {
        format!("Generated {} slots for {}", self.generated, self.date)
    }
}

/// Generate the slot grid for a new day from the template; previous days
/// become a read-only archive.
pub fn day_rollover(root: &Path, date: Option<NaiveDate>) -> Result<RolloverResult> {
    let mut storage = Storage::open(root)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let template = SlotTemplate::load(root)?;
    let slots = storage.generate_day(date, &template)?;
    Ok(RolloverResult {
        date,
        generated: slots.len(),
    })
}

/// A slot joined with the name, type, and flags of its bound entity.
#[derive(Debug, Serialize)]
pub struct SlotDetail {
    #[serde(flatten)]
    pub slot: TimeSlot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    pub is_high_frequency: bool,
    pub is_overcome: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_emoji: Option<String>,
}

impl Output for SlotDetail {
    fn human(&self) -> String {
        let mut out = format!(
            "{} {} {} [{}]",
            self.slot.id, self.slot.day, self.slot.time_range, self.slot.status
        );
        match (&self.task_name, &self.subtask_name) {
            (Some(task), Some(subtask)) => {
                let _ = write!(out, " {} / {}", task, subtask);
            }
            (Some(task), None) => {
                let _ = write!(out, " {}", task);
            }
            _ => {}
        }
        if self.is_high_frequency {
            out.push_str(" #high-frequency");
        }
        if self.is_overcome {
            out.push_str(" #overcome");
        }
        if let (Some(mood), Some(emoji)) = (self.slot.mood, &self.mood_emoji) {
            let _ = write!(out, " {} {}", emoji, mood);
        }
        if self.slot.is_ai_recommended {
            out.push_str(" [AI]");
        }
        if let Some(note) = &self.slot.note {
            let _ = write!(out, " [note: {}]", note);
        }
        out
    }
}

fn slot_detail(storage: &Storage, slot: TimeSlot) -> Result<SlotDetail> {
    let mut detail = SlotDetail {
        mood_emoji: slot.mood.map(|m| m.emoji().to_string()),
        slot,
        task_name: None,
        subtask_name: None,
        task_type: None,
        is_high_frequency: false,
        is_overcome: false,
    };
    match detail.slot.bound.clone() {
        Some(SlotRef::Task(id)) => {
            let task = storage.get_task(&id)?;
            detail.task_name = Some(task.name);
            detail.task_type = Some(task.task_type);
            detail.is_high_frequency = task.is_high_frequency;
            detail.is_overcome = task.is_overcome;
        }
        Some(SlotRef::Subtask(id)) => {
            let subtask = storage.get_subtask(&id)?;
            let task = storage.get_task(&subtask.task_id)?;
            detail.task_name = Some(task.name);
            detail.task_type = Some(task.task_type);
            detail.subtask_name = Some(subtask.name);
            detail.is_high_frequency = subtask.is_high_frequency;
            detail.is_overcome = subtask.is_overcome;
        }
        None => {}
    }
    Ok(detail)
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub overview: DayOverview,
    pub slots: Vec<SlotDetail>,
    pub mood_summary: MoodSummary,
}

impl Output for DayView {
    fn human(&self) -> String {
        let o = &self.overview;
        let mut out = format!(
            "{}: {}/{} completed ({:.0}%), {} in progress, {} pending, {} empty, {}",
            o.date,
            o.completed_slots,
            o.total_slots,
            o.completion_rate * 100.0,
            o.in_progress_slots,
            o.pending_slots,
            o.empty_slots,
            fmt_hours(o.total_study_hours)
        );
        for slot in &self.slots {
            let _ = write!(out, "\n{}", slot.human());
        }
        out
    }
}

/// Show a day's schedule: overview, joined slot details, and mood tally.
pub fn day_show(root: &Path, date: Option<NaiveDate>) -> Result<DayView> {
    let storage = Storage::open(root)?;
    let date = match date {
        Some(d) => d,
        None => storage
            .latest_day()?
            .unwrap_or_else(|| Local::now().date_naive()),
    };
    let slots = storage.list_slots(date)?;

    let mut overview = stats::day_overview(date, &slots);
    overview.total_study_hours = stats::round1(overview.total_study_hours);
    let mood_summary = stats::mood_summary(&slots);

    let mut details = Vec::new();
    for slot in slots {
        details.push(slot_detail(&storage, slot)?);
    }
    Ok(DayView {
        overview,
        slots: details,
        mood_summary,
    })
}

// === Slot commands ===

/// Bind a task or subtask to a slot.
pub fn slot_bind(root: &Path, slot_id: &str, target_id: &str) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let target = SlotRef::parse(target_id).map_err(Error::InvalidId)?;
    let slot = storage.bind_slot(slot_id, &target)?;
    slot_detail(&storage, slot)
}

/// Clear a slot's binding.
pub fn slot_unbind(root: &Path, slot_id: &str) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let slot = storage.unbind_slot(slot_id)?;
    slot_detail(&storage, slot)
}

/// Move a pending slot to in-progress.
pub fn slot_start(root: &Path, slot_id: &str) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let slot = storage.start_slot(slot_id)?;
    slot_detail(&storage, slot)
}

/// Mark a slot completed.
pub fn slot_done(root: &Path, slot_id: &str) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let slot = storage.complete_slot(slot_id)?;
    slot_detail(&storage, slot)
}

/// Undo a completion, back to pending (default) or in-progress.
pub fn slot_reopen(root: &Path, slot_id: &str, in_progress: bool) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let to = if in_progress {
        SlotStatus::InProgress
    } else {
        SlotStatus::Pending
    };
    let slot = storage.reopen_slot(slot_id, to)?;
    slot_detail(&storage, slot)
}

#[derive(Debug, Serialize)]
pub struct MoodResult {
    pub slot_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    pub cleared: bool,
}

impl Output for MoodResult {
    fn human(&self) -> String {
        match self.mood {
            Some(mood) => format!("{} mood set to {} {}", self.slot_id, mood.emoji(), mood),
            None => format!("{} mood cleared", self.slot_id),
        }
    }
}

/// Set a slot's mood. Setting the mood the slot already has clears it
/// (toggle convenience); at most one mood per slot at a time.
pub fn slot_mood(root: &Path, slot_id: &str, mood: Mood) -> Result<MoodResult> {
    let mut storage = Storage::open(root)?;
    let current = storage.get_slot(slot_id)?;
    let next = if current.mood == Some(mood) {
        None
    } else {
        Some(mood)
    };
    let slot = storage.set_mood(slot_id, next)?;
    Ok(MoodResult {
        slot_id: slot.id,
        mood: slot.mood,
        cleared: next.is_none(),
    })
}

/// Set a slot's note; empty text clears it.
pub fn slot_note(root: &Path, slot_id: &str, text: &str) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let slot = storage.set_note(slot_id, text)?;
    slot_detail(&storage, slot)
}

// === Quick add-and-bind ===

#[derive(Debug, Serialize)]
pub struct QuickResult {
    pub task: TaskView,
    pub slot: SlotDetail,
}

impl Output for QuickResult {
    fn human(&self) -> String {
        format!(
            "Created {} and bound it to {} ({})",
            self.task.task.id, self.slot.slot.id, self.slot.slot.time_range
        )
    }
}

/// Create a task from free text and bind it to the first empty slot of the
/// current day, all-or-nothing: with no empty slot, no task is created.
pub fn quick_add_and_bind(root: &Path, text: &str) -> Result<QuickResult> {
    let mut storage = Storage::open(root)?;
    let day = storage.latest_day()?.ok_or(Error::NoEmptySlot)?;
    let empty = storage.first_empty_slot(day)?.ok_or(Error::NoEmptySlot)?;

    let task = storage.quick_add_task(text)?;
    let slot = storage.bind_slot(&empty.id, &SlotRef::Task(task.id.clone()))?;

    Ok(QuickResult {
        task: task_view(&storage, task)?,
        slot: slot_detail(&storage, slot)?,
    })
}

// === Recommendation commands ===

/// Stamp an AI suggestion on a slot.
pub fn rec_suggest(
    root: &Path,
    slot_id: &str,
    target_id: Option<String>,
    tip: Option<String>,
) -> Result<SlotDetail> {
    let mut storage = Storage::open(root)?;
    let target = match target_id {
        Some(id) => Some(SlotRef::parse(&id).map_err(Error::InvalidId)?),
        None => None,
    };
    let slot = storage.suggest_slot(slot_id, target, tip)?;
    slot_detail(&storage, slot)
}

#[derive(Debug, Serialize)]
pub struct DecisionResult {
    pub slot_id: String,
    pub accepted: bool,
    pub decided_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<SlotRef>,
}

impl Output for DecisionResult {
    fn human(&self) -> String {
        let verdict = if self.accepted { "accepted" } else { "rejected" };
        match &self.bound {
            Some(target) => format!(
                "Recommendation for {} {}; bound {}",
                self.slot_id, verdict, target
            ),
            None => format!("Recommendation for {} {}", self.slot_id, verdict),
        }
    }
}

/// Accept a slot's recommendation: record the acceptance and bind the
/// suggested task when one is present. A failed bind leaves the ledger
/// undecided.
pub fn rec_accept(root: &Path, slot_id: &str) -> Result<DecisionResult> {
    let mut storage = Storage::open(root)?;
    let (decision, bound) = storage.accept_recommendation(slot_id)?;
    Ok(DecisionResult {
        slot_id: decision.slot_id,
        accepted: decision.accepted,
        decided_at: decision.decided_at,
        bound: bound.and_then(|s| s.bound),
    })
}

/// Reject a slot's recommendation. A signal only; the slot is untouched.
pub fn rec_reject(root: &Path, slot_id: &str) -> Result<DecisionResult> {
    let mut storage = Storage::open(root)?;
    let decision = storage.record_decision(slot_id, false)?;
    Ok(DecisionResult {
        slot_id: decision.slot_id,
        accepted: decision.accepted,
        decided_at: decision.decided_at,
        bound: None,
    })
}

#[derive(Debug, Serialize)]
pub struct RecStatus {
    pub slot_id: String,
    /// None means no decision has been recorded, distinct from rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_ai_recommended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<SlotRef>,
}

impl Output for RecStatus {
    fn human(&self) -> String {
        let verdict = match self.accepted {
            Some(true) => "accepted",
            Some(false) => "rejected",
            None => "undecided",
        };
        let mut out = format!("{}: {}", self.slot_id, verdict);
        if let Some(target) = &self.suggested {
            let _ = write!(out, " (suggested {})", target);
        }
        if let Some(tip) = &self.ai_tip {
            let _ = write!(out, "\n  tip: {}", tip);
        }
        out
    }
}

/// Show the recommendation state and current decision for a slot.
pub fn rec_show(root: &Path, slot_id: &str) -> Result<RecStatus> {
    let storage = Storage::open(root)?;
    let slot = storage.get_slot(slot_id)?;
    let decision = storage.decision_for(slot_id)?;
    Ok(RecStatus {
        slot_id: slot.id,
        accepted: decision.as_ref().map(|d| d.accepted),
        decided_at: decision.map(|d| d.decided_at),
        is_ai_recommended: slot.is_ai_recommended,
        ai_tip: slot.ai_tip,
        suggested: slot.suggested,
    })
}

#[derive(Debug, Serialize)]
pub struct DecisionHistory {
    pub decisions: Vec<Decision>,
    pub total: usize,
}

impl Output for DecisionHistory {
    fn human(&self) -> String {
        if self.decisions.is_empty() {
            return "No decisions recorded.".to_string();
        }
        let mut out = format!("{} decisions", self.total);
        for decision in &self.decisions {
            let verdict = if decision.accepted {
                "accepted"
            } else {
                "rejected"
            };
            let _ = write!(
                out,
                "\n{} {} {}",
                decision.decided_at.format("%Y-%m-%d %H:%M"),
                decision.slot_id,
                verdict
            );
        }
        out
    }
}

/// Every decision ever recorded, oldest first.
pub fn rec_list(root: &Path) -> Result<DecisionHistory> {
    let storage = Storage::open(root)?;
    let decisions = storage.decision_history()?;
    let total = decisions.len();
    Ok(DecisionHistory { decisions, total })
}

// === Statistics commands ===

#[derive(Debug, Serialize)]
pub struct OverviewResult {
    #[serde(flatten)]
    pub overview: WeeklyOverview,
    pub high_freq_complete: FlagCompletion,
    pub overcome_complete: FlagCompletion,
    pub ai_accept_rate: u32,
}

impl Output for OverviewResult {
    fn human(&self) -> String {
        let o = &self.overview;
        format!(
            "Week {} to {}\n  study hours: {}\n  slots: {}/{} completed ({:.0}%), {} in progress\n  high-frequency: {}/{}\n  overcome: {}/{}\n  AI accept rate: {}%",
            o.week_start,
            o.week_end,
            fmt_hours(o.total_study_hours),
            o.completed_slots,
            o.total_slots,
            o.completion_rate * 100.0,
            o.in_progress_slots,
            self.high_freq_complete.completed,
            self.high_freq_complete.total,
            self.overcome_complete.completed,
            self.overcome_complete.total,
            self.ai_accept_rate,
        )
    }
}

/// Collect the IDs of tasks and subtasks carrying the given flag.
fn flagged_ids(storage: &Storage, overcome: bool) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    for task in storage.list_tasks(None)? {
        let flagged = if overcome {
            task.is_overcome
        } else {
            task.is_high_frequency
        };
        if flagged {
            ids.insert(task.id.clone());
        }
        for subtask in storage.list_subtasks(&task.id)? {
            let flagged = if overcome {
                subtask.is_overcome
            } else {
                subtask.is_high_frequency
            };
            if flagged {
                ids.insert(subtask.id);
            }
        }
    }
    Ok(ids)
}

/// Weekly overview for the ISO week containing the given date (today by
/// default), with flag completion summaries and the AI acceptance rate.
pub fn stats_overview(root: &Path, date: Option<NaiveDate>) -> Result<OverviewResult> {
    let storage = Storage::open(root)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let (week_start, week_end) = stats::week_bounds(date);
    let slots = storage.slots_between(week_start, week_end)?;

    let mut overview = stats::weekly_overview(&slots, week_start, week_end);
    overview.total_study_hours = stats::round1(overview.total_study_hours);

    let high_freq_complete = stats::flag_completion(&slots, &flagged_ids(&storage, false)?);
    let overcome_complete = stats::flag_completion(&slots, &flagged_ids(&storage, true)?);

    let week_slot_ids: HashSet<&str> = slots.iter().map(|s| s.id.as_str()).collect();
    let decisions: Vec<Decision> = storage
        .current_decisions()?
        .into_iter()
        .filter(|d| week_slot_ids.contains(d.slot_id.as_str()))
        .collect();
    let ai_accept_rate = stats::ai_accept_rate(&decisions);

    Ok(OverviewResult {
        overview,
        high_freq_complete,
        overcome_complete,
        ai_accept_rate,
    })
}

#[derive(Debug, Serialize)]
pub struct CategoriesResult {
    pub categories: Vec<CategoryHours>,
}

impl Output for CategoriesResult {
    fn human(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("{}: {}", c.task_type, fmt_hours(c.hours)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Effective hours summed per task type; zero-valued types included.
pub fn stats_categories(root: &Path) -> Result<CategoriesResult> {
    let storage = Storage::open(root)?;
    let mut entries = Vec::new();
    for task in storage.list_tasks(None)? {
        entries.push((task.task_type, storage.effective_hours(&task.id)?));
    }
    let mut categories = stats::category_hours(&entries);
    for category in &mut categories {
        category.hours = stats::round1(category.hours);
    }
    Ok(CategoriesResult { categories })
}

#[derive(Debug, Serialize)]
pub struct FlagReport {
    pub entries: Vec<FlagEntry>,
}

impl Output for FlagReport {
    fn human(&self) -> String {
        if self.entries.is_empty() {
            return "No flagged entries.".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("{} {} ({}) {}", e.id, e.name, e.kind, fmt_hours(e.hours)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn flag_report(root: &Path, overcome: bool) -> Result<FlagReport> {
    let storage = Storage::open(root)?;
    let mut entries = Vec::new();
    for task in storage.list_tasks(None)? {
        let flagged = if overcome {
            task.is_overcome
        } else {
            task.is_high_frequency
        };
        if flagged {
            entries.push(FlagEntry {
                id: task.id.clone(),
                name: task.name.clone(),
                kind: "task",
                hours: storage.effective_hours(&task.id)?,
                created_at: task.created_at,
            });
        }
        for subtask in storage.list_subtasks(&task.id)? {
            let flagged = if overcome {
                subtask.is_overcome
            } else {
                subtask.is_high_frequency
            };
            if flagged {
                entries.push(FlagEntry {
                    id: subtask.id,
                    name: subtask.name,
                    kind: "subtask",
                    hours: subtask.hours,
                    created_at: subtask.created_at,
                });
            }
        }
    }

    let mut entries = stats::sort_flag_entries(entries);
    for entry in &mut entries {
        entry.hours = stats::round1(entry.hours);
    }
    Ok(FlagReport { entries })
}

/// Tasks and subtasks flagged high-frequency, busiest first.
pub fn stats_frequent(root: &Path) -> Result<FlagReport> {
    flag_report(root, false)
}

/// Tasks and subtasks flagged overcome, busiest first.
pub fn stats_overcome(root: &Path) -> Result<FlagReport> {
    flag_report(root, true)
}

#[derive(Debug, Serialize)]
pub struct TaskHoursReport {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Vec<TaskHours>,
}

impl Output for TaskHoursReport {
    fn human(&self) -> String {
        if self.entries.is_empty() {
            return format!(
                "No completed task hours between {} and {}.",
                self.week_start, self.week_end
            );
        }
        let mut out = format!("Week {} to {}", self.week_start, self.week_end);
        for entry in &self.entries {
            let _ = write!(out, "\n{} {}", entry.name, fmt_hours(entry.hours));
        }
        out
    }
}

/// Completed hours per task over the ISO week containing the given date.
pub fn stats_tasks(root: &Path, date: Option<NaiveDate>) -> Result<TaskHoursReport> {
    let storage = Storage::open(root)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let (week_start, week_end) = stats::week_bounds(date);
    let slots = storage.slots_between(week_start, week_end)?;

    let mut owners: HashMap<String, (String, String)> = HashMap::new();
    for task in storage.list_tasks(None)? {
        owners.insert(task.id.clone(), (task.id.clone(), task.name.clone()));
        for subtask in storage.list_subtasks(&task.id)? {
            owners.insert(subtask.id, (task.id.clone(), task.name.clone()));
        }
    }

    let mut entries = stats::weekly_task_hours(&slots, &owners);
    for entry in &mut entries {
        entry.hours = stats::round1(entry.hours);
    }
    Ok(TaskHoursReport {
        week_start,
        week_end,
        entries,
    })
}

#[derive(Debug, Serialize)]
pub struct MoodsResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub summary: MoodSummary,
}

impl Output for MoodsResult {
    fn human(&self) -> String {
        let mut out = format!(
            "Moods {} to {} ({} recorded)",
            self.start_date, self.end_date, self.summary.total_records
        );
        for count in &self.summary.distribution {
            let _ = write!(
                out,
                "\n{} {}: {}",
                count.mood.emoji(),
                count.mood,
                count.count
            );
        }
        if let Some(dominant) = self.summary.dominant_mood {
            let _ = write!(out, "\ndominant: {}", dominant);
        }
        out
    }
}

/// Mood distribution over the trailing `days` ending at the current day.
pub fn stats_moods(root: &Path, days: u32) -> Result<MoodsResult> {
    let storage = Storage::open(root)?;
    let days = days.max(1);
    let end_date = storage
        .latest_day()?
        .unwrap_or_else(|| Local::now().date_naive());
    let start_date = end_date - chrono::Duration::days(days as i64 - 1);
    let slots = storage.slots_between(start_date, end_date)?;
    Ok(MoodsResult {
        start_date,
        end_date,
        summary: stats::mood_summary(&slots),
    })
}

// === Config commands ===

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Output for ConfigValue {
    fn human(&self) -> String {
        match &self.value {
            Some(value) => format!("{} = {}", self.key, value),
            None => format!("{} is not set", self.key),
        }
    }
}

/// Get a configuration value.
pub fn config_get(root: &Path, key: &str) -> Result<ConfigValue> {
    let storage = Storage::open(root)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: storage.get_config(key)?,
    })
}

/// Set a configuration value.
pub fn config_set(root: &Path, key: &str, value: &str) -> Result<ConfigValue> {
    let mut storage = Storage::open(root)?;
    storage.set_config(key, value)?;
    Ok(ConfigValue {
        key: key.to_string(),
        value: Some(value.to_string()),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigList {
    pub entries: Vec<ConfigEntry>,
}

impl Output for ConfigList {
    fn human(&self) -> String {
        if self.entries.is_empty() {
            return "No configuration set.".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("{} = {}", e.key, e.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List all configuration entries.
pub fn config_list(root: &Path) -> Result<ConfigList> {
    let storage = Storage::open(root)?;
    let entries = storage
        .list_configs()?
        .into_iter()
        .map(|(key, value)| ConfigEntry { key, value })
        .collect();
    Ok(ConfigList { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    fn init_root(env: &TestEnv) -> &Path {
        system_init(env.path()).unwrap();
        env.path()
    }

    #[test]
    fn test_init_is_idempotent() {
        let env = TestEnv::new();
        let first = system_init(env.path()).unwrap();
        assert!(first.initialized);
        let second = system_init(env.path()).unwrap();
        assert!(!second.initialized);
    }

    #[test]
    fn test_quick_add_and_bind_uses_first_empty_slot() {
        let env = TestEnv::new();
        let root = init_root(&env);
        day_rollover(root, Some(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap())).unwrap();

        let result = quick_add_and_bind(root, "review notes").unwrap();
        assert_eq!(result.task.task.name, "review notes");
        assert_eq!(result.slot.slot.time_range, "07:00-08:00");
        assert_eq!(result.slot.slot.status, SlotStatus::Pending);

        let second = quick_add_and_bind(root, "practice listening").unwrap();
        assert_eq!(second.slot.slot.time_range, "08:00-09:00");
    }

    #[test]
    fn test_quick_add_and_bind_full_grid_creates_no_task() {
        let env = TestEnv::new();
        let root = init_root(&env);
        // A one-slot day fills up immediately
        SlotTemplate {
            day_start: "07:00".to_string(),
            day_end: "08:00".to_string(),
            slot_minutes: 60,
        }
        .save(root)
        .unwrap();
        day_rollover(root, Some(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap())).unwrap();

        quick_add_and_bind(root, "first").unwrap();
        let err = quick_add_and_bind(root, "second").unwrap_err();
        assert!(matches!(err, Error::NoEmptySlot));

        // All-or-nothing: the failed call must not leave a task behind
        let list = task_list(root, None).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.tasks[0].task.name, "first");
    }

    #[test]
    fn test_quick_add_and_bind_without_grid() {
        let env = TestEnv::new();
        let root = init_root(&env);
        let err = quick_add_and_bind(root, "anything").unwrap_err();
        assert!(matches!(err, Error::NoEmptySlot));
        assert_eq!(task_list(root, None).unwrap().total, 0);
    }

    #[test]
    fn test_mood_toggle_clears_on_repeat() {
        let env = TestEnv::new();
        let root = init_root(&env);
        day_rollover(root, Some(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap())).unwrap();
        let view = day_show(root, None).unwrap();
        let slot_id = view.slots[0].slot.id.clone();

        let set = slot_mood(root, &slot_id, Mood::Happy).unwrap();
        assert_eq!(set.mood, Some(Mood::Happy));
        assert!(!set.cleared);

        // Same mood again toggles it off
        let toggled = slot_mood(root, &slot_id, Mood::Happy).unwrap();
        assert!(toggled.mood.is_none());
        assert!(toggled.cleared);

        // A different mood just overwrites
        slot_mood(root, &slot_id, Mood::Happy).unwrap();
        let switched = slot_mood(root, &slot_id, Mood::Tired).unwrap();
        assert_eq!(switched.mood, Some(Mood::Tired));
    }

    #[test]
    fn test_stats_overview_scenario() {
        let env = TestEnv::new();
        let root = init_root(&env);
        // 2026-08-03 is a Monday; a 10-slot day makes the math round
        SlotTemplate {
            day_start: "07:00".to_string(),
            day_end: "17:00".to_string(),
            slot_minutes: 60,
        }
        .save(root)
        .unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        day_rollover(root, Some(monday)).unwrap();

        let task = task_add(root, "English", TaskType::Study, None, 0.0, false, false).unwrap();
        let view = day_show(root, None).unwrap();
        for slot in &view.slots[..5] {
            slot_bind(root, &slot.slot.id, &task.task.id).unwrap();
        }
        for slot in &view.slots[..3] {
            slot_done(root, &slot.slot.id).unwrap();
        }
        for slot in &view.slots[3..5] {
            slot_start(root, &slot.slot.id).unwrap();
        }

        let result = stats_overview(root, Some(monday)).unwrap();
        assert_eq!(result.overview.total_slots, 10);
        assert_eq!(result.overview.completed_slots, 3);
        assert_eq!(result.overview.in_progress_slots, 2);
        assert!((result.overview.completion_rate - 0.3).abs() < f64::EPSILON);
        assert_eq!(result.overview.total_study_hours, 3.0);
    }

    #[test]
    fn test_stats_categories_includes_empty_types() {
        let env = TestEnv::new();
        let root = init_root(&env);
        task_add(root, "English", TaskType::Study, None, 4.0, false, false).unwrap();

        let result = stats_categories(root).unwrap();
        assert_eq!(result.categories.len(), 4);
        assert_eq!(result.categories[0].hours, 4.0);
        assert!(result.categories[1..].iter().all(|c| c.hours == 0.0));
    }

    #[test]
    fn test_rec_accept_rollback_keeps_ledger_undecided() {
        let env = TestEnv::new();
        let root = init_root(&env);
        day_rollover(root, Some(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap())).unwrap();
        let task = task_add(root, "English", TaskType::Study, None, 0.0, false, false).unwrap();
        let view = day_show(root, None).unwrap();
        let slot_id = view.slots[0].slot.id.clone();

        rec_suggest(root, &slot_id, Some(task.task.id.clone()), None).unwrap();
        task_remove(root, &task.task.id).unwrap();

        assert!(rec_accept(root, &slot_id).is_err());
        let status = rec_show(root, &slot_id).unwrap();
        assert!(status.accepted.is_none());
    }
}
