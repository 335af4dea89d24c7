//! Storage layer for Almanac data.
//!
//! One profile (user) owns one data directory; all writes for a profile go
//! through a single `Storage`, which serializes them.
//!
//! Layout inside the profile directory:
//! - JSONL files for append-only history (tasks.jsonl holds task, subtask
//!   and tombstone records; slots.jsonl holds slot revisions;
//!   decisions.jsonl holds every recommendation decision)
//! - SQLite for indexed queries (cache.db), rebuildable from the JSONL logs
//! - config.toml for the slot template
//!
//! The JSONL logs are the source of truth: readers take the latest record
//! per ID, and deletions append tombstones instead of erasing lines, so the
//! full history survives any rebuild.

pub mod template;

pub use template::SlotTemplate;

use crate::models::{
    Decision, Mood, SlotRef, SlotStatus, Subtask, Task, TaskType, TimeSlot, Tombstone,
    SLOT_ID_PREFIX, SUBTASK_ID_PREFIX, TASK_ID_PREFIX,
};
use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

const TASKS_FILE: &str = "tasks.jsonl";
const SLOTS_FILE: &str = "slots.jsonl";
const DECISIONS_FILE: &str = "decisions.jsonl";

/// Storage manager for a single profile.
pub struct Storage {
    /// Root directory for this profile's data
    root: PathBuf,
    /// SQLite connection for indexed queries
    conn: Connection,
}

/// Summary of a cascading task delete.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRemoval {
    /// Subtasks removed together with the task
    pub subtasks_removed: usize,
    /// Slots whose binding pointed at the task or a subtask and was cleared
    pub slots_cleared: usize,
}

impl Storage {
    /// Open storage at the given profile root.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.join("cache.db").exists() {
            return Err(Error::NotInitialized);
        }
        let conn = Connection::open(root.join("cache.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Initialize storage at the given profile root.
    pub fn init(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        for file in [TASKS_FILE, SLOTS_FILE, DECISIONS_FILE] {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        let conn = Connection::open(root.join("cache.db"))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Check if storage exists at the given profile root.
    pub fn exists(root: &Path) -> bool {
        root.join("cache.db").exists()
    }

    /// Root directory of this profile's data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                task_type TEXT NOT NULL DEFAULT 'study',
                category TEXT,
                weekly_hours REAL NOT NULL DEFAULT 0,
                is_high_frequency INTEGER NOT NULL DEFAULT 0,
                is_overcome INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subtasks (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                name TEXT NOT NULL,
                hours REAL NOT NULL DEFAULT 0,
                is_high_frequency INTEGER NOT NULL DEFAULT 0,
                is_overcome INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS slots (
                id TEXT PRIMARY KEY,
                day TEXT NOT NULL,
                time_range TEXT NOT NULL,
                bound_kind TEXT,
                bound_id TEXT,
                status TEXT NOT NULL DEFAULT 'empty',
                mood TEXT,
                note TEXT,
                is_ai_recommended INTEGER NOT NULL DEFAULT 0,
                ai_tip TEXT,
                suggested_kind TEXT,
                suggested_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS decisions (
                slot_id TEXT PRIMARY KEY,
                accepted INTEGER NOT NULL,
                decided_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_type ON tasks(task_type);
            CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id);
            CREATE INDEX IF NOT EXISTS idx_slots_day ON slots(day);
            CREATE INDEX IF NOT EXISTS idx_slots_status ON slots(status);
            CREATE INDEX IF NOT EXISTS idx_slots_bound ON slots(bound_id);
            "#,
        )?;
        Ok(())
    }

    // === History log helpers ===

    /// Append a record to one of the JSONL history files.
    fn append_record<T: Serialize>(&self, filename: &str, record: &T) -> Result<()> {
        let path = self.root.join(filename);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Read all non-empty lines from a JSONL history file.
    fn read_lines(&self, filename: &str) -> Result<Vec<String>> {
        let path = self.root.join(filename);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// Generate an ID that is not currently in use in the given cache table.
    fn unique_id(&self, prefix: &str, seed: &str, table: &str) -> Result<String> {
        loop {
            let id = generate_id(prefix, seed);
            let taken: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table),
                [&id],
                |row| row.get(0),
            )?;
            if taken == 0 {
                return Ok(id);
            }
        }
    }

    // === Cache helpers ===

    fn cache_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO tasks
            (id, name, task_type, category, weekly_hours, is_high_frequency, is_overcome,
             created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                task.id,
                task.name,
                task.task_type.to_string(),
                task.category,
                task.weekly_hours,
                task.is_high_frequency,
                task.is_overcome,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn cache_subtask(&self, subtask: &Subtask) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO subtasks
            (id, task_id, name, hours, is_high_frequency, is_overcome, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                subtask.id,
                subtask.task_id,
                subtask.name,
                subtask.hours,
                subtask.is_high_frequency,
                subtask.is_overcome,
                subtask.created_at.to_rfc3339(),
                subtask.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn cache_slot(&self, slot: &TimeSlot) -> Result<()> {
        let (bound_kind, bound_id) = ref_columns(&slot.bound);
        let (suggested_kind, suggested_id) = ref_columns(&slot.suggested);
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO slots
            (id, day, time_range, bound_kind, bound_id, status, mood, note,
             is_ai_recommended, ai_tip, suggested_kind, suggested_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                slot.id,
                slot.day.to_string(),
                slot.time_range,
                bound_kind,
                bound_id,
                slot.status.to_string(),
                slot.mood.map(|m| m.to_string()),
                slot.note,
                slot.is_ai_recommended,
                slot.ai_tip,
                suggested_kind,
                suggested_id,
                slot.created_at.to_rfc3339(),
                slot.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn cache_decision(&self, decision: &Decision) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO decisions (slot_id, accepted, decided_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                decision.slot_id,
                decision.accepted,
                decision.decided_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Rebuild the SQLite cache from the JSONL history files.
    pub fn rebuild_cache(&mut self) -> Result<()> {
        self.conn.execute("PRAGMA foreign_keys = OFF", [])?;

        self.conn.execute_batch(
            r#"
            DELETE FROM decisions;
            DELETE FROM slots;
            DELETE FROM subtasks;
            DELETE FROM tasks;
            "#,
        )?;

        for line in self.read_lines(TASKS_FILE)? {
            if let Ok(task) = serde_json::from_str::<Task>(&line) {
                if task.entity_type == "task" {
                    self.cache_task(&task)?;
                    continue;
                }
            }
            if let Ok(subtask) = serde_json::from_str::<Subtask>(&line) {
                if subtask.entity_type == "subtask" {
                    self.cache_subtask(&subtask)?;
                    continue;
                }
            }
            if let Ok(tomb) = serde_json::from_str::<Tombstone>(&line) {
                if tomb.entity_type == "tombstone" {
                    self.conn
                        .execute("DELETE FROM tasks WHERE id = ?1", [&tomb.id])?;
                    self.conn
                        .execute("DELETE FROM subtasks WHERE id = ?1", [&tomb.id])?;
                }
            }
        }

        for line in self.read_lines(SLOTS_FILE)? {
            if let Ok(slot) = serde_json::from_str::<TimeSlot>(&line) {
                if slot.entity_type == "slot" {
                    self.cache_slot(&slot)?;
                }
            }
        }

        for line in self.read_lines(DECISIONS_FILE)? {
            if let Ok(decision) = serde_json::from_str::<Decision>(&line) {
                self.cache_decision(&decision)?;
            }
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(())
    }

    /// Row counts per entity, for `alm system status`.
    pub fn counts(&self) -> Result<(usize, usize, usize, usize)> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };
        Ok((
            count("tasks")?,
            count("subtasks")?,
            count("slots")?,
            count("decisions")?,
        ))
    }

    // === Task operations ===

    /// Create a new task.
    ///
    /// Fails with `InvalidInput` on an empty name or negative hours.
    pub fn create_task(
        &mut self,
        name: &str,
        task_type: TaskType,
        category: Option<String>,
        weekly_hours: f64,
        is_high_frequency: bool,
        is_overcome: bool,
    ) -> Result<Task> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("task name cannot be empty".to_string()));
        }
        if weekly_hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "weekly hours cannot be negative: {}",
                weekly_hours
            )));
        }

        let id = self.unique_id(TASK_ID_PREFIX, name, "tasks")?;
        let mut task = Task::new(id, name.to_string(), task_type);
        task.category = category;
        task.weekly_hours = weekly_hours;
        task.is_high_frequency = is_high_frequency;
        task.is_overcome = is_overcome;

        self.append_record(TASKS_FILE, &task)?;
        self.cache_task(&task)?;
        Ok(task)
    }

    /// Create a task from free text: trimmed input as the name, study type,
    /// zero hours, no subtasks.
    pub fn quick_add_task(&mut self, text: &str) -> Result<Task> {
        self.create_task(text, TaskType::Study, None, 0.0, false, false)
    }

    /// Get a task by ID from the history log (latest record wins).
    pub fn get_task(&self, id: &str) -> Result<Task> {
        validate_id(id, TASK_ID_PREFIX)?;
        let mut latest: Option<Task> = None;
        for line in self.read_lines(TASKS_FILE)? {
            if let Ok(task) = serde_json::from_str::<Task>(&line) {
                if task.entity_type == "task" && task.id == id {
                    latest = Some(task);
                    continue;
                }
            }
            if let Ok(tomb) = serde_json::from_str::<Tombstone>(&line) {
                if tomb.entity_type == "tombstone" && tomb.id == id {
                    latest = None;
                }
            }
        }
        latest.ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    /// List tasks, optionally filtered by type, in insertion order.
    pub fn list_tasks(&self, task_type: Option<TaskType>) -> Result<Vec<Task>> {
        let ids: Vec<String> = match task_type {
            Some(t) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id FROM tasks WHERE task_type = ?1 ORDER BY created_at ASC",
                )?;
                let rows = stmt.query_map([t.to_string()], |row| row.get(0))?;
                rows.filter_map(|r| r.ok()).collect()
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id FROM tasks ORDER BY created_at ASC")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.filter_map(|r| r.ok()).collect()
            }
        };

        let mut tasks = Vec::new();
        for id in ids {
            tasks.push(self.get_task(&id)?);
        }
        Ok(tasks)
    }

    /// Update a task (caller sets the new field values and `updated_at`).
    pub fn update_task(&mut self, task: &Task) -> Result<()> {
        self.get_task(&task.id)?;
        if task.name.trim().is_empty() {
            return Err(Error::InvalidInput("task name cannot be empty".to_string()));
        }
        if task.weekly_hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "weekly hours cannot be negative: {}",
                task.weekly_hours
            )));
        }
        self.append_record(TASKS_FILE, task)?;
        self.cache_task(task)?;
        Ok(())
    }

    /// Delete a task, cascading to its subtasks and clearing any slot
    /// bindings that referenced them.
    ///
    /// Idempotent: deleting an unknown or already-deleted ID returns
    /// `Ok(None)`.
    pub fn delete_task(&mut self, id: &str) -> Result<Option<TaskRemoval>> {
        let task = match self.get_task(id) {
            Ok(t) => t,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let subtasks = self.list_subtasks(&task.id)?;
        let mut targets = vec![task.id.clone()];
        targets.extend(subtasks.iter().map(|s| s.id.clone()));

        let mut slots_cleared = 0;
        for target in &targets {
            for slot_id in self.slots_bound_to(target)? {
                let mut slot = self.get_slot(&slot_id)?;
                // Weak reference: clear the binding, keep the slot.
                // Empty is forced because completion without a binding
                // would violate the grid invariant.
                slot.bound = None;
                slot.status = SlotStatus::Empty;
                slot.updated_at = Utc::now();
                self.persist_slot(&slot)?;
                slots_cleared += 1;
            }
        }

        for subtask in &subtasks {
            self.append_record(TASKS_FILE, &Tombstone::new(subtask.id.clone()))?;
            self.conn
                .execute("DELETE FROM subtasks WHERE id = ?1", [&subtask.id])?;
        }
        self.append_record(TASKS_FILE, &Tombstone::new(task.id.clone()))?;
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", [&task.id])?;

        Ok(Some(TaskRemoval {
            subtasks_removed: subtasks.len(),
            slots_cleared,
        }))
    }

    /// Effective hours for a task: the subtask sum when subtasks exist,
    /// else the task's own stored value.
    pub fn effective_hours(&self, task_id: &str) -> Result<f64> {
        let task = self.get_task(task_id)?;
        let subtasks = self.list_subtasks(&task.id)?;
        if subtasks.is_empty() {
            Ok(task.weekly_hours)
        } else {
            Ok(subtasks.iter().map(|s| s.hours).sum())
        }
    }

    // === Subtask operations ===

    /// Add a subtask to a task.
    ///
    /// Fails with `NotFound` for an unknown task and `InvalidInput` for an
    /// empty name or negative hours.
    pub fn add_subtask(
        &mut self,
        task_id: &str,
        name: &str,
        hours: f64,
        is_high_frequency: bool,
        is_overcome: bool,
    ) -> Result<Subtask> {
        let task = self.get_task(task_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "subtask name cannot be empty".to_string(),
            ));
        }
        if hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "hours cannot be negative: {}",
                hours
            )));
        }

        let id = self.unique_id(SUBTASK_ID_PREFIX, name, "subtasks")?;
        let mut subtask = Subtask::new(id, task.id, name.to_string(), hours);
        subtask.is_high_frequency = is_high_frequency;
        subtask.is_overcome = is_overcome;

        self.append_record(TASKS_FILE, &subtask)?;
        self.cache_subtask(&subtask)?;
        Ok(subtask)
    }

    /// Get a subtask by ID from the history log (latest record wins).
    pub fn get_subtask(&self, id: &str) -> Result<Subtask> {
        validate_id(id, SUBTASK_ID_PREFIX)?;
        let mut latest: Option<Subtask> = None;
        for line in self.read_lines(TASKS_FILE)? {
            if let Ok(subtask) = serde_json::from_str::<Subtask>(&line) {
                if subtask.entity_type == "subtask" && subtask.id == id {
                    latest = Some(subtask);
                    continue;
                }
            }
            if let Ok(tomb) = serde_json::from_str::<Tombstone>(&line) {
                if tomb.entity_type == "tombstone" && tomb.id == id {
                    latest = None;
                }
            }
        }
        latest.ok_or_else(|| Error::NotFound(format!("Subtask not found: {}", id)))
    }

    /// List a task's subtasks in insertion order.
    pub fn list_subtasks(&self, task_id: &str) -> Result<Vec<Subtask>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM subtasks WHERE task_id = ?1 ORDER BY created_at ASC")?;
        let ids: Vec<String> = stmt
            .query_map([task_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut subtasks = Vec::new();
        for id in ids {
            subtasks.push(self.get_subtask(&id)?);
        }
        Ok(subtasks)
    }

    /// Update a subtask (caller sets the new field values and `updated_at`).
    pub fn update_subtask(&mut self, subtask: &Subtask) -> Result<()> {
        self.get_subtask(&subtask.id)?;
        if subtask.name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "subtask name cannot be empty".to_string(),
            ));
        }
        if subtask.hours < 0.0 {
            return Err(Error::InvalidInput(format!(
                "hours cannot be negative: {}",
                subtask.hours
            )));
        }
        self.append_record(TASKS_FILE, subtask)?;
        self.cache_subtask(subtask)?;
        Ok(())
    }

    /// Delete a single subtask, clearing any slot bindings that referenced
    /// it. Idempotent like `delete_task`.
    pub fn delete_subtask(&mut self, id: &str) -> Result<bool> {
        let subtask = match self.get_subtask(id) {
            Ok(s) => s,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        for slot_id in self.slots_bound_to(&subtask.id)? {
            let mut slot = self.get_slot(&slot_id)?;
            slot.bound = None;
            slot.status = SlotStatus::Empty;
            slot.updated_at = Utc::now();
            self.persist_slot(&slot)?;
        }

        self.append_record(TASKS_FILE, &Tombstone::new(subtask.id.clone()))?;
        self.conn
            .execute("DELETE FROM subtasks WHERE id = ?1", [&subtask.id])?;
        Ok(true)
    }

    // === Slot operations ===

    /// Generate the slot grid for a day from the template.
    ///
    /// Fails with `DayExists` if the day already has slots; earlier days
    /// become a read-only archive.
    pub fn generate_day(
        &mut self,
        day: NaiveDate,
        template: &SlotTemplate,
    ) -> Result<Vec<TimeSlot>> {
        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM slots WHERE day = ?1",
            [day.to_string()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(Error::DayExists(day.to_string()));
        }

        let mut slots = Vec::new();
        for range in template.time_ranges()? {
            let id = self.unique_id(SLOT_ID_PREFIX, &format!("{}{}", day, range), "slots")?;
            let slot = TimeSlot::new(id, day, range);
            self.persist_slot(&slot)?;
            slots.push(slot);
        }
        Ok(slots)
    }

    /// The most recently generated day, i.e. the one open for mutation.
    pub fn latest_day(&self) -> Result<Option<NaiveDate>> {
        let max: Option<String> =
            self.conn
                .query_row("SELECT MAX(day) FROM slots", [], |row| row.get(0))?;
        match max {
            Some(s) => Ok(Some(parse_day(&s)?)),
            None => Ok(None),
        }
    }

    /// Get a slot by ID from the history log (latest record wins).
    pub fn get_slot(&self, id: &str) -> Result<TimeSlot> {
        validate_id(id, SLOT_ID_PREFIX)?;
        let mut latest: Option<TimeSlot> = None;
        for line in self.read_lines(SLOTS_FILE)? {
            if let Ok(slot) = serde_json::from_str::<TimeSlot>(&line) {
                if slot.entity_type == "slot" && slot.id == id {
                    latest = Some(slot);
                }
            }
        }
        latest.ok_or_else(|| Error::NotFound(format!("Slot not found: {}", id)))
    }

    /// List a day's slots in chronological order.
    pub fn list_slots(&self, day: NaiveDate) -> Result<Vec<TimeSlot>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM slots WHERE day = ?1 ORDER BY time_range ASC")?;
        let ids: Vec<String> = stmt
            .query_map([day.to_string()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut slots = Vec::new();
        for id in ids {
            slots.push(self.get_slot(&id)?);
        }
        Ok(slots)
    }

    /// List slots between two days inclusive, ordered by day then time.
    pub fn slots_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TimeSlot>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM slots WHERE day >= ?1 AND day <= ?2 ORDER BY day ASC, time_range ASC",
        )?;
        let ids: Vec<String> = stmt
            .query_map([start.to_string(), end.to_string()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut slots = Vec::new();
        for id in ids {
            slots.push(self.get_slot(&id)?);
        }
        Ok(slots)
    }

    /// First empty slot of the day in chronological order, if any.
    pub fn first_empty_slot(&self, day: NaiveDate) -> Result<Option<TimeSlot>> {
        Ok(self
            .list_slots(day)?
            .into_iter()
            .find(|s| s.status == SlotStatus::Empty))
    }

    /// IDs of slots currently bound to the given task or subtask.
    fn slots_bound_to(&self, entity_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM slots WHERE bound_id = ?1")?;
        let ids = stmt
            .query_map([entity_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    /// Append the slot to the history log and refresh the cache row.
    fn persist_slot(&mut self, slot: &TimeSlot) -> Result<()> {
        self.append_record(SLOTS_FILE, slot)?;
        self.cache_slot(slot)?;
        Ok(())
    }

    /// Reject mutations against days that have been archived by a later
    /// rollover.
    fn ensure_current_day(&self, slot: &TimeSlot) -> Result<()> {
        if let Some(latest) = self.latest_day()? {
            if slot.day < latest {
                return Err(Error::InvalidInput(format!(
                    "slot {} belongs to an archived day ({})",
                    slot.id, slot.day
                )));
            }
        }
        Ok(())
    }

    /// Bind a task or subtask to a slot.
    ///
    /// An empty slot becomes pending; a bound slot has its binding replaced
    /// without touching status, mood, or note.
    pub fn bind_slot(&mut self, slot_id: &str, target: &SlotRef) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        match target {
            SlotRef::Task(id) => {
                self.get_task(id)?;
            }
            SlotRef::Subtask(id) => {
                self.get_subtask(id)?;
            }
        }

        slot.bound = Some(target.clone());
        if slot.status == SlotStatus::Empty {
            slot.status = SlotStatus::Pending;
        }
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    /// Clear a slot's binding and force it back to empty.
    ///
    /// No-op when the slot is already unbound. Mood and note survive.
    pub fn unbind_slot(&mut self, slot_id: &str) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        if slot.bound.is_none() {
            return Ok(slot);
        }

        slot.bound = None;
        slot.status = SlotStatus::Empty;
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    /// Move a pending slot to in-progress.
    ///
    /// No-op when already in progress; empty and completed slots reject
    /// the transition.
    pub fn start_slot(&mut self, slot_id: &str) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        match slot.status {
            SlotStatus::InProgress => Ok(slot),
            SlotStatus::Pending => {
                slot.status = SlotStatus::InProgress;
                slot.updated_at = Utc::now();
                self.persist_slot(&slot)?;
                Ok(slot)
            }
            status => Err(Error::InvalidTransition(format!(
                "cannot start slot {} from status {}",
                slot.id, status
            ))),
        }
    }

    /// Mark a slot completed.
    ///
    /// Idempotent on a completed slot; an empty slot rejects the transition.
    pub fn complete_slot(&mut self, slot_id: &str) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        match slot.status {
            SlotStatus::Completed => Ok(slot),
            SlotStatus::Pending | SlotStatus::InProgress => {
                slot.status = SlotStatus::Completed;
                slot.updated_at = Utc::now();
                self.persist_slot(&slot)?;
                Ok(slot)
            }
            SlotStatus::Empty => Err(Error::InvalidTransition(format!(
                "cannot complete slot {} from status empty",
                slot.id
            ))),
        }
    }

    /// Explicit undo: move a completed slot back to pending or in-progress.
    pub fn reopen_slot(&mut self, slot_id: &str, to: SlotStatus) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        if !slot.status.can_transition(to) || slot.status != SlotStatus::Completed {
            return Err(Error::InvalidTransition(format!(
                "cannot reopen slot {} from status {} to {}",
                slot.id, slot.status, to
            )));
        }
        slot.status = to;
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    /// Set or clear a slot's mood. Overwrites any prior mood.
    pub fn set_mood(&mut self, slot_id: &str, mood: Option<Mood>) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        slot.mood = mood;
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    /// Set a slot's note; empty text clears it.
    pub fn set_note(&mut self, slot_id: &str, text: &str) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        slot.note = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    /// Stamp an AI suggestion on a slot: tip text and an optional suggested
    /// task/subtask for a later `accept_recommendation` to bind.
    pub fn suggest_slot(
        &mut self,
        slot_id: &str,
        target: Option<SlotRef>,
        tip: Option<String>,
    ) -> Result<TimeSlot> {
        let mut slot = self.get_slot(slot_id)?;
        self.ensure_current_day(&slot)?;
        if let Some(ref target) = target {
            match target {
                SlotRef::Task(id) => {
                    self.get_task(id)?;
                }
                SlotRef::Subtask(id) => {
                    self.get_subtask(id)?;
                }
            }
        }
        slot.is_ai_recommended = true;
        slot.ai_tip = tip;
        slot.suggested = target;
        slot.updated_at = Utc::now();
        self.persist_slot(&slot)?;
        Ok(slot)
    }

    // === Recommendation ledger ===

    /// Record an accept/reject decision for a slot's recommendation.
    ///
    /// Last write wins for the current value; the full history is kept in
    /// decisions.jsonl.
    pub fn record_decision(&mut self, slot_id: &str, accepted: bool) -> Result<Decision> {
        self.get_slot(slot_id)?;
        let decision = Decision::new(slot_id.to_string(), accepted);
        self.append_record(DECISIONS_FILE, &decision)?;
        self.cache_decision(&decision)?;
        Ok(decision)
    }

    /// Current decision for a slot; `None` means not yet decided, which is
    /// distinct from rejected.
    pub fn decision_for(&self, slot_id: &str) -> Result<Option<Decision>> {
        let mut latest = None;
        for line in self.read_lines(DECISIONS_FILE)? {
            if let Ok(decision) = serde_json::from_str::<Decision>(&line) {
                if decision.slot_id == slot_id {
                    latest = Some(decision);
                }
            }
        }
        Ok(latest)
    }

    /// Every decision ever recorded, in the order they were made.
    pub fn decision_history(&self) -> Result<Vec<Decision>> {
        let mut history = Vec::new();
        for line in self.read_lines(DECISIONS_FILE)? {
            if let Ok(decision) = serde_json::from_str::<Decision>(&line) {
                history.push(decision);
            }
        }
        Ok(history)
    }

    /// Latest decision per slot.
    pub fn current_decisions(&self) -> Result<Vec<Decision>> {
        let mut latest: BTreeMap<String, Decision> = BTreeMap::new();
        for decision in self.decision_history()? {
            latest.insert(decision.slot_id.clone(), decision);
        }
        Ok(latest.into_values().collect())
    }

    /// Accept a slot's recommendation: bind the suggested task (when one is
    /// present) and record the acceptance, all-or-nothing.
    ///
    /// The bind runs first; the decision is only written once it has
    /// succeeded, so a failed bind (unknown slot, deleted task, archived
    /// day) leaves the ledger undecided.
    pub fn accept_recommendation(&mut self, slot_id: &str) -> Result<(Decision, Option<TimeSlot>)> {
        let slot = self.get_slot(slot_id)?;
        let bound = match slot.suggested.clone() {
            Some(target) => Some(self.bind_slot(&slot.id, &target)?),
            None => None,
        };
        let decision = self.record_decision(slot_id, true)?;
        Ok((decision, bound))
    }

    // === Config operations ===

    /// Get a configuration value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a configuration value.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// List all configuration entries.
    pub fn list_configs(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

/// Resolve the data directory for a profile.
///
/// `data_dir` (the `--data-dir` flag / `ALM_DATA_DIR`) overrides the base
/// location; the profile name is hashed into a subdirectory the same way
/// regardless.
pub fn storage_root(data_dir: Option<&Path>, profile: &str) -> Result<PathBuf> {
    let base = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?
            .join("almanac"),
    };

    let mut hasher = Sha256::new();
    hasher.update(profile.as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    let short_hash = &hash_hex[..12];

    Ok(base.join(short_hash))
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Task prefix: "alm"
/// - Subtask prefix: "alms"
/// - Slot prefix: "almt"
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
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }
    Ok(())
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::Other(format!("Invalid day in cache: {}", s)))
}

fn ref_columns(target: &Option<SlotRef>) -> (Option<&'static str>, Option<String>) {
    match target {
        Some(SlotRef::Task(id)) => (Some("task"), Some(id.clone())),
        Some(SlotRef::Subtask(id)) => (Some("subtask"), Some(id.clone())),
        None => (None, None),
    }
}
