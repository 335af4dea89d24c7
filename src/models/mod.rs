//! Data models for Almanac entities.
//!
//! This module defines the core data structures:
//! - `Task` - Recurring study/life/work/play activities with weekly hours
//! - `Subtask` - Owned children of a task, each with its own hour estimate
//! - `TimeSlot` - A fixed period in the daily grid, bound to a task and
//!   tracked through the `empty → pending → in_progress → completed` lifecycle
//! - `Decision` - An accept/reject response to an AI-suggested slot binding
//! - `Tombstone` - A deletion marker in the append-only history
//! - Derived overview types recomputed from the grid on every read

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ID prefix for tasks (e.g., "alm-a1b2").
pub const TASK_ID_PREFIX: &str = "alm";
/// ID prefix for subtasks (e.g., "alms-a1b2").
pub const SUBTASK_ID_PREFIX: &str = "alms";
/// ID prefix for time slots (e.g., "almt-a1b2").
pub const SLOT_ID_PREFIX: &str = "almt";

/// Task type used for categorizing activities and the hour-distribution chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Study,
    Life,
    Work,
    Play,
}

impl TaskType {
    /// Get all task types, in chart display order.
    pub fn all() -> &'static [TaskType] {
        &[
            TaskType::Study,
            TaskType::Life,
            TaskType::Work,
            TaskType::Play,
        ]
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Study => "study",
            TaskType::Life => "life",
            TaskType::Work => "work",
            TaskType::Play => "play",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "study" => Ok(TaskType::Study),
            "life" => Ok(TaskType::Life),
            "work" => Ok(TaskType::Work),
            "play" => Ok(TaskType::Play),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// Slot status in the daily grid lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Unbound slot; mutually exclusive with any task binding
    #[default]
    Empty,
    Pending,
    InProgress,
    Completed,
}

impl SlotStatus {
    /// Returns true if the status transition is a legal explicit move.
    ///
    /// `empty → pending` happens only through binding and `* → empty` only
    /// through unbinding, so neither appears here. `completed → pending` and
    /// `completed → in_progress` are the explicit undo moves.
    pub fn can_transition(self, to: SlotStatus) -> bool {
        use SlotStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Completed)
                | (InProgress, Completed)
                | (Completed, Pending)
                | (Completed, InProgress)
        )
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Pending => "pending",
            SlotStatus::InProgress => "in_progress",
            SlotStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "empty" => Ok(SlotStatus::Empty),
            "pending" => Ok(SlotStatus::Pending),
            "in_progress" => Ok(SlotStatus::InProgress),
            "completed" => Ok(SlotStatus::Completed),
            _ => Err(format!("Unknown slot status: {}", s)),
        }
    }
}

/// Mood recorded against a time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Focused,
    Tired,
}

impl Mood {
    /// Get all moods, in summary display order.
    pub fn all() -> &'static [Mood] {
        &[Mood::Happy, Mood::Focused, Mood::Tired]
    }

    /// Emoji shown next to the mood in human output.
    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Focused => "🎯",
            Mood::Tired => "😴",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mood::Happy => "happy",
            Mood::Focused => "focused",
            Mood::Tired => "tired",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Mood::Happy),
            "focused" => Ok(Mood::Focused),
            "tired" => Ok(Mood::Tired),
            _ => Err(format!("Unknown mood: {}", s)),
        }
    }
}

/// A discriminated reference from a slot to either a task or a subtask.
///
/// Slots hold weak references: deleting the referenced entity clears the
/// binding rather than the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SlotRef {
    Task(String),
    Subtask(String),
}

impl SlotRef {
    /// Classify a raw ID by its prefix.
    pub fn parse(id: &str) -> std::result::Result<Self, String> {
        if id.starts_with(&format!("{}-", SUBTASK_ID_PREFIX)) {
            Ok(SlotRef::Subtask(id.to_string()))
        } else if id.starts_with(&format!("{}-", TASK_ID_PREFIX)) {
            Ok(SlotRef::Task(id.to_string()))
        } else {
            Err(format!("Expected a task or subtask ID, got: {}", id))
        }
    }

    /// The referenced entity's ID.
    pub fn id(&self) -> &str {
        match self {
            SlotRef::Task(id) | SlotRef::Subtask(id) => id,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A recurring activity tracked by Almanac.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (e.g., "alm-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Task name
    pub name: String,

    /// Activity type
    #[serde(default)]
    pub task_type: TaskType,

    /// Optional display category label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Planned hours per week; superseded by the subtask sum when subtasks exist
    #[serde(default)]
    pub weekly_hours: f64,

    /// Marks a heavily recurring task (presentation flag)
    #[serde(default)]
    pub is_high_frequency: bool,

    /// Marks a task the user is behind on (presentation flag)
    #[serde(default)]
    pub is_overcome: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with the given ID, name, and type.
    pub fn new(id: String, name: String, task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type: "task".to_string(),
            name,
            task_type,
            category: None,
            weekly_hours: 0.0,
            is_high_frequency: false,
            is_overcome: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A child activity owned by a task; deleted with its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Unique identifier (e.g., "alms-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Owning task ID
    pub task_id: String,

    /// Subtask name
    pub name: String,

    /// Planned hours; contributes to the parent's effective hours
    #[serde(default)]
    pub hours: f64,

    /// Marks a heavily recurring subtask (presentation flag)
    #[serde(default)]
    pub is_high_frequency: bool,

    /// Marks a subtask the user is behind on (presentation flag)
    #[serde(default)]
    pub is_overcome: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    /// Create a new subtask under the given task.
    pub fn new(id: String, task_id: String, name: String, hours: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type: "subtask".to_string(),
            task_id,
            name,
            hours,
            is_high_frequency: false,
            is_overcome: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A deletion marker appended to the history log.
///
/// The JSONL logs are append-only; tombstones are what keep a rebuilt cache
/// from resurrecting deleted entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tombstone {
    /// ID of the deleted entity
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Deletion timestamp
    pub deleted_at: DateTime<Utc>,
}

impl Tombstone {
    /// Create a tombstone for the given entity ID.
    pub fn new(id: String) -> Self {
        Self {
            id,
            entity_type: "tombstone".to_string(),
            deleted_at: Utc::now(),
        }
    }
}

/// A fixed period in the daily schedule grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique identifier (e.g., "almt-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Day this slot belongs to
    pub day: NaiveDate,

    /// Period within the day, formatted "HH:MM-HH:MM"
    pub time_range: String,

    /// Bound task or subtask; `None` exactly when status is `empty`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<SlotRef>,

    /// Current lifecycle status
    #[serde(default)]
    pub status: SlotStatus,

    /// Mood recorded for this slot, at most one at a time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,

    /// Free-form note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Whether the AI collaborator has stamped a suggestion on this slot
    #[serde(default)]
    pub is_ai_recommended: bool,

    /// Tip text attached to the AI suggestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_tip: Option<String>,

    /// Task or subtask the AI suggested binding; target of an accepted
    /// recommendation. Not cleared by entity deletion (the accept step
    /// surfaces the dangling reference instead).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<SlotRef>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TimeSlot {
    /// Create a new empty slot for the given day and time range.
    pub fn new(id: String, day: NaiveDate, time_range: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type: "slot".to_string(),
            day,
            time_range,
            bound: None,
            status: SlotStatus::Empty,
            mood: None,
            note: None,
            is_ai_recommended: false,
            ai_tip: None,
            suggested: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Duration of the slot's time range in hours.
    ///
    /// Returns `None` for a malformed or non-positive range.
    pub fn duration_hours(&self) -> Option<f64> {
        let (start, end) = self.time_range.split_once('-')?;
        let start = NaiveTime::parse_from_str(start, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end, "%H:%M").ok()?;
        let minutes = (end - start).num_minutes();
        if minutes <= 0 {
            return None;
        }
        Some(minutes as f64 / 60.0)
    }
}

/// An accept/reject decision against an AI-suggested slot binding.
///
/// Tracked independently of the slot's completion status; the current value
/// is last-write-wins while every decision stays in the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Slot the decision applies to
    pub slot_id: String,

    /// True for accepted, false for rejected
    pub accepted: bool,

    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

impl Decision {
    /// Create a decision for the given slot.
    pub fn new(slot_id: String, accepted: bool) -> Self {
        Self {
            slot_id,
            accepted,
            decided_at: Utc::now(),
        }
    }
}

/// Weekly completion overview, derived from the grid on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyOverview {
    /// First day (Monday) of the ISO week
    pub week_start: NaiveDate,
    /// Last day (Sunday) of the ISO week
    pub week_end: NaiveDate,
    /// Hours covered by completed slots, one decimal
    pub total_study_hours: f64,
    /// Number of completed slots
    pub completed_slots: usize,
    /// Total number of slots in the week
    pub total_slots: usize,
    /// completed / total in [0, 1]; 0 when the week has no slots
    pub completion_rate: f64,
    /// Number of in-progress slots
    pub in_progress_slots: usize,
}

/// Single-day schedule overview, derived from the grid on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOverview {
    pub date: NaiveDate,
    pub total_slots: usize,
    pub completed_slots: usize,
    pub in_progress_slots: usize,
    pub pending_slots: usize,
    pub empty_slots: usize,
    /// completed / total in [0, 1]; 0 when the day has no slots
    pub completion_rate: f64,
    /// Hours covered by completed slots, one decimal
    pub total_study_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_serialization_roundtrip() {
        let task = Task::new(
            "alm-test".to_string(),
            "Read English".to_string(),
            TaskType::Study,
        );
        let json = serde_json::to_string(&task).unwrap();
        let deserialized: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task.id, deserialized.id);
        assert_eq!(task.name, deserialized.name);
        assert_eq!(deserialized.task_type, TaskType::Study);
        assert_eq!(deserialized.entity_type, "task");
    }

    #[test]
    fn test_task_type_serialization() {
        let json = serde_json::to_string(&TaskType::Play).unwrap();
        assert_eq!(json, r#""play""#);
        assert_eq!("life".parse::<TaskType>().unwrap(), TaskType::Life);
        assert!("gaming".parse::<TaskType>().is_err());
    }

    #[test]
    fn test_slot_status_serialization() {
        let json = serde_json::to_string(&SlotStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
        let status: SlotStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, SlotStatus::InProgress);
    }

    #[test]
    fn test_slot_status_transitions() {
        use SlotStatus::*;
        assert!(Pending.can_transition(InProgress));
        assert!(Pending.can_transition(Completed));
        assert!(InProgress.can_transition(Completed));
        // Explicit undo moves
        assert!(Completed.can_transition(Pending));
        assert!(Completed.can_transition(InProgress));
        // Empty enters and leaves only via bind/unbind
        assert!(!Empty.can_transition(InProgress));
        assert!(!Empty.can_transition(Completed));
        assert!(!Pending.can_transition(Empty));
        assert!(!InProgress.can_transition(Pending));
    }

    #[test]
    fn test_mood_from_str_and_emoji() {
        assert_eq!("focused".parse::<Mood>().unwrap(), Mood::Focused);
        assert!("stressed".parse::<Mood>().is_err());
        assert_eq!(Mood::Tired.emoji(), "😴");
    }

    #[test]
    fn test_slot_ref_parse() {
        assert_eq!(
            SlotRef::parse("alm-a1b2").unwrap(),
            SlotRef::Task("alm-a1b2".to_string())
        );
        assert_eq!(
            SlotRef::parse("alms-a1b2").unwrap(),
            SlotRef::Subtask("alms-a1b2".to_string())
        );
        assert!(SlotRef::parse("almt-a1b2").is_err());
        assert!(SlotRef::parse("bogus").is_err());
    }

    #[test]
    fn test_slot_ref_serialization() {
        let r = SlotRef::Subtask("alms-0001".to_string());
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"kind":"subtask","id":"alms-0001"}"#);
        let back: SlotRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_slot_serialization_roundtrip() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let mut slot = TimeSlot::new("almt-0700".to_string(), day, "07:00-08:00".to_string());
        slot.bound = Some(SlotRef::Task("alm-a1b2".to_string()));
        slot.status = SlotStatus::Pending;
        slot.mood = Some(Mood::Happy);
        let json = serde_json::to_string(&slot).unwrap();
        let deserialized: TimeSlot = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, slot.id);
        assert_eq!(deserialized.day, day);
        assert_eq!(deserialized.bound, slot.bound);
        assert_eq!(deserialized.status, SlotStatus::Pending);
        assert_eq!(deserialized.mood, Some(Mood::Happy));
    }

    #[test]
    fn test_slot_optional_fields_default() {
        let json = r#"{"id":"almt-1","type":"slot","day":"2026-08-05","time_range":"07:00-08:00","created_at":"2026-08-05T00:00:00Z","updated_at":"2026-08-05T00:00:00Z"}"#;
        let slot: TimeSlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot.status, SlotStatus::Empty);
        assert!(slot.bound.is_none());
        assert!(slot.mood.is_none());
        assert!(!slot.is_ai_recommended);
    }

    #[test]
    fn test_slot_duration_hours() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let slot = TimeSlot::new("almt-1".to_string(), day, "07:00-08:30".to_string());
        assert_eq!(slot.duration_hours(), Some(1.5));

        let bad = TimeSlot::new("almt-2".to_string(), day, "eight-ish".to_string());
        assert_eq!(bad.duration_hours(), None);

        let reversed = TimeSlot::new("almt-3".to_string(), day, "09:00-08:00".to_string());
        assert_eq!(reversed.duration_hours(), None);
    }

    #[test]
    fn test_decision_serialization_roundtrip() {
        let decision = Decision::new("almt-0700".to_string(), false);
        let json = serde_json::to_string(&decision).unwrap();
        let deserialized: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.slot_id, "almt-0700");
        assert!(!deserialized.accepted);
    }

    #[test]
    fn test_tombstone_serialization() {
        let tomb = Tombstone::new("alm-dead".to_string());
        let json = serde_json::to_string(&tomb).unwrap();
        assert!(json.contains(r#""type":"tombstone""#));
        let back: Tombstone = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "alm-dead");
    }
}
