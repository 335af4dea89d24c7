//! Statistics aggregation.
//!
//! Every function here is a pure function of rows loaded from storage; the
//! derived views are recomputed on every read and never cached across
//! mutations, so they cannot go stale independently of the source data.
//! Hour values keep full precision throughout aggregation; rounding to one
//! decimal happens only at the presentation boundary via [`round1`].

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::{Decision, DayOverview, Mood, SlotStatus, TaskType, TimeSlot, WeeklyOverview};

/// Hours attributed to one task type, for the proportion chart.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryHours {
    pub task_type: TaskType,
    pub hours: f64,
}

/// One row of the high-frequency / overcome reports.
#[derive(Debug, Clone, Serialize)]
pub struct FlagEntry {
    pub id: String,
    pub name: String,
    /// "task" or "subtask"
    pub kind: &'static str,
    /// Effective hours for tasks, own hours for subtasks
    pub hours: f64,
    pub created_at: DateTime<Utc>,
}

/// Completed hours attributed to one task over a period.
#[derive(Debug, Clone, Serialize)]
pub struct TaskHours {
    pub task_id: String,
    pub name: String,
    pub hours: f64,
}

/// "n/m" style completion summary for flagged slots.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FlagCompletion {
    pub completed: usize,
    pub total: usize,
}

/// Count of one mood across a set of slots.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MoodCount {
    pub mood: Mood,
    pub count: usize,
}

/// Mood distribution over a set of slots.
#[derive(Debug, Clone, Serialize)]
pub struct MoodSummary {
    pub distribution: Vec<MoodCount>,
    pub dominant_mood: Option<Mood>,
    pub total_records: usize,
}

/// Round to one decimal place. Presentation only.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Monday and Sunday of the ISO week containing the given date.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week = date.week(Weekday::Mon);
    (week.first_day(), week.last_day())
}

/// Hours covered by a completed slot; unparseable ranges count as zero.
fn completed_hours(slot: &TimeSlot) -> f64 {
    if slot.status == SlotStatus::Completed {
        slot.duration_hours().unwrap_or(0.0)
    } else {
        0.0
    }
}

/// Weekly completion overview over the given week's slots.
pub fn weekly_overview(
    slots: &[TimeSlot],
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> WeeklyOverview {
    let total_slots = slots.len();
    let completed_slots = slots
        .iter()
        .filter(|s| s.status == SlotStatus::Completed)
        .count();
    let in_progress_slots = slots
        .iter()
        .filter(|s| s.status == SlotStatus::InProgress)
        .count();
    let completion_rate = if total_slots > 0 {
        completed_slots as f64 / total_slots as f64
    } else {
        0.0
    };
    let total_study_hours = slots.iter().map(completed_hours).sum();

    WeeklyOverview {
        week_start,
        week_end,
        total_study_hours,
        completed_slots,
        total_slots,
        completion_rate,
        in_progress_slots,
    }
}

/// Single-day overview over the given day's slots.
pub fn day_overview(date: NaiveDate, slots: &[TimeSlot]) -> DayOverview {
    let total_slots = slots.len();
    let count = |status: SlotStatus| slots.iter().filter(|s| s.status == status).count();
    let completed_slots = count(SlotStatus::Completed);
    let completion_rate = if total_slots > 0 {
        completed_slots as f64 / total_slots as f64
    } else {
        0.0
    };

    DayOverview {
        date,
        total_slots,
        completed_slots,
        in_progress_slots: count(SlotStatus::InProgress),
        pending_slots: count(SlotStatus::Pending),
        empty_slots: count(SlotStatus::Empty),
        completion_rate,
        total_study_hours: slots.iter().map(completed_hours).sum(),
    }
}

/// Sum effective hours per task type.
///
/// Every type appears in the result, zero-valued types included, so chart
/// consumers can render empty categories consistently.
pub fn category_hours(entries: &[(TaskType, f64)]) -> Vec<CategoryHours> {
    let mut sums: HashMap<TaskType, f64> = HashMap::new();
    for (task_type, hours) in entries {
        *sums.entry(*task_type).or_insert(0.0) += hours;
    }

    TaskType::all()
        .iter()
        .map(|t| CategoryHours {
            task_type: *t,
            hours: sums.get(t).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Order flag-report entries: effective hours descending, ties broken by
/// creation order.
pub fn sort_flag_entries(mut entries: Vec<FlagEntry>) -> Vec<FlagEntry> {
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    // Stable sort keeps the creation order within equal hours
    entries.sort_by(|a, b| b.hours.partial_cmp(&a.hours).unwrap_or(std::cmp::Ordering::Equal));
    entries
}

/// Completed hours per task over the given slots.
///
/// `owners` maps each bindable entity ID (task or subtask) to the owning
/// task's `(id, name)`, so subtask-bound slots roll up into their parent.
pub fn weekly_task_hours(
    slots: &[TimeSlot],
    owners: &HashMap<String, (String, String)>,
) -> Vec<TaskHours> {
    let mut sums: HashMap<String, (String, f64)> = HashMap::new();
    for slot in slots {
        let hours = completed_hours(slot);
        if hours == 0.0 {
            continue;
        }
        let Some(bound) = &slot.bound else { continue };
        let Some((task_id, name)) = owners.get(bound.id()) else {
            continue;
        };
        let entry = sums
            .entry(task_id.clone())
            .or_insert_with(|| (name.clone(), 0.0));
        entry.1 += hours;
    }

    let mut rows: Vec<TaskHours> = sums
        .into_iter()
        .map(|(task_id, (name, hours))| TaskHours {
            task_id,
            name,
            hours,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.hours
            .partial_cmp(&a.hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows
}

/// Completion summary for slots bound to flagged entities.
pub fn flag_completion(slots: &[TimeSlot], flagged_ids: &HashSet<String>) -> FlagCompletion {
    let flagged: Vec<&TimeSlot> = slots
        .iter()
        .filter(|s| {
            s.bound
                .as_ref()
                .is_some_and(|b| flagged_ids.contains(b.id()))
        })
        .collect();
    FlagCompletion {
        completed: flagged
            .iter()
            .filter(|s| s.status == SlotStatus::Completed)
            .count(),
        total: flagged.len(),
    }
}

/// Share of recorded decisions that are acceptances, as a whole percent.
/// Zero when nothing has been decided.
pub fn ai_accept_rate(decisions: &[Decision]) -> u32 {
    if decisions.is_empty() {
        return 0;
    }
    let accepted = decisions.iter().filter(|d| d.accepted).count();
    (accepted * 100 / decisions.len()) as u32
}

/// Mood distribution over the given slots.
///
/// Every mood appears in the distribution, zero counts included; the
/// dominant mood is the most frequent one, earlier moods winning ties.
pub fn mood_summary(slots: &[TimeSlot]) -> MoodSummary {
    let mut counts: HashMap<Mood, usize> = HashMap::new();
    for slot in slots {
        if let Some(mood) = slot.mood {
            *counts.entry(mood).or_insert(0) += 1;
        }
    }

    let distribution: Vec<MoodCount> = Mood::all()
        .iter()
        .map(|m| MoodCount {
            mood: *m,
            count: counts.get(m).copied().unwrap_or(0),
        })
        .collect();
    let total_records = distribution.iter().map(|c| c.count).sum();
    // max_by_key keeps the last maximum, so reverse to let earlier moods
    // win ties
    let dominant_mood = distribution
        .iter()
        .filter(|c| c.count > 0)
        .rev()
        .max_by_key(|c| c.count)
        .map(|c| c.mood);

    MoodSummary {
        distribution,
        dominant_mood,
        total_records,
    }
}
