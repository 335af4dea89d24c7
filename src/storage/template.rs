//! Slot template configuration.
//!
//! The template controls how `alm day rollover` carves a day into slots.
//! It lives in `config.toml` inside the profile's data directory so each
//! profile can keep its own waking hours.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Error, Result};

const CONFIG_FILE: &str = "config.toml";

/// Grid template for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotTemplate {
    /// First slot starts here, "HH:MM"
    #[serde(default = "default_day_start")]
    pub day_start: String,

    /// No slot extends past this, "HH:MM"
    #[serde(default = "default_day_end")]
    pub day_end: String,

    /// Length of each slot in minutes
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

fn default_day_start() -> String {
    "07:00".to_string()
}

fn default_day_end() -> String {
    "23:00".to_string()
}

fn default_slot_minutes() -> u32 {
    60
}

impl Default for SlotTemplate {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

impl SlotTemplate {
    /// Load the template from `config.toml` under the given data directory.
    ///
    /// A missing file yields the default template.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::Other(format!("Invalid {}: {}", CONFIG_FILE, e)))
    }

    /// Write the template to `config.toml` under the given data directory.
    pub fn save(&self, root: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Other(format!("Could not serialize template: {}", e)))?;
        fs::write(root.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Expand the template into "HH:MM-HH:MM" ranges for one day.
    ///
    /// Ranges are non-overlapping and chronologically ordered; the last one
    /// ends at or before `day_end`.
    pub fn time_ranges(&self) -> Result<Vec<String>> {
        if self.slot_minutes == 0 {
            return Err(Error::InvalidInput(
                "slot_minutes must be greater than zero".to_string(),
            ));
        }
        let start = parse_time(&self.day_start)?;
        let end = parse_time(&self.day_end)?;
        if end <= start {
            return Err(Error::InvalidInput(format!(
                "day_end {} is not after day_start {}",
                self.day_end, self.day_start
            )));
        }

        let step = chrono::Duration::minutes(self.slot_minutes as i64);
        let mut ranges = Vec::new();
        let mut cursor = start;
        loop {
            let next = cursor + step;
            // Guard against wrap-around past midnight
            if next > end || next <= cursor {
                break;
            }
            ranges.push(format!(
                "{}-{}",
                cursor.format("%H:%M"),
                next.format("%H:%M")
            ));
            cursor = next;
        }

        if ranges.is_empty() {
            return Err(Error::InvalidInput(format!(
                "template produces no slots ({} to {} in {}-minute steps)",
                self.day_start, self.day_end, self.slot_minutes
            )));
        }
        Ok(ranges)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| Error::InvalidInput(format!("Invalid time of day: {} (expected HH:MM)", s)))
}
