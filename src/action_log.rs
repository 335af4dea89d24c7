//! Action logging for Almanac commands.
//!
//! Every CLI invocation is appended to a structured JSONL log next to the
//! profile's data, so a session can be audited or replayed later.

use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "task add", "slot done")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the configured log file.
///
/// This function never fails - it silently falls back on errors to avoid
/// breaking commands due to logging issues.
pub fn log_action(
    root: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check if logging is enabled
    let enabled = match get_config_bool(root, "action_log_enabled") {
        Ok(Some(val)) => val,
        Ok(None) => true, // Default: enabled
        Err(_) => true,   // On error, assume enabled
    };

    if !enabled {
        return Ok(());
    }

    let log_path = match get_log_path(root) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Warning: Failed to get action log path: {}", e);
            return Ok(());
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }

    Ok(())
}

/// Get the log file path from configuration.
fn get_log_path(root: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try to get custom path from config
    let custom_path = match Storage::open(root) {
        Ok(storage) => storage.get_config("action_log_path").ok().flatten(),
        Err(_) => None,
    };

    if let Some(path_str) = custom_path {
        return Ok(expand_home(&PathBuf::from(path_str)));
    }

    // Default path: <profile root>/action.log
    Ok(root.join("action.log"))
}

/// Expand ~ in path to home directory.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// Sanitize arguments to remove sensitive data.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if key_lower.contains("password")
                    || key_lower.contains("token")
                    || key_lower.contains("secret")
                {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
        }
        serde_json::Value::String(s) => {
            // Truncate long strings
            if s.len() > 200 {
                serde_json::Value::String(format!("{}... ({} chars)", &s[..197], s.len()))
            } else {
                args.clone()
            }
        }
        _ => args.clone(),
    }
}

/// Get a boolean configuration value.
fn get_config_bool(root: &Path, key: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    let storage = Storage::open(root)?;
    if let Some(value_str) = storage.get_config(key)? {
        let parsed = value_str.to_lowercase();
        let bool_val = parsed == "true" || parsed == "1" || parsed == "yes";
        Ok(Some(bool_val))
    } else {
        Ok(None)
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
