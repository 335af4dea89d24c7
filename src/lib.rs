//! Almanac - a schedule and task analytics engine for study planning.
//!
//! This library provides the core functionality for the `alm` CLI tool:
//! task and subtask management, the daily time-slot grid, AI-recommendation
//! decisions, and weekly statistics.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod models;
pub mod stats;
pub mod storage;


/// Library-level error type for Almanac operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `alm system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid slot transition: {0}")]
    InvalidTransition(String),

    #[error("No empty slot available in today's schedule")]
    NoEmptySlot,

    #[error("Slots already generated for {0}")]
    DayExists(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Almanac operations.
pub type Result<T> = std::result::Result<T, Error>;
