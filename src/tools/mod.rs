/// Tools exposed over the JSON-RPC interface
///
/// Each tool is a plain function taking the storage it works on, the clock,
/// the acting user and its deserialized parameters. The server module maps
/// tool names to these functions; nothing here knows about the wire format.

pub mod complete;
pub mod create;
pub mod delete;
pub mod list;
pub mod palette;
pub mod starters;
pub mod stats;
pub mod update;

// Re-export tool functions for easy access
pub use complete::*;
pub use create::*;
pub use delete::*;
pub use list::*;
pub use palette::*;
pub use starters::*;
pub use stats::*;
pub use update::*;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{start_of_day, Category, DomainError, Habit, HabitId, UserId};
use crate::storage::{HabitStorage, StorageError};

/// Errors a tool can report back to the caller
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A habit plus a human-readable summary of what happened to it
#[derive(Debug, Serialize)]
pub struct HabitResponse {
    pub habit: Habit,
    pub message: String,
}

pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::InvalidInput("Habit ID cannot be empty".to_string()));
    }
    HabitId::from_string(raw)
        .map_err(|_| ToolError::InvalidInput(format!("Invalid habit ID format: '{}'", raw)))
}

pub(crate) fn parse_category(raw: &str) -> Result<Category, ToolError> {
    raw.parse::<Category>().map_err(|_| {
        let valid: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        ToolError::InvalidInput(format!(
            "Invalid category '{}'. Valid options: {}",
            raw,
            valid.join(", ")
        ))
    })
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (taken as
/// midnight UTC)
///
/// The offset of an RFC 3339 timestamp is kept: it decides which calendar
/// day the moment belongs to.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, ToolError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| DateTime::<FixedOffset>::from(start_of_day(date)))
        .map_err(|_| {
            ToolError::InvalidInput(format!(
                "Invalid date '{}'. Use RFC 3339 or YYYY-MM-DD",
                raw
            ))
        })
}

/// Load a habit the acting user owns
///
/// Another user's habit is reported exactly like a missing one.
pub(crate) fn load_owned_habit<S: HabitStorage>(
    storage: &S,
    user: &UserId,
    habit_id: &HabitId,
) -> Result<Habit, ToolError> {
    let habit = storage.get_habit(habit_id)?;
    if &habit.user_id != user {
        tracing::debug!("User {} asked for habit {} owned by someone else", user, habit_id);
        return Err(StorageError::HabitNotFound {
            habit_id: habit_id.to_string(),
        }
        .into());
    }
    Ok(habit)
}
