/// Tool for recording habit completions
///
/// This module implements the habit_complete tool. A completion re-derives
/// the habit's streak from its whole history and moves the next due date;
/// the new completion and the updated habit are written in one transaction.

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::domain::{Completion, Habit, UserId};
use crate::storage::HabitStorage;
use crate::tools::{load_owned_habit, parse_habit_id, parse_timestamp, ToolError};

/// Parameters for completing a habit
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CompleteHabitParams {
    pub habit_id: String,
    /// RFC 3339 timestamp or YYYY-MM-DD; defaults to now. The offset
    /// decides which local day the completion counts for.
    pub completed_at: Option<String>,
    /// How many times it was done, default 1
    pub count: Option<u32>,
    pub notes: Option<String>,
}

/// Response from completing a habit
#[derive(Debug, Serialize)]
pub struct CompleteHabitResponse {
    pub habit: Habit,
    pub completion: Completion,
    pub message: String,
}

/// Record a completion of a habit owned by `user`
pub fn complete_habit<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: CompleteHabitParams,
) -> Result<CompleteHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let mut habit = load_owned_habit(storage, user, &habit_id)?;

    let now = clock.now();
    let completed_at = params
        .completed_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?
        .unwrap_or_else(|| now.into());

    let completion = Completion::new(
        habit_id.clone(),
        user.clone(),
        completed_at,
        params.count,
        params.notes,
        now,
    )?;

    let mut history: Vec<DateTime<FixedOffset>> = storage
        .list_completions(&habit_id)?
        .iter()
        .map(|c| c.completed_at)
        .collect();
    history.push(completion.completed_at);

    let streak = habit.record_completion(&history, now);
    storage.record_completion(&completion, &habit)?;

    tracing::info!(
        "Completed habit '{}' ({}): streak {}, longest {}",
        habit.name,
        habit.id,
        streak.current_streak,
        streak.longest_streak
    );

    Ok(CompleteHabitResponse {
        message: format!("{} {}", habit.emoji, streak.motivational_message()),
        habit,
        completion,
    })
}
