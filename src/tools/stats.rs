/// Tool for per-habit statistics
///
/// This module implements the habit_stats tool.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::analytics::{compute_stats, HabitStats};
use crate::clock::Clock;
use crate::domain::UserId;
use crate::storage::HabitStorage;
use crate::tools::{load_owned_habit, parse_habit_id, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HabitStatsParams {
    pub habit_id: String,
}

/// Statistics for a habit owned by `user`
pub fn habit_stats<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: HabitStatsParams,
) -> Result<HabitStats, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, user, &habit_id)?;
    let completions = storage.list_completions(&habit_id)?;

    Ok(compute_stats(&habit, &completions, clock.now()))
}
