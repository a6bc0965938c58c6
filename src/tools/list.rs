/// Tools for reading habits
///
/// This module implements the habit_get and habit_list tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::domain::{Habit, UserId};
use crate::storage::HabitStorage;
use crate::tools::{load_owned_habit, parse_category, parse_habit_id, HabitResponse, ToolError};

/// Parameters for fetching one habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetHabitParams {
    pub habit_id: String,
}

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListHabitsParams {
    /// Only habits in this category
    pub category: Option<String>,
    /// "created_at" (newest first, default), "name", "streak" or "next_due"
    pub sort_by: Option<String>,
}

/// Response from listing habits
#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<Habit>,
    pub count: usize,
    /// Habits whose next due date has already passed
    pub due_now: usize,
}

/// Fetch a single habit owned by `user`
pub fn get_habit<S: HabitStorage>(
    storage: &S,
    user: &UserId,
    params: GetHabitParams,
) -> Result<HabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, user, &habit_id)?;

    Ok(HabitResponse {
        message: format!(
            "{} {}: {}",
            habit.emoji,
            habit.name,
            habit.streak_state().motivational_message()
        ),
        habit,
    })
}

/// List the habits owned by `user`
pub fn list_habits<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: ListHabitsParams,
) -> Result<ListHabitsResponse, ToolError> {
    let category = params.category.as_deref().map(parse_category).transpose()?;
    let mut habits = storage.list_habits_by_user(user, category)?;

    match params.sort_by.as_deref().map(str::trim) {
        None | Some("") | Some("created_at") => {}
        Some("name") => habits.sort_by_key(|h| h.name.to_lowercase()),
        Some("streak") => habits.sort_by(|a, b| b.streak.cmp(&a.streak)),
        Some("next_due") => habits.sort_by_key(|h| h.next_due_at),
        Some(other) => {
            return Err(ToolError::InvalidInput(format!(
                "Invalid sort_by '{}'. Valid options: created_at, name, streak, next_due",
                other
            )))
        }
    }

    let now = clock.now();
    let due_now = habits.iter().filter(|h| h.next_due_at <= now).count();

    Ok(ListHabitsResponse {
        count: habits.len(),
        due_now,
        habits,
    })
}
