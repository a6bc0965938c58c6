/// Tool for updating existing habits
///
/// This module implements the habit_update tool. Only the fields present in
/// the request change; sending `null` for a nullable field clears it.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use crate::clock::Clock;
use crate::domain::{Frequency, HabitChanges, UserId};
use crate::storage::HabitStorage;
use crate::tools::{load_owned_habit, parse_category, parse_habit_id, HabitResponse, ToolError};

/// Parameters for updating an existing habit
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    pub habit_id: String,
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schemars(with = "Option<String>")]
    pub description: Option<Option<String>>,
    /// Changing the frequency reschedules the habit from now
    pub frequency: Option<String>,
    /// Changing the target days reschedules the habit from now
    #[serde(default, deserialize_with = "present")]
    #[schemars(with = "Option<Vec<u8>>")]
    pub target_days: Option<Option<Vec<u8>>>,
    pub target_count: Option<u32>,
    #[serde(default, deserialize_with = "present")]
    #[schemars(with = "Option<String>")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schemars(with = "Option<String>")]
    pub icon: Option<Option<String>>,
}

/// Distinguish an explicit `null` (`Some(None)`) from an absent field (`None`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Update a habit owned by `user`
pub fn update_habit<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: UpdateHabitParams,
) -> Result<HabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let mut habit = load_owned_habit(storage, user, &habit_id)?;

    let changes = HabitChanges {
        name: params.name,
        emoji: params.emoji,
        category: params.category.as_deref().map(parse_category).transpose()?,
        description: params.description,
        frequency: params.frequency.as_deref().map(Frequency::parse_lenient),
        target_days: params.target_days,
        target_count: params.target_count,
        color: params.color,
        icon: params.icon,
    };
    let rescheduled = changes.touches_schedule();

    habit.apply_changes(changes, clock.now())?;
    storage.update_habit(&habit)?;

    if rescheduled {
        tracing::debug!("Habit {} rescheduled, next due {}", habit.id, habit.next_due_at);
    }

    Ok(HabitResponse {
        message: format!("{} Updated habit '{}'", habit.emoji, habit.name),
        habit,
    })
}
