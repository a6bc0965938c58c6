/// Tool for creating new habits
///
/// This module implements the habit_create tool.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::clock::Clock;
use crate::domain::{Frequency, Habit, NewHabit, UserId};
use crate::storage::HabitStorage;
use crate::tools::{parse_category, HabitResponse, ToolError};

/// Parameters for creating a new habit
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Display name, 1 to 100 characters
    pub name: String,
    /// Defaults to ✅
    pub emoji: Option<String>,
    /// productivity, health, fitness, learning, mindfulness, social, creative or custom
    pub category: Option<String>,
    pub description: Option<String>,
    /// daily, weekly, monthly or custom (default daily)
    pub frequency: Option<String>,
    /// Weekday indices for weekly habits, 0 = Monday .. 6 = Sunday
    pub target_days: Option<Vec<u8>>,
    /// Times per occurrence, default 1
    pub target_count: Option<u32>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl CreateHabitParams {
    pub(crate) fn into_new_habit(self) -> Result<NewHabit, ToolError> {
        let category = self
            .category
            .as_deref()
            .map(parse_category)
            .transpose()?
            .unwrap_or_default();
        let frequency = self
            .frequency
            .as_deref()
            .map(Frequency::parse_lenient)
            .unwrap_or_default();

        Ok(NewHabit {
            name: self.name,
            emoji: self.emoji,
            category,
            description: self.description,
            frequency,
            target_days: self.target_days,
            target_count: self.target_count,
            color: self.color,
            icon: self.icon,
        })
    }
}

/// Create a new habit for `user`
pub fn create_habit<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: CreateHabitParams,
) -> Result<HabitResponse, ToolError> {
    let habit = Habit::new(user.clone(), params.into_new_habit()?, clock.now())?;
    storage.create_habit(&habit)?;

    tracing::info!("Created habit '{}' ({}) for {}", habit.name, habit.id, user);

    Ok(HabitResponse {
        message: format!("{} Created habit '{}'! Ready to start your streak!", habit.emoji, habit.name),
        habit,
    })
}
