/// Tool for seeding a new user's habits
///
/// This module implements the habit_seed_starters tool, which creates a small
/// set of recommended daily habits.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::clock::Clock;
use crate::domain::{Category, Frequency, Habit, NewHabit, UserId};
use crate::storage::HabitStorage;
use crate::tools::{ListHabitsResponse, ToolError};

/// The starter habits take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SeedStartersParams {}

const STARTER_HABITS: [(&str, &str, Category, &str); 5] = [
    ("Morning Routine", "🌅", Category::Productivity, "Complete your morning routine"),
    ("Deep Work", "🧠", Category::Productivity, "Focus on deep work without distractions"),
    ("Reading", "📚", Category::Learning, "Read books or articles"),
    ("Writing", "✍️", Category::Creative, "Write something creative or journaling"),
    ("Exercise", "🏋️", Category::Fitness, "Do some physical exercise"),
];

/// Create the starter habits for `user`
///
/// Every call creates a fresh set; callers decide whether a user needs them.
pub fn seed_starter_habits<S: HabitStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    _params: SeedStartersParams,
) -> Result<ListHabitsResponse, ToolError> {
    let now = clock.now();
    let mut habits = Vec::with_capacity(STARTER_HABITS.len());

    for (name, emoji, category, description) in STARTER_HABITS {
        let habit = Habit::new(
            user.clone(),
            NewHabit {
                name: name.to_string(),
                emoji: Some(emoji.to_string()),
                category,
                description: Some(description.to_string()),
                frequency: Frequency::Daily,
                target_count: Some(1),
                ..Default::default()
            },
            now,
        )?;
        storage.create_habit(&habit)?;
        habits.push(habit);
    }

    tracing::info!("Seeded {} starter habits for {}", habits.len(), user);

    Ok(ListHabitsResponse {
        count: habits.len(),
        due_now: 0,
        habits,
    })
}
