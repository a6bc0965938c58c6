/// Per-habit statistics
///
/// Derives completion rates and weekday distributions from a habit and its
/// completion history. Streak values are read from the habit as stored; the
/// streak engine owns them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{weekday_index, Completion, Habit, HabitId};

/// Statistics reported for a single habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Completions per elapsed day since creation, as a percentage.
    /// Can exceed 100 when a habit is completed several times a day.
    pub completion_rate: f64,
    pub total_completions: u32,
    /// Weekday index ("0" = Monday .. "6" = Sunday) to completion count.
    /// All seven keys are always present.
    pub completions_by_day: BTreeMap<String, u32>,
}

/// Compute statistics for `habit` as of `now`
pub fn compute_stats(habit: &Habit, completions: &[Completion], now: DateTime<Utc>) -> HabitStats {
    let days_since_creation = (now - habit.created_at).num_days().max(1);
    let completion_rate = completions.len() as f64 / days_since_creation as f64 * 100.0;

    let mut completions_by_day: BTreeMap<String, u32> =
        (0..7).map(|day| (day.to_string(), 0)).collect();
    for completion in completions {
        let day = weekday_index(completion.local_date());
        *completions_by_day.entry(day.to_string()).or_insert(0) += 1;
    }

    HabitStats {
        habit_id: habit.id.clone(),
        current_streak: habit.streak,
        longest_streak: habit.longest_streak,
        completion_rate,
        total_completions: habit.total_completions,
        completions_by_day,
    }
}
