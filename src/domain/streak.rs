/// Streak calculation from completion history
///
/// Streaks are counted in calendar days, each completion falling on the day
/// of its own UTC offset. Several completions on the same
/// day count once; a missing day resets the current streak. The longest streak
/// is carried over from previous calculations and never goes down.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Derived streak values written back onto a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    /// Consecutive days ending at the latest completion day
    pub current_streak: u32,
    /// Best streak ever recorded for the habit
    pub longest_streak: u32,
}

impl StreakState {
    /// Get a motivational message based on the current streak
    pub fn motivational_message(&self) -> String {
        match self.current_streak {
            0 => "Ready to start your streak!".to_string(),
            1 => "Great start! One day down, keep the momentum going.".to_string(),
            2..=6 => format!("Nice work! {} days in a row.", self.current_streak),
            7..=29 => format!("Excellent! {} days strong.", self.current_streak),
            _ => format!("Incredible! {} days of consistency.", self.current_streak),
        }
    }
}

/// Re-derive streak values from a habit's full completion history
///
/// `completions` may be in any order and may contain several entries per
/// day. `previous_longest` is the longest streak stored on the habit before
/// this call; the result's `longest_streak` is never below it.
pub fn recompute_streak<Tz: TimeZone>(completions: &[DateTime<Tz>], previous_longest: u32) -> StreakState {
    if completions.is_empty() {
        return StreakState {
            current_streak: 0,
            longest_streak: previous_longest,
        };
    }

    let mut days: Vec<NaiveDate> = completions.iter().map(|c| c.date_naive()).collect();
    days.sort_unstable();

    let mut current_streak: u32 = 1;
    let mut longest_streak = previous_longest.max(1);

    for pair in days.windows(2) {
        let gap = (pair[1] - pair[0]).num_days();
        match gap {
            // Same day, already counted
            0 => {}
            1 => {
                current_streak += 1;
                longest_streak = longest_streak.max(current_streak);
            }
            _ => current_streak = 1,
        }
    }

    StreakState {
        current_streak,
        longest_streak,
    }
}
