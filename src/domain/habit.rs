/// Habit entity and its lifecycle
///
/// A habit carries its configuration (frequency, target weekdays, display
/// fields) plus the values derived by the scheduling and streak engine. The
/// methods here are the only places those derived values change.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    compute_next_due, recompute_streak, Category, DomainError, Frequency, HabitId, StreakState,
    UserId,
};

/// Emoji used when a habit is created without one
pub const DEFAULT_EMOJI: &str = "✅";

/// A recurring activity tracked by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    /// Display name (e.g., "Morning Run")
    pub name: String,
    pub emoji: String,
    pub category: Category,
    pub description: Option<String>,
    pub frequency: Frequency,
    /// Weekday indices (0 = Monday .. 6 = Sunday), sorted and unique.
    /// Only consulted for weekly habits.
    pub target_days: Option<Vec<u8>>,
    /// How many times per occurrence the habit should be done
    pub target_count: u32,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Current consecutive-day streak
    pub streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub next_due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a habit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHabit {
    pub name: String,
    pub emoji: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub target_days: Option<Vec<u8>>,
    pub target_count: Option<u32>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// A partial update to a habit
///
/// `None` leaves a field untouched. For nullable fields `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitChanges {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub category: Option<Category>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub target_days: Option<Option<Vec<u8>>>,
    pub target_count: Option<u32>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
}

impl HabitChanges {
    /// Whether applying these changes moves the habit's schedule
    pub fn touches_schedule(&self) -> bool {
        self.frequency.is_some() || self.target_days.is_some()
    }
}

impl Habit {
    /// Create a new habit owned by `user_id`, validated and scheduled from `now`
    pub fn new(user_id: UserId, fields: NewHabit, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = Self::validate_name(&fields.name)?;
        let emoji = match fields.emoji {
            Some(emoji) => Self::validate_emoji(&emoji)?,
            None => DEFAULT_EMOJI.to_string(),
        };
        Self::validate_description(&fields.description)?;
        let target_days = normalize_target_days(fields.target_days)?;
        let target_count = fields.target_count.unwrap_or(1);
        Self::validate_target_count(target_count)?;
        Self::validate_short_text("Color", &fields.color)?;
        Self::validate_short_text("Icon", &fields.icon)?;

        let next_due_at = compute_next_due(fields.frequency, target_days.as_deref(), now);

        Ok(Self {
            id: HabitId::new(),
            user_id,
            name,
            emoji,
            category: fields.category,
            description: fields.description,
            frequency: fields.frequency,
            target_days,
            target_count,
            color: fields.color,
            icon: fields.icon,
            streak: 0,
            longest_streak: 0,
            total_completions: 0,
            last_completed_at: None,
            next_due_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update
    ///
    /// Everything is validated before anything is written, so a failed update
    /// leaves the habit untouched. When the frequency or target days change,
    /// `next_due_at` is recomputed from `now`; streak values are never touched.
    pub fn apply_changes(&mut self, changes: HabitChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        let name = changes.name.as_deref().map(Self::validate_name).transpose()?;
        let emoji = changes.emoji.as_deref().map(Self::validate_emoji).transpose()?;
        if let Some(ref description) = changes.description {
            Self::validate_description(description)?;
        }
        let reschedule = changes.touches_schedule();
        let target_days = changes.target_days.map(normalize_target_days).transpose()?;
        if let Some(count) = changes.target_count {
            Self::validate_target_count(count)?;
        }
        if let Some(ref color) = changes.color {
            Self::validate_short_text("Color", color)?;
        }
        if let Some(ref icon) = changes.icon {
            Self::validate_short_text("Icon", icon)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(emoji) = emoji {
            self.emoji = emoji;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(frequency) = changes.frequency {
            self.frequency = frequency;
        }
        if let Some(target_days) = target_days {
            self.target_days = target_days;
        }
        if let Some(count) = changes.target_count {
            self.target_count = count;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(icon) = changes.icon {
            self.icon = icon;
        }

        if reschedule {
            self.next_due_at = compute_next_due(self.frequency, self.target_days.as_deref(), now);
        }
        self.updated_at = now;

        Ok(())
    }

    /// Fold a newly recorded completion into the derived values
    ///
    /// `history` is the habit's full completion history including the new
    /// completion. Streak days and the next due date both follow each
    /// timestamp's own offset. The next due date is computed from the latest
    /// completion, which a back-dated completion does not move.
    pub fn record_completion<Tz: TimeZone>(
        &mut self,
        history: &[DateTime<Tz>],
        now: DateTime<Utc>,
    ) -> StreakState {
        let streak = recompute_streak(history, self.longest_streak);
        self.streak = streak.current_streak;
        self.longest_streak = streak.longest_streak;
        self.total_completions = self.total_completions.saturating_add(1);

        if let Some(latest) = history.iter().max().cloned() {
            self.last_completed_at = Some(latest.with_timezone(&Utc));
            self.next_due_at = compute_next_due(self.frequency, self.target_days.as_deref(), latest);
        }
        self.updated_at = now;

        streak
    }

    /// Current streak values as stored on the habit
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current_streak: self.streak,
            longest_streak: self.longest_streak,
        }
    }

    // Validation helper methods

    fn validate_name(name: &str) -> Result<String, DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string(),
            ));
        }

        if trimmed.chars().count() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string(),
            ));
        }

        Ok(trimmed.to_string())
    }

    fn validate_emoji(emoji: &str) -> Result<String, DomainError> {
        let trimmed = emoji.trim();
        if trimmed.is_empty() || trimmed.len() > 32 {
            return Err(DomainError::Validation {
                message: "Emoji must be between 1 and 32 bytes".to_string(),
            });
        }
        Ok(trimmed.to_string())
    }

    fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
        if let Some(desc) = description {
            if desc.chars().count() > 500 {
                return Err(DomainError::Validation {
                    message: "Description cannot be longer than 500 characters".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_target_count(count: u32) -> Result<(), DomainError> {
        if count == 0 || count > 1000 {
            return Err(DomainError::InvalidValue {
                message: format!("Target count must be between 1 and 1000, got {}", count),
            });
        }
        Ok(())
    }

    fn validate_short_text(field: &str, value: &Option<String>) -> Result<(), DomainError> {
        if let Some(text) = value {
            if text.trim().is_empty() || text.len() > 64 {
                return Err(DomainError::InvalidValue {
                    message: format!("{} must be between 1 and 64 characters", field),
                });
            }
        }
        Ok(())
    }
}

/// Sort and deduplicate target weekdays; an empty set means "no targets"
fn normalize_target_days(days: Option<Vec<u8>>) -> Result<Option<Vec<u8>>, DomainError> {
    let Some(mut days) = days else {
        return Ok(None);
    };

    if let Some(bad) = days.iter().find(|&&day| day > 6) {
        return Err(DomainError::InvalidTargetDay(*bad));
    }

    days.sort_unstable();
    days.dedup();

    Ok(if days.is_empty() { None } else { Some(days) })
}
