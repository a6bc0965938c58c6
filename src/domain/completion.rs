/// Completion records for habits
///
/// A completion is an append-only event: one instance of performing a habit.
/// Several completions may share a calendar day. The timestamp keeps the
/// offset it was reported with, and that offset decides which day it counts for.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CompletionId, DomainError, HabitId, UserId};

/// How far ahead of the clock a completion may be stamped (clock skew)
const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// A record of performing a habit once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub id: CompletionId,
    pub habit_id: HabitId,
    pub user_id: UserId,
    /// When the habit was performed, in the caller's offset
    pub completed_at: DateTime<FixedOffset>,
    /// How many repetitions this completion covers
    pub count: u32,
    pub notes: Option<String>,
}

impl Completion {
    /// Create a new completion with validation
    ///
    /// `now` is only used to reject completions stamped in the future.
    pub fn new(
        habit_id: HabitId,
        user_id: UserId,
        completed_at: DateTime<FixedOffset>,
        count: Option<u32>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::validate_completed_at(completed_at, now)?;
        let count = count.unwrap_or(1);
        Self::validate_count(count)?;
        Self::validate_notes(&notes)?;

        Ok(Self {
            id: CompletionId::new(),
            habit_id,
            user_id,
            completed_at,
            count,
            notes,
        })
    }

    /// Calendar day the completion counts for
    pub fn local_date(&self) -> NaiveDate {
        self.completed_at.date_naive()
    }

    fn validate_completed_at(completed_at: DateTime<FixedOffset>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if completed_at.with_timezone(&Utc) > now + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
            return Err(DomainError::InvalidDate(
                "Cannot record completions in the future".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_count(count: u32) -> Result<(), DomainError> {
        if count == 0 || count > 10000 {
            return Err(DomainError::InvalidValue {
                message: "Count must be between 1 and 10000".to_string(),
            });
        }
        Ok(())
    }

    fn validate_notes(notes: &Option<String>) -> Result<(), DomainError> {
        if let Some(text) = notes {
            if text.chars().count() > 500 {
                return Err(DomainError::InvalidValue {
                    message: "Notes cannot be longer than 500 characters".to_string(),
                });
            }
        }
        Ok(())
    }
}
