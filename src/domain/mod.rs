/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, Completion, Action), the
/// due-date and streak calculations that derive a habit's schedule and
/// progress, and the validation rules applied at the boundary.

pub mod action;
pub mod completion;
pub mod habit;
pub mod schedule;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use action::*;
pub use completion::*;
pub use habit::*;
pub use schedule::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid action type: {0}")]
    InvalidActionType(String),

    #[error("Invalid target day {0}: weekdays run from 0 (Monday) to 6 (Sunday)")]
    InvalidTargetDay(u8),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}
