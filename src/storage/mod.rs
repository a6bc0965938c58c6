/// Storage layer for persisting habit and palette data
///
/// This module defines the repository interfaces the rest of the crate talks
/// to and the SQLite implementation behind them. Storage handles are created
/// explicitly and passed by reference; there is no process-wide state.

pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use sqlite::*;

use thiserror::Error;

use crate::domain::{Action, ActionId, Category, Completion, Habit, HabitId, RecentUse, UserId};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Action not found: {action_id}")]
    ActionNotFound { action_id: String },

    #[error("System action {action_id} cannot be deleted")]
    SystemActionImmutable { action_id: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Repository for habits and their completion history
pub trait HabitStorage {
    /// Insert a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Get a habit by ID
    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// Overwrite an existing habit
    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Remove a habit together with its completions
    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError>;

    /// A user's habits, newest first, optionally limited to one category
    fn list_habits_by_user(
        &self,
        user_id: &UserId,
        category: Option<Category>,
    ) -> Result<Vec<Habit>, StorageError>;

    /// Every completion of a habit, oldest first
    fn list_completions(&self, habit_id: &HabitId) -> Result<Vec<Completion>, StorageError>;

    /// Insert a completion and write the recomputed habit in one transaction
    fn record_completion(&self, completion: &Completion, habit: &Habit) -> Result<(), StorageError>;
}

/// Repository for command palette actions, favorites and recents
pub trait PaletteStorage {
    /// Insert actions that are not stored yet; existing rows are kept
    fn seed_actions(&self, actions: &[Action]) -> Result<(), StorageError>;

    fn get_action(&self, action_id: &ActionId) -> Result<Action, StorageError>;

    /// System actions plus the user's own, in creation order
    fn list_actions(&self, user_id: &UserId) -> Result<Vec<Action>, StorageError>;

    fn create_action(&self, action: &Action) -> Result<(), StorageError>;

    fn update_action(&self, action: &Action) -> Result<(), StorageError>;

    /// Delete a user action and drop it from every favorites and recents list
    fn delete_action(&self, action_id: &ActionId) -> Result<(), StorageError>;

    /// IDs of the user's favorite actions
    fn favorites(&self, user_id: &UserId) -> Result<Vec<ActionId>, StorageError>;

    fn set_favorite(
        &self,
        user_id: &UserId,
        action_id: &ActionId,
        favorite: bool,
    ) -> Result<(), StorageError>;

    /// The user's recently used actions, newest first
    fn recent(&self, user_id: &UserId) -> Result<Vec<RecentUse>, StorageError>;

    /// Bump an action's usage count and replace the user's recents list.
    /// Returns the new usage count.
    fn record_action_use(
        &self,
        user_id: &UserId,
        action_id: &ActionId,
        recent: &[RecentUse],
    ) -> Result<u32, StorageError>;
}
