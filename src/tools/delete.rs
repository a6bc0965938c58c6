/// Tool for deleting habits
///
/// This module implements the habit_delete tool. Deletion is permanent and
/// takes the habit's completion history with it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::storage::HabitStorage;
use crate::tools::{load_owned_habit, parse_habit_id, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteHabitParams {
    pub habit_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteHabitResponse {
    pub habit_id: String,
    pub message: String,
}

/// Delete a habit owned by `user` along with its completions
pub fn delete_habit<S: HabitStorage>(
    storage: &S,
    user: &UserId,
    params: DeleteHabitParams,
) -> Result<DeleteHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = load_owned_habit(storage, user, &habit_id)?;

    storage.delete_habit(&habit_id)?;
    tracing::info!("Deleted habit '{}' ({})", habit.name, habit_id);

    Ok(DeleteHabitResponse {
        habit_id: habit_id.to_string(),
        message: format!("Deleted habit '{}'", habit.name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::{SqliteStorage, StorageError};
    use crate::tools::{complete_habit, create_habit, CompleteHabitParams, CreateHabitParams};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_delete_removes_habit_and_history() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let user = UserId::new("alice");

        let habit = create_habit(
            &storage,
            &clock,
            &user,
            CreateHabitParams {
                name: "Floss".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .habit;
        complete_habit(
            &storage,
            &clock,
            &user,
            CompleteHabitParams {
                habit_id: habit.id.to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        // Someone else can't delete it
        let denied = delete_habit(
            &storage,
            &UserId::new("mallory"),
            DeleteHabitParams { habit_id: habit.id.to_string() },
        );
        assert!(matches!(
            denied,
            Err(ToolError::Storage(StorageError::HabitNotFound { .. }))
        ));

        delete_habit(&storage, &user, DeleteHabitParams { habit_id: habit.id.to_string() }).unwrap();

        assert!(storage.get_habit(&habit.id).is_err());
        assert!(storage.list_completions(&habit.id).unwrap().is_empty());

        let again = delete_habit(&storage, &user, DeleteHabitParams { habit_id: habit.id.to_string() });
        assert!(matches!(
            again,
            Err(ToolError::Storage(StorageError::HabitNotFound { .. }))
        ));
    }
}
