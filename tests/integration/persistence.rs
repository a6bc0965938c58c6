/// Data written through the tools survives reopening the database
use chrono::{Duration, TimeZone, Utc};
use habit_tracker_server::tools::{
    self, ActionIdParams, CompleteHabitParams, CreateHabitParams, HabitStatsParams,
};
use habit_tracker_server::*;
use tempfile::tempdir;

#[tokio::test]
async fn test_server_opens_and_seeds_database() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("habits.db");

    let server = HabitTrackerServer::new(db_path.clone(), UserId::new("local"))
        .await
        .expect("Failed to create first server");
    assert_eq!(server.user().as_str(), "local");
    assert_eq!(server.storage().list_actions(server.user()).unwrap().len(), 5);
    drop(server);

    // Reopening neither fails nor duplicates the built-in actions
    let server = HabitTrackerServer::new(db_path, UserId::new("local"))
        .await
        .expect("Failed to create second server");
    assert_eq!(server.storage().list_actions(server.user()).unwrap().len(), 5);
}

#[test]
fn test_completion_history_survives_reopen() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("habits.db");
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap());
    let user = UserId::new("alice");

    let habit_id = {
        let storage = SqliteStorage::new(&db_path).expect("Failed to open storage");
        tools::ensure_system_actions(&storage, &clock).unwrap();

        let habit = tools::create_habit(
            &storage,
            &clock,
            &user,
            CreateHabitParams {
                name: "Journal".to_string(),
                category: Some("mindfulness".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .habit;

        for _ in 0..2 {
            tools::complete_habit(
                &storage,
                &clock,
                &user,
                CompleteHabitParams {
                    habit_id: habit.id.to_string(),
                    notes: Some("felt good".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
            clock.advance(Duration::days(1));
        }

        tools::toggle_favorite(
            &storage,
            &user,
            ActionIdParams {
                action_id: "time_block".to_string(),
            },
        )
        .unwrap();

        habit.id
    };

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen storage");

    let habit = storage.get_habit(&habit_id).unwrap();
    assert_eq!(habit.streak, 2);
    assert_eq!(habit.total_completions, 2);
    assert_eq!(
        habit.last_completed_at,
        Some(Utc.with_ymd_and_hms(2024, 6, 11, 20, 0, 0).unwrap())
    );

    let completions = storage.list_completions(&habit_id).unwrap();
    assert_eq!(completions.len(), 2);
    assert!(completions.iter().all(|c| c.notes.as_deref() == Some("felt good")));

    let stats = tools::habit_stats(
        &storage,
        &clock,
        &user,
        HabitStatsParams {
            habit_id: habit_id.to_string(),
        },
    )
    .unwrap();
    assert_eq!(stats.current_streak, 2);

    assert_eq!(
        storage.favorites(&user).unwrap(),
        vec![ActionId::from_slug("time_block")]
    );
}
