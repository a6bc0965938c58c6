/// Command palette behaviour across users
use chrono::{Duration, TimeZone, Utc};
use habit_tracker_server::tools::{
    self, ActionIdParams, CommandPaletteParams, CreateActionParams, UpdateActionParams,
};
use habit_tracker_server::*;

fn setup() -> (SqliteStorage, FixedClock) {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    tools::ensure_system_actions(&storage, &clock).unwrap();
    (storage, clock)
}

fn action_id(id: &str) -> ActionIdParams {
    ActionIdParams {
        action_id: id.to_string(),
    }
}

#[test]
fn test_recents_and_favorites_are_per_user() {
    let (storage, clock) = setup();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    tools::toggle_favorite(&storage, &alice, action_id("time_block")).unwrap();
    tools::record_action_usage(&storage, &clock, &alice, action_id("time_block")).unwrap();
    clock.advance(Duration::minutes(1));
    let usage = tools::record_action_usage(&storage, &clock, &bob, action_id("time_block")).unwrap();

    // The usage count is shared, the lists are not
    assert_eq!(usage.usage_count, 2);

    let alice_view = tools::command_palette(&storage, &alice, CommandPaletteParams::default()).unwrap();
    let bob_view = tools::command_palette(&storage, &bob, CommandPaletteParams::default()).unwrap();

    assert_eq!(alice_view.favorites.len(), 1);
    assert!(bob_view.favorites.is_empty());
    assert_eq!(alice_view.recent.len(), 1);
    assert_eq!(bob_view.recent.len(), 1);
    assert!(bob_view.habits.is_empty());
}

#[test]
fn test_user_actions_show_up_in_quick_actions() {
    let (storage, clock) = setup();
    let alice = UserId::new("alice");

    let created = tools::create_action(
        &storage,
        &clock,
        &alice,
        CreateActionParams {
            name: "Evening review".to_string(),
            action_type: "quick_action".to_string(),
            emoji: Some("🌙".to_string()),
            ..Default::default()
        },
    )
    .unwrap()
    .action;

    let palette = tools::command_palette(&storage, &alice, CommandPaletteParams::default()).unwrap();
    assert_eq!(palette.quick_actions.len(), 5);
    assert!(palette
        .quick_actions
        .iter()
        .any(|item| item.id == created.id.as_str() && item.emoji.as_deref() == Some("🌙")));

    let other = tools::command_palette(&storage, &UserId::new("bob"), CommandPaletteParams::default()).unwrap();
    assert_eq!(other.quick_actions.len(), 4);
}

#[test]
fn test_action_validation() {
    let (storage, clock) = setup();
    let alice = UserId::new("alice");

    let bad_type = tools::create_action(
        &storage,
        &clock,
        &alice,
        CreateActionParams {
            name: "Teleport".to_string(),
            action_type: "magic".to_string(),
            ..Default::default()
        },
    );
    assert!(matches!(bad_type, Err(ToolError::InvalidInput(_))));

    let blank_name = tools::create_action(
        &storage,
        &clock,
        &alice,
        CreateActionParams {
            name: "   ".to_string(),
            action_type: "command".to_string(),
            ..Default::default()
        },
    );
    assert!(matches!(blank_name, Err(ToolError::Domain(_))));

    let missing = tools::update_action(
        &storage,
        &clock,
        &alice,
        UpdateActionParams {
            action_id: "no_such_action".to_string(),
            ..Default::default()
        },
    );
    assert!(matches!(
        missing,
        Err(ToolError::Storage(StorageError::ActionNotFound { .. }))
    ));
}
