/// Command palette tools
///
/// Actions, per-user favorites and recents, and the aggregate palette view
/// that combines them with the user's habits.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::clock::Clock;
use crate::domain::{
    push_recent, system_actions, Action, ActionChanges, ActionId, ActionType, Category, Habit,
    NewAction, UserId,
};
use crate::storage::{HabitStorage, PaletteStorage, StorageError};
use crate::tools::ToolError;

/// Parameters naming a single action
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActionIdParams {
    pub action_id: String,
}

/// Parameters for creating a user action
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateActionParams {
    pub name: String,
    /// quick_action, navigation, shortcut, habit, focus or command
    #[serde(rename = "type")]
    pub action_type: String,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// Parameters for updating a user action; system actions can't be changed
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateActionParams {
    pub action_id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// The palette view takes no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CommandPaletteParams {}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListActionsParams {}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub action: Action,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListActionsResponse {
    pub actions: Vec<Action>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteActionResponse {
    pub action_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub action_id: String,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct ActionUsageResponse {
    pub action_id: String,
    pub usage_count: u32,
}

/// One row of the command palette
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    pub is_favorite: bool,
}

impl PaletteItem {
    fn from_action(action: &Action, is_favorite: bool) -> Self {
        Self {
            id: action.id.to_string(),
            name: action.name.clone(),
            item_type: action.action_type.to_string(),
            emoji: action.emoji.clone(),
            icon: action.icon.clone(),
            description: action.description.clone(),
            shortcut: action.shortcut.clone(),
            category: action.category.clone(),
            metadata: action.metadata.clone(),
            usage_count: Some(action.usage_count),
            is_favorite,
        }
    }

    fn from_habit(habit: &Habit) -> Self {
        let metadata = match json!({
            "streak": habit.streak,
            "total_completions": habit.total_completions,
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            id: habit.id.to_string(),
            name: habit.name.clone(),
            item_type: ActionType::Habit.to_string(),
            emoji: Some(habit.emoji.clone()),
            icon: habit.icon.clone(),
            description: habit.description.clone(),
            shortcut: None,
            category: Some(habit.category.to_string()),
            metadata,
            usage_count: None,
            is_favorite: false,
        }
    }
}

/// The user's habits grouped by category, in `Category::ALL` order
///
/// Serializes as an object keyed by category name. Empty categories are left out.
#[derive(Debug, Default)]
pub struct HabitGroups(Vec<(Category, Vec<PaletteItem>)>);

impl HabitGroups {
    fn from_habits(habits: &[Habit]) -> Self {
        let groups = Category::ALL
            .iter()
            .filter_map(|&category| {
                let items: Vec<PaletteItem> = habits
                    .iter()
                    .filter(|h| h.category == category)
                    .map(PaletteItem::from_habit)
                    .collect();
                (!items.is_empty()).then_some((category, items))
            })
            .collect();
        Self(groups)
    }

    pub fn get(&self, category: Category) -> Option<&[PaletteItem]> {
        self.0
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, items)| items.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().map(|(category, _)| *category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for HabitGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(category, items)| (category.as_str(), items)))
    }
}

/// Everything the command palette shows
#[derive(Debug, Serialize)]
pub struct CommandPaletteResponse {
    /// Visible quick actions, with their favorite flag
    pub quick_actions: Vec<PaletteItem>,
    pub habits: HabitGroups,
    /// Newest first
    pub recent: Vec<PaletteItem>,
    pub favorites: Vec<PaletteItem>,
}

/// Make sure the built-in actions exist; already stored ones are kept as is
pub fn ensure_system_actions<S: PaletteStorage>(storage: &S, clock: &dyn Clock) -> Result<(), ToolError> {
    storage.seed_actions(&system_actions(clock.now()))?;
    Ok(())
}

fn parse_action_type(raw: &str) -> Result<ActionType, ToolError> {
    raw.parse::<ActionType>().map_err(|_| {
        ToolError::InvalidInput(format!(
            "Invalid action type '{}'. Valid options: quick_action, navigation, shortcut, habit, focus, command",
            raw
        ))
    })
}

fn parse_action_id(raw: &str) -> Result<ActionId, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput("Action ID cannot be empty".to_string()));
    }
    Ok(ActionId::from_slug(trimmed))
}

/// Load an action `user` can see; anything else is reported as missing
fn load_visible_action<S: PaletteStorage>(
    storage: &S,
    user: &UserId,
    action_id: &ActionId,
) -> Result<Action, ToolError> {
    let action = storage.get_action(action_id)?;
    if !action.is_visible_to(user) {
        return Err(StorageError::ActionNotFound {
            action_id: action_id.to_string(),
        }
        .into());
    }
    Ok(action)
}

/// System actions plus the ones `user` created
pub fn list_actions<S: PaletteStorage>(
    storage: &S,
    user: &UserId,
    _params: ListActionsParams,
) -> Result<ListActionsResponse, ToolError> {
    let actions = storage.list_actions(user)?;
    Ok(ListActionsResponse {
        count: actions.len(),
        actions,
    })
}

pub fn create_action<S: PaletteStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: CreateActionParams,
) -> Result<ActionResponse, ToolError> {
    let fields = NewAction {
        name: params.name,
        action_type: parse_action_type(&params.action_type)?,
        emoji: params.emoji,
        icon: params.icon,
        description: params.description,
        shortcut: params.shortcut,
        category: params.category,
        metadata: params.metadata.unwrap_or_default(),
    };
    let action = Action::new(user.clone(), fields, clock.now())?;
    storage.create_action(&action)?;

    tracing::info!("Created action '{}' ({}) for {}", action.name, action.id, user);

    Ok(ActionResponse {
        message: format!("Created action '{}'", action.name),
        action,
    })
}

/// Update a user action
///
/// A system action comes back unchanged without an error.
pub fn update_action<S: PaletteStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: UpdateActionParams,
) -> Result<ActionResponse, ToolError> {
    let action_id = parse_action_id(&params.action_id)?;
    let mut action = load_visible_action(storage, user, &action_id)?;

    let changes = ActionChanges {
        name: params.name,
        action_type: params.action_type.as_deref().map(parse_action_type).transpose()?,
        emoji: params.emoji,
        icon: params.icon,
        description: params.description,
        shortcut: params.shortcut,
        category: params.category,
        metadata: params.metadata,
    };

    let message = if action.apply_changes(changes, clock.now())? {
        storage.update_action(&action)?;
        format!("Updated action '{}'", action.name)
    } else {
        format!("'{}' is a system action and was left unchanged", action.name)
    };

    Ok(ActionResponse { action, message })
}

/// Delete a user action; it disappears from every favorites and recents list
pub fn delete_action<S: PaletteStorage>(
    storage: &S,
    user: &UserId,
    params: ActionIdParams,
) -> Result<DeleteActionResponse, ToolError> {
    let action_id = parse_action_id(&params.action_id)?;
    let action = load_visible_action(storage, user, &action_id)?;

    storage.delete_action(&action_id)?;
    tracing::info!("Deleted action '{}' ({})", action.name, action_id);

    Ok(DeleteActionResponse {
        action_id: action_id.to_string(),
        message: format!("Deleted action '{}'", action.name),
    })
}

/// Flip an action in or out of the user's favorites
pub fn toggle_favorite<S: PaletteStorage>(
    storage: &S,
    user: &UserId,
    params: ActionIdParams,
) -> Result<FavoriteResponse, ToolError> {
    let action_id = parse_action_id(&params.action_id)?;
    load_visible_action(storage, user, &action_id)?;

    let is_favorite = !storage.favorites(user)?.contains(&action_id);
    storage.set_favorite(user, &action_id, is_favorite)?;

    Ok(FavoriteResponse {
        action_id: action_id.to_string(),
        is_favorite,
    })
}

/// Count a use of an action and move it to the front of the user's recents
pub fn record_action_usage<S: PaletteStorage>(
    storage: &S,
    clock: &dyn Clock,
    user: &UserId,
    params: ActionIdParams,
) -> Result<ActionUsageResponse, ToolError> {
    let action_id = parse_action_id(&params.action_id)?;
    load_visible_action(storage, user, &action_id)?;

    let mut recent = storage.recent(user)?;
    push_recent(&mut recent, &action_id, clock.now());
    let usage_count = storage.record_action_use(user, &action_id, &recent)?;

    tracing::debug!("Action {} used by {} ({} uses)", action_id, user, usage_count);

    Ok(ActionUsageResponse {
        action_id: action_id.to_string(),
        usage_count,
    })
}

/// Assemble the command palette for `user`
pub fn command_palette<S: HabitStorage + PaletteStorage>(
    storage: &S,
    user: &UserId,
    _params: CommandPaletteParams,
) -> Result<CommandPaletteResponse, ToolError> {
    let actions = storage.list_actions(user)?;
    let favorite_ids: HashSet<ActionId> = storage.favorites(user)?.into_iter().collect();

    let quick_actions = actions
        .iter()
        .filter(|a| a.action_type == ActionType::QuickAction)
        .map(|a| PaletteItem::from_action(a, favorite_ids.contains(&a.id)))
        .collect();

    let favorites = actions
        .iter()
        .filter(|a| favorite_ids.contains(&a.id))
        .map(|a| PaletteItem::from_action(a, true))
        .collect();

    let recent = storage
        .recent(user)?
        .iter()
        .filter_map(|entry| actions.iter().find(|a| a.id == entry.action_id))
        .map(|a| PaletteItem::from_action(a, favorite_ids.contains(&a.id)))
        .collect();

    let habits = HabitGroups::from_habits(&storage.list_habits_by_user(user, None)?);

    Ok(CommandPaletteResponse {
        quick_actions,
        habits,
        recent,
        favorites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::RECENT_LIMIT;
    use crate::storage::SqliteStorage;
    use crate::tools::{create_habit, CreateHabitParams};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (SqliteStorage, FixedClock, UserId) {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        ensure_system_actions(&storage, &clock).unwrap();
        (storage, clock, UserId::new("alice"))
    }

    fn create(storage: &SqliteStorage, clock: &FixedClock, user: &UserId, name: &str) -> Action {
        create_action(
            storage,
            clock,
            user,
            CreateActionParams {
                name: name.to_string(),
                action_type: "quick_action".to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .action
    }

    fn ids(action_id: &str) -> ActionIdParams {
        ActionIdParams {
            action_id: action_id.to_string(),
        }
    }

    #[test]
    fn test_list_includes_system_and_own_actions_only() {
        let (storage, clock, alice) = setup();
        create(&storage, &clock, &alice, "Journal");
        create(&storage, &clock, &UserId::new("bob"), "Bob's thing");

        let listed = list_actions(&storage, &alice, ListActionsParams::default()).unwrap();
        assert_eq!(listed.count, 6);
        assert!(listed.actions[..5].iter().all(|a| a.is_system));
        assert_eq!(listed.actions[5].name, "Journal");
    }

    #[test]
    fn test_system_actions_resist_change() {
        let (storage, clock, alice) = setup();

        let response = update_action(
            &storage,
            &clock,
            &alice,
            UpdateActionParams {
                action_id: "time_block".to_string(),
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(response.action.name, "Time block");

        let deleted = delete_action(&storage, &alice, ids("time_block"));
        assert!(matches!(
            deleted,
            Err(ToolError::Storage(StorageError::SystemActionImmutable { .. }))
        ));
    }

    #[test]
    fn test_user_action_update_and_invisible_to_others() {
        let (storage, clock, alice) = setup();
        let action = create(&storage, &clock, &alice, "Journal");

        clock.advance(Duration::minutes(5));
        let updated = update_action(
            &storage,
            &clock,
            &alice,
            UpdateActionParams {
                action_id: action.id.to_string(),
                action_type: Some("command".to_string()),
                shortcut: Some("J".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .action;
        assert_eq!(updated.action_type, ActionType::Command);
        assert_eq!(storage.get_action(&action.id).unwrap(), updated);

        let bob = UserId::new("bob");
        let result = toggle_favorite(&storage, &bob, ids(action.id.as_str()));
        assert!(matches!(
            result,
            Err(ToolError::Storage(StorageError::ActionNotFound { .. }))
        ));
    }

    #[test]
    fn test_toggle_favorite() {
        let (storage, _clock, alice) = setup();

        assert!(toggle_favorite(&storage, &alice, ids("time_block")).unwrap().is_favorite);
        assert!(!toggle_favorite(&storage, &alice, ids("time_block")).unwrap().is_favorite);
        assert!(toggle_favorite(&storage, &alice, ids("time_block")).unwrap().is_favorite);

        let missing = toggle_favorite(&storage, &alice, ids("nope"));
        assert!(matches!(
            missing,
            Err(ToolError::Storage(StorageError::ActionNotFound { .. }))
        ));
    }

    #[test]
    fn test_usage_counts_and_recents_cap() {
        let (storage, clock, alice) = setup();
        let mut created = Vec::new();
        for i in 0..11 {
            created.push(create(&storage, &clock, &alice, &format!("Action {i}")));
        }

        for action in &created {
            clock.advance(Duration::seconds(1));
            record_action_usage(&storage, &clock, &alice, ids(action.id.as_str())).unwrap();
        }
        clock.advance(Duration::seconds(1));
        let again = record_action_usage(&storage, &clock, &alice, ids(created[3].id.as_str())).unwrap();
        assert_eq!(again.usage_count, 2);

        let recent = storage.recent(&alice).unwrap();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0].action_id, created[3].id);
        assert_eq!(recent.iter().filter(|r| r.action_id == created[3].id).count(), 1);
        // The oldest use fell off the end
        assert!(recent.iter().all(|r| r.action_id != created[0].id));
    }

    #[test]
    fn test_deleting_action_cleans_favorites_and_recents() {
        let (storage, clock, alice) = setup();
        let action = create(&storage, &clock, &alice, "Journal");

        toggle_favorite(&storage, &alice, ids(action.id.as_str())).unwrap();
        record_action_usage(&storage, &clock, &alice, ids(action.id.as_str())).unwrap();

        delete_action(&storage, &alice, ids(action.id.as_str())).unwrap();

        let palette = command_palette(&storage, &alice, CommandPaletteParams::default()).unwrap();
        assert!(palette.favorites.is_empty());
        assert!(palette.recent.is_empty());
        assert!(storage.favorites(&alice).unwrap().is_empty());
    }

    #[test]
    fn test_command_palette_view() {
        let (storage, clock, alice) = setup();
        for (name, category) in [("Run", "fitness"), ("Lift", "fitness"), ("Read", "learning")] {
            create_habit(
                &storage,
                &clock,
                &alice,
                CreateHabitParams {
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        toggle_favorite(&storage, &alice, ids("configure_wearables")).unwrap();
        record_action_usage(&storage, &clock, &alice, ids("start_focus_session")).unwrap();

        let palette = command_palette(&storage, &alice, CommandPaletteParams::default()).unwrap();

        // Focus is not a quick action
        assert_eq!(palette.quick_actions.len(), 4);
        let wearables = palette
            .quick_actions
            .iter()
            .find(|item| item.id == "configure_wearables")
            .unwrap();
        assert!(wearables.is_favorite);

        assert_eq!(palette.habits.len(), 2);
        assert_eq!(palette.habits.get(Category::Fitness).unwrap().len(), 2);
        assert_eq!(
            palette.habits.get(Category::Learning).unwrap()[0].metadata["streak"],
            json!(0)
        );

        assert_eq!(palette.recent.len(), 1);
        assert_eq!(palette.recent[0].id, "start_focus_session");
        assert_eq!(palette.recent[0].usage_count, Some(1));
        assert_eq!(palette.favorites.len(), 1);
    }

    #[test]
    fn test_habit_groups_follow_category_order() {
        let (storage, clock, alice) = setup();
        for (name, category) in [("Sketch", "creative"), ("Run", "fitness"), ("Water", "health")] {
            create_habit(
                &storage,
                &clock,
                &alice,
                CreateHabitParams {
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let palette = command_palette(&storage, &alice, CommandPaletteParams::default()).unwrap();
        let order: Vec<Category> = palette.habits.categories().collect();
        assert_eq!(order, vec![Category::Health, Category::Fitness, Category::Creative]);

        // Object keys keep that order on the wire
        let text = serde_json::to_string(&palette.habits).unwrap();
        let health = text.find("\"health\"").unwrap();
        let fitness = text.find("\"fitness\"").unwrap();
        let creative = text.find("\"creative\"").unwrap();
        assert!(health < fitness && fitness < creative);
    }
}
