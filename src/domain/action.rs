/// Command palette actions
///
/// Actions are either system-provided (seeded into every store, shared by all
/// users, immutable) or created by a user and visible only to them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::{ActionId, DomainError, UserId};

/// Most recent actions kept per user
pub const RECENT_LIMIT: usize = 10;

/// Kind of palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    QuickAction,
    Navigation,
    Shortcut,
    Habit,
    Focus,
    Command,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::QuickAction => "quick_action",
            ActionType::Navigation => "navigation",
            ActionType::Shortcut => "shortcut",
            ActionType::Habit => "habit",
            ActionType::Focus => "focus",
            ActionType::Command => "command",
        }
    }
}

impl FromStr for ActionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick_action" => Ok(ActionType::QuickAction),
            "navigation" => Ok(ActionType::Navigation),
            "shortcut" => Ok(ActionType::Shortcut),
            "habit" => Ok(ActionType::Habit),
            "focus" => Ok(ActionType::Focus),
            "command" => Ok(ActionType::Command),
            _ => Err(DomainError::InvalidActionType(s.to_string())),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in the command palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    /// Keyboard shortcut hint (e.g., "F")
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Map<String, Value>,
    pub is_system: bool,
    pub usage_count: u32,
    /// Owner of a user action; `None` for system actions
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a user creates an action
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub name: String,
    pub action_type: ActionType,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Map<String, Value>,
}

/// A partial update to a user action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionChanges {
    pub name: Option<String>,
    pub action_type: Option<ActionType>,
    pub emoji: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub shortcut: Option<String>,
    pub category: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

/// One entry of a user's recently used actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUse {
    pub action_id: ActionId,
    pub used_at: DateTime<Utc>,
}

impl Action {
    /// Create a user-owned action
    pub fn new(user_id: UserId, fields: NewAction, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = Self::validate_name(&fields.name)?;

        Ok(Self {
            id: ActionId::new(),
            name,
            action_type: fields.action_type,
            emoji: fields.emoji,
            icon: fields.icon,
            description: fields.description,
            shortcut: fields.shortcut,
            category: fields.category,
            metadata: fields.metadata,
            is_system: false,
            usage_count: 0,
            user_id: Some(user_id),
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether `user_id` may see this action
    pub fn is_visible_to(&self, user_id: &UserId) -> bool {
        self.is_system || self.user_id.as_ref() == Some(user_id)
    }

    /// Apply a partial update
    ///
    /// System actions are left as they are; the caller gets them back
    /// unchanged rather than an error.
    pub fn apply_changes(&mut self, changes: ActionChanges, now: DateTime<Utc>) -> Result<bool, DomainError> {
        if self.is_system {
            tracing::debug!("Ignoring update to system action {}", self.id);
            return Ok(false);
        }

        let name = changes.name.as_deref().map(Self::validate_name).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(action_type) = changes.action_type {
            self.action_type = action_type;
        }
        if changes.emoji.is_some() {
            self.emoji = changes.emoji;
        }
        if changes.icon.is_some() {
            self.icon = changes.icon;
        }
        if changes.description.is_some() {
            self.description = changes.description;
        }
        if changes.shortcut.is_some() {
            self.shortcut = changes.shortcut;
        }
        if changes.category.is_some() {
            self.category = changes.category;
        }
        if let Some(metadata) = changes.metadata {
            self.metadata = metadata;
        }
        self.updated_at = now;

        Ok(true)
    }

    fn validate_name(name: &str) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > 100 {
            return Err(DomainError::Validation {
                message: "Action name must be between 1 and 100 characters".to_string(),
            });
        }
        Ok(trimmed.to_string())
    }
}

/// The built-in actions every store starts with
pub fn system_actions(now: DateTime<Utc>) -> Vec<Action> {
    let system = |slug: &str,
                  name: &str,
                  action_type: ActionType,
                  emoji: &str,
                  shortcut: Option<&str>,
                  description: &str,
                  metadata: Value| {
        Action {
            id: ActionId::from_slug(slug),
            name: name.to_string(),
            action_type,
            emoji: Some(emoji.to_string()),
            icon: None,
            description: Some(description.to_string()),
            shortcut: shortcut.map(str::to_string),
            category: None,
            metadata: match metadata {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            is_system: true,
            usage_count: 0,
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    };

    vec![
        system(
            "start_focus_session",
            "Start focus session",
            ActionType::Focus,
            "⏱️",
            Some("F"),
            "Start a focused work session",
            json!({"duration_minutes": 25}),
        ),
        system(
            "view_habit_analytics",
            "View habit analytics",
            ActionType::QuickAction,
            "📊",
            Some("B"),
            "View analytics for your habits",
            json!({}),
        ),
        system(
            "time_block",
            "Time block",
            ActionType::QuickAction,
            "📅",
            Some("B"),
            "Plan your day with time blocks",
            json!({}),
        ),
        system(
            "configure_wearables",
            "Configure wearables",
            ActionType::QuickAction,
            "⌚",
            None,
            "Set up your wearable devices",
            json!({}),
        ),
        system(
            "add_custom_habit",
            "Add custom habit",
            ActionType::QuickAction,
            "➕",
            None,
            "Create a new custom habit",
            json!({}),
        ),
    ]
}

/// Move `action_id` to the front of a recents list and trim it
///
/// Each action appears at most once; an existing entry gets the new
/// timestamp. The list stays ordered newest first.
pub fn push_recent(recent: &mut Vec<RecentUse>, action_id: &ActionId, used_at: DateTime<Utc>) {
    recent.retain(|entry| &entry.action_id != action_id);
    recent.push(RecentUse {
        action_id: action_id.clone(),
        used_at,
    });
    recent.sort_by(|a, b| b.used_at.cmp(&a.used_at));
    recent.truncate(RECENT_LIMIT);
}
