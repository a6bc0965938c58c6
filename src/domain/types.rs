/// Core types and enums used throughout the domain layer
///
/// Identifier newtypes, habit categories and recurrence frequencies shared by
/// habits, completions and palette actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a habit
///
/// Wraps a UUID so a habit ID can't be passed where a completion ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a habit ID from its string form (database rows, tool arguments)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a single completion record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionId(pub Uuid);

impl CompletionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl Default for CompletionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the user acting on the store
///
/// Opaque to this crate: whatever the identity provider hands out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a command palette action
///
/// System actions use stable slugs (`start_focus_session`), user actions a
/// random UUID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_slug(slug: &str) -> Self {
        Self(slug.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Life areas habits are grouped under
///
/// The command palette groups a user's habits by these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Productivity,
    Health,
    Fitness,
    Learning,
    Mindfulness,
    Social,
    Creative,
    #[default]
    Custom,
}

impl Category {
    /// Every category, in palette display order
    pub const ALL: [Category; 8] = [
        Category::Productivity,
        Category::Health,
        Category::Fitness,
        Category::Learning,
        Category::Mindfulness,
        Category::Social,
        Category::Creative,
        Category::Custom,
    ];

    /// Stable lowercase name used in storage and responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Productivity => "productivity",
            Category::Health => "health",
            Category::Fitness => "fitness",
            Category::Learning => "learning",
            Category::Mindfulness => "mindfulness",
            Category::Social => "social",
            Category::Creative => "creative",
            Category::Custom => "custom",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::InvalidCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a habit recurs
///
/// `Custom` has no scheduling rule of its own; the due-date calculator
/// treats it like `Daily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }

    /// Parse a frequency name, accepting anything unrecognized as `Daily`
    ///
    /// Clients have always been able to send arbitrary frequency strings and
    /// get a daily habit back. The fallback is logged so bad input is visible.
    pub fn parse_lenient(s: &str) -> Self {
        match s.parse() {
            Ok(frequency) => frequency,
            Err(_) => {
                tracing::warn!("Unrecognized frequency '{}', treating it as daily", s);
                Frequency::Daily
            }
        }
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            _ => Err(DomainError::InvalidFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
