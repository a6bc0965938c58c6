/// SQLite implementation of the storage interfaces
///
/// This module provides the concrete SQLite implementation for storing and
/// retrieving habits, completions and palette data. It handles all SQL
/// queries and row conversion.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

use crate::domain::{
    Action, ActionId, Category, Completion, CompletionId, Habit, HabitId, RecentUse, UserId,
};
use crate::storage::{migrations, HabitStorage, PaletteStorage, StorageError};

const HABIT_COLUMNS: &str = "id, user_id, name, emoji, category, description, frequency, \
    target_days, target_count, color, icon, streak, longest_streak, total_completions, \
    last_completed_at, next_due_at, created_at, updated_at";

const COMPLETION_COLUMNS: &str = "id, habit_id, user_id, completed_at, utc_offset, count, notes";

const ACTION_COLUMNS: &str = "id, name, action_type, emoji, icon, description, shortcut, \
    category, metadata, is_system, usage_count, user_id, created_at, updated_at";

/// SQLite-based storage implementation
///
/// Holds a single connection. Whoever owns the storage handle is the only
/// writer, which keeps completion recording serialized per habit.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database file and bring its schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::with_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// A private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn })
    }
}

/// Write every mutable habit column
fn write_habit(conn: &Connection, habit: &Habit) -> Result<usize, StorageError> {
    let target_days = habit
        .target_days
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let rows = conn.execute(
        "UPDATE habits SET
            name = ?2,
            emoji = ?3,
            category = ?4,
            description = ?5,
            frequency = ?6,
            target_days = ?7,
            target_count = ?8,
            color = ?9,
            icon = ?10,
            streak = ?11,
            longest_streak = ?12,
            total_completions = ?13,
            last_completed_at = ?14,
            next_due_at = ?15,
            updated_at = ?16
         WHERE id = ?1",
        params![
            habit.id.to_string(),
            habit.name,
            habit.emoji,
            habit.category.as_str(),
            habit.description,
            habit.frequency.as_str(),
            target_days,
            habit.target_count,
            habit.color,
            habit.icon,
            habit.streak,
            habit.longest_streak,
            habit.total_completions,
            habit.last_completed_at.as_ref().map(encode_timestamp),
            encode_timestamp(&habit.next_due_at),
            encode_timestamp(&habit.updated_at),
        ],
    )?;

    Ok(rows)
}

impl HabitStorage for SqliteStorage {
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let target_days = habit
            .target_days
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            &format!(
                "INSERT INTO habits ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                HABIT_COLUMNS
            ),
            params![
                habit.id.to_string(),
                habit.user_id.as_str(),
                habit.name,
                habit.emoji,
                habit.category.as_str(),
                habit.description,
                habit.frequency.as_str(),
                target_days,
                habit.target_count,
                habit.color,
                habit.icon,
                habit.streak,
                habit.longest_streak,
                habit.total_completions,
                habit.last_completed_at.as_ref().map(encode_timestamp),
                encode_timestamp(&habit.next_due_at),
                encode_timestamp(&habit.created_at),
                encode_timestamp(&habit.updated_at),
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
                params![habit_id.to_string()],
                habit_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        if write_habit(&self.conn, habit)? == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn delete_habit(&self, habit_id: &HabitId) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1",
            params![habit_id.to_string()],
        )?;
        let rows = tx.execute("DELETE FROM habits WHERE id = ?1", params![habit_id.to_string()])?;

        if rows == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }
        tx.commit()?;

        tracing::debug!("Deleted habit: {}", habit_id);
        Ok(())
    }

    fn list_habits_by_user(
        &self,
        user_id: &UserId,
        category: Option<Category>,
    ) -> Result<Vec<Habit>, StorageError> {
        let mut sql = format!("SELECT {} FROM habits WHERE user_id = ?1", HABIT_COLUMNS);
        let mut values = vec![user_id.as_str().to_string()];

        if let Some(category) = category {
            sql.push_str(" AND category = ?2");
            values.push(category.as_str().to_string());
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let habits = stmt
            .query_map(params_from_iter(values.iter()), habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(habits)
    }

    fn list_completions(&self, habit_id: &HabitId) -> Result<Vec<Completion>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM habit_completions WHERE habit_id = ?1
             ORDER BY completed_at ASC, rowid ASC",
            COMPLETION_COLUMNS
        ))?;

        let completions = stmt
            .query_map(params![habit_id.to_string()], completion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(completions)
    }

    fn record_completion(&self, completion: &Completion, habit: &Habit) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO habit_completions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                COMPLETION_COLUMNS
            ),
            params![
                completion.id.to_string(),
                completion.habit_id.to_string(),
                completion.user_id.as_str(),
                encode_timestamp(&completion.completed_at.with_timezone(&Utc)),
                completion.completed_at.offset().local_minus_utc(),
                completion.count,
                completion.notes,
            ],
        )?;

        if write_habit(&tx, habit)? == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        tx.commit()?;

        tracing::debug!(
            "Recorded completion {} for habit {} (streak {})",
            completion.id,
            habit.id,
            habit.streak
        );
        Ok(())
    }
}

impl PaletteStorage for SqliteStorage {
    fn seed_actions(&self, actions: &[Action]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        for action in actions {
            inserted += insert_action(&tx, action, "INSERT OR IGNORE")?;
        }
        tx.commit()?;

        if inserted > 0 {
            tracing::info!("Seeded {} system actions", inserted);
        }
        Ok(())
    }

    fn get_action(&self, action_id: &ActionId) -> Result<Action, StorageError> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM actions WHERE id = ?1", ACTION_COLUMNS),
                params![action_id.as_str()],
                action_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::ActionNotFound {
                action_id: action_id.to_string(),
            })
    }

    fn list_actions(&self, user_id: &UserId) -> Result<Vec<Action>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM actions WHERE is_system = 1 OR user_id = ?1
             ORDER BY is_system DESC, created_at ASC, rowid ASC",
            ACTION_COLUMNS
        ))?;

        let actions = stmt
            .query_map(params![user_id.as_str()], action_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(actions)
    }

    fn create_action(&self, action: &Action) -> Result<(), StorageError> {
        insert_action(&self.conn, action, "INSERT")?;
        tracing::debug!("Created action: {} ({})", action.name, action.id);
        Ok(())
    }

    fn update_action(&self, action: &Action) -> Result<(), StorageError> {
        let rows = self.conn.execute(
            "UPDATE actions SET
                name = ?2,
                action_type = ?3,
                emoji = ?4,
                icon = ?5,
                description = ?6,
                shortcut = ?7,
                category = ?8,
                metadata = ?9,
                usage_count = ?10,
                updated_at = ?11
             WHERE id = ?1",
            params![
                action.id.as_str(),
                action.name,
                action.action_type.as_str(),
                action.emoji,
                action.icon,
                action.description,
                action.shortcut,
                action.category,
                serde_json::to_string(&action.metadata)?,
                action.usage_count,
                encode_timestamp(&action.updated_at),
            ],
        )?;

        if rows == 0 {
            return Err(StorageError::ActionNotFound {
                action_id: action.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_action(&self, action_id: &ActionId) -> Result<(), StorageError> {
        let action = self.get_action(action_id)?;
        if action.is_system {
            return Err(StorageError::SystemActionImmutable {
                action_id: action_id.to_string(),
            });
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM user_favorites WHERE action_id = ?1",
            params![action_id.as_str()],
        )?;
        tx.execute(
            "DELETE FROM user_recent WHERE action_id = ?1",
            params![action_id.as_str()],
        )?;
        tx.execute("DELETE FROM actions WHERE id = ?1", params![action_id.as_str()])?;
        tx.commit()?;

        tracing::debug!("Deleted action: {}", action_id);
        Ok(())
    }

    fn favorites(&self, user_id: &UserId) -> Result<Vec<ActionId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT action_id FROM user_favorites WHERE user_id = ?1 ORDER BY rowid")?;

        let favorites = stmt
            .query_map(params![user_id.as_str()], |row| row.get::<_, String>(0).map(ActionId))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(favorites)
    }

    fn set_favorite(
        &self,
        user_id: &UserId,
        action_id: &ActionId,
        favorite: bool,
    ) -> Result<(), StorageError> {
        let sql = if favorite {
            "INSERT OR IGNORE INTO user_favorites (user_id, action_id) VALUES (?1, ?2)"
        } else {
            "DELETE FROM user_favorites WHERE user_id = ?1 AND action_id = ?2"
        };
        self.conn.execute(sql, params![user_id.as_str(), action_id.as_str()])?;
        Ok(())
    }

    fn recent(&self, user_id: &UserId) -> Result<Vec<RecentUse>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT action_id, used_at FROM user_recent WHERE user_id = ?1
             ORDER BY used_at DESC, rowid DESC",
        )?;

        let recent = stmt
            .query_map(params![user_id.as_str()], |row| {
                Ok(RecentUse {
                    action_id: ActionId(row.get(0)?),
                    used_at: timestamp_column(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recent)
    }

    fn record_action_use(
        &self,
        user_id: &UserId,
        action_id: &ActionId,
        recent: &[RecentUse],
    ) -> Result<u32, StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        let rows = tx.execute(
            "UPDATE actions SET usage_count = usage_count + 1 WHERE id = ?1",
            params![action_id.as_str()],
        )?;
        if rows == 0 {
            return Err(StorageError::ActionNotFound {
                action_id: action_id.to_string(),
            });
        }

        tx.execute(
            "DELETE FROM user_recent WHERE user_id = ?1",
            params![user_id.as_str()],
        )?;
        for entry in recent {
            tx.execute(
                "INSERT INTO user_recent (user_id, action_id, used_at) VALUES (?1, ?2, ?3)",
                params![
                    user_id.as_str(),
                    entry.action_id.as_str(),
                    encode_timestamp(&entry.used_at)
                ],
            )?;
        }

        let usage_count: u32 = tx.query_row(
            "SELECT usage_count FROM actions WHERE id = ?1",
            params![action_id.as_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(usage_count)
    }
}

fn insert_action(conn: &Connection, action: &Action, verb: &str) -> Result<usize, StorageError> {
    let rows = conn.execute(
        &format!(
            "{} INTO actions ({}) VALUES
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            verb, ACTION_COLUMNS
        ),
        params![
            action.id.as_str(),
            action.name,
            action.action_type.as_str(),
            action.emoji,
            action.icon,
            action.description,
            action.shortcut,
            action.category,
            serde_json::to_string(&action.metadata)?,
            action.is_system,
            action.usage_count,
            action.user_id.as_ref().map(UserId::as_str),
            encode_timestamp(&action.created_at),
            encode_timestamp(&action.updated_at),
        ],
    )?;
    Ok(rows)
}

// Row conversion helpers

/// Fixed-width RFC 3339 so stored timestamps sort correctly as text
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// A UTC instant column shown in the offset stored next to it
fn offset_timestamp_column(
    row: &Row<'_>,
    idx: usize,
    offset_idx: usize,
) -> rusqlite::Result<DateTime<FixedOffset>> {
    let seconds: i32 = row.get(offset_idx)?;
    let offset = FixedOffset::east_opt(seconds).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            offset_idx,
            Type::Integer,
            format!("UTC offset out of range: {}", seconds).into(),
        )
    })?;
    Ok(timestamp_column(row, idx)?.with_timezone(&offset))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => timestamp_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let id: String = row.get(0)?;
    let target_days = match row.get::<_, Option<String>>(7)? {
        Some(_) => Some(json_column::<Vec<u8>>(row, 7)?),
        None => None,
    };

    Ok(Habit {
        id: HabitId::from_string(&id).map_err(|e| conversion_error(0, e))?,
        user_id: UserId(row.get(1)?),
        name: row.get(2)?,
        emoji: row.get(3)?,
        category: parsed_column::<Category>(row, 4)?,
        description: row.get(5)?,
        frequency: parsed_column(row, 6)?,
        target_days,
        target_count: row.get(8)?,
        color: row.get(9)?,
        icon: row.get(10)?,
        streak: row.get(11)?,
        longest_streak: row.get(12)?,
        total_completions: row.get(13)?,
        last_completed_at: optional_timestamp_column(row, 14)?,
        next_due_at: timestamp_column(row, 15)?,
        created_at: timestamp_column(row, 16)?,
        updated_at: timestamp_column(row, 17)?,
    })
}

fn completion_from_row(row: &Row<'_>) -> rusqlite::Result<Completion> {
    let id: String = row.get(0)?;
    let habit_id: String = row.get(1)?;

    Ok(Completion {
        id: CompletionId::from_string(&id).map_err(|e| conversion_error(0, e))?,
        habit_id: HabitId::from_string(&habit_id).map_err(|e| conversion_error(1, e))?,
        user_id: UserId(row.get(2)?),
        completed_at: offset_timestamp_column(row, 3, 4)?,
        count: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    let metadata: Map<String, Value> = json_column(row, 8)?;
    let user_id: Option<String> = row.get(11)?;

    Ok(Action {
        id: ActionId(row.get(0)?),
        name: row.get(1)?,
        action_type: parsed_column(row, 2)?,
        emoji: row.get(3)?,
        icon: row.get(4)?,
        description: row.get(5)?,
        shortcut: row.get(6)?,
        category: row.get(7)?,
        metadata,
        is_system: row.get(9)?,
        usage_count: row.get(10)?,
        user_id: user_id.map(UserId),
        created_at: timestamp_column(row, 12)?,
        updated_at: timestamp_column(row, 13)?,
    })
}
