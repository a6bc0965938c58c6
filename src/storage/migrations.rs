/// Database migration management
///
/// This module handles creating and updating the SQLite database schema.
/// It ensures the database has all the required tables and indexes.

use rusqlite::Connection;
use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 2;

/// Initialize the database schema
///
/// Creates all required tables and indexes if they don't exist and records
/// the schema version for later migrations.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    if current_version < CURRENT_VERSION {
        let tx = conn.unchecked_transaction()?;
        run_migrations(&tx, current_version)?;
        set_version(&tx, CURRENT_VERSION)?;
        tx.commit()?;
    }

    Ok(())
}

/// Get the current database schema version (0 for a fresh database)
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    if from_version < 2 {
        migration_v2(conn)?;
    }

    Ok(())
}

/// Migration to version 1: habits, completions and the command palette
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            emoji TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            frequency TEXT NOT NULL,
            target_days TEXT,
            target_count INTEGER NOT NULL DEFAULT 1,
            color TEXT,
            icon TEXT,
            streak INTEGER NOT NULL DEFAULT 0,
            longest_streak INTEGER NOT NULL DEFAULT 0,
            total_completions INTEGER NOT NULL DEFAULT 0,
            last_completed_at TEXT,
            next_due_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_completions (
            id TEXT PRIMARY KEY,
            habit_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 1,
            notes TEXT,
            FOREIGN KEY (habit_id) REFERENCES habits (id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS actions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            action_type TEXT NOT NULL,
            emoji TEXT,
            icon TEXT,
            description TEXT,
            shortcut TEXT,
            category TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            is_system BOOLEAN NOT NULL DEFAULT FALSE,
            usage_count INTEGER NOT NULL DEFAULT 0,
            user_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_favorites (
            user_id TEXT NOT NULL,
            action_id TEXT NOT NULL,
            PRIMARY KEY (user_id, action_id),
            FOREIGN KEY (action_id) REFERENCES actions (id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS user_recent (
            user_id TEXT NOT NULL,
            action_id TEXT NOT NULL,
            used_at TEXT NOT NULL,
            PRIMARY KEY (user_id, action_id),
            FOREIGN KEY (action_id) REFERENCES actions (id) ON DELETE CASCADE
        );",
    )?;

    create_indexes_v1(conn)?;

    tracing::info!("Applied migration v1: Created initial database schema");
    Ok(())
}

fn create_indexes_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_habits_user_category
            ON habits (user_id, category);
        CREATE INDEX IF NOT EXISTS idx_habit_completions_habit_completed
            ON habit_completions (habit_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_actions_user
            ON actions (user_id);
        CREATE INDEX IF NOT EXISTS idx_user_recent_used
            ON user_recent (user_id, used_at);",
    )?;

    tracing::debug!("Created database indexes for v1");
    Ok(())
}

/// Migration to version 2: keep the UTC offset each completion was reported in
///
/// `completed_at` stays a UTC instant so text order is time order. Rows from
/// version 1 get offset 0, which is the day they were already counted for.
fn migration_v2(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "ALTER TABLE habit_completions ADD COLUMN utc_offset INTEGER NOT NULL DEFAULT 0",
        [],
    )?;

    tracing::info!("Applied migration v2: Added completion UTC offsets");
    Ok(())
}
