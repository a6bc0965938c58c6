/// Public library interface for the habit tracker server
///
/// This module exports the server, the domain types and the tools that can
/// be used by other applications or tests.

use std::path::PathBuf;
use thiserror::Error;

pub mod analytics;
pub mod clock;
mod domain;
pub mod mcp;
mod storage;
pub mod tools;

// Re-export public modules and types
pub use analytics::{compute_stats, HabitStats};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::*;
pub use storage::{HabitStorage, PaletteStorage, SqliteStorage, StorageError};
pub use tools::ToolError;

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Tool error: {0}")]
    Tool(#[from] tools::ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The habit tracker: storage, a clock and the user it acts for
///
/// Owns the only database connection. Requests reach it through
/// [`mcp::McpServer`], one at a time.
pub struct HabitTrackerServer {
    storage: SqliteStorage,
    clock: Box<dyn Clock>,
    user: UserId,
}

impl HabitTrackerServer {
    /// Open the database at `db_path` and act for `user` on wall-clock time
    ///
    /// This will create the schema and the built-in palette actions if they
    /// don't exist yet.
    pub async fn new(db_path: PathBuf, user: UserId) -> Result<Self, ServerError> {
        tracing::info!("Initializing habit tracker with database: {:?}", db_path);

        let storage = SqliteStorage::new(db_path)?;
        Self::with_clock(storage, Box::new(SystemClock), user)
    }

    /// Build a server around an open storage and an explicit clock
    pub fn with_clock(
        storage: SqliteStorage,
        clock: Box<dyn Clock>,
        user: UserId,
    ) -> Result<Self, ServerError> {
        tools::ensure_system_actions(&storage, clock.as_ref())?;

        Ok(Self {
            storage,
            clock,
            user,
        })
    }

    /// Serve JSON-RPC requests over stdin/stdout until stdin closes
    pub async fn run(self) -> Result<(), ServerError> {
        let habits = self.storage.list_habits_by_user(&self.user, None)?;
        tracing::info!(
            "Server started for user '{}', found {} existing habits",
            self.user,
            habits.len()
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    /// Get a reference to the storage layer (useful for testing)
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The user every request acts for
    pub fn user(&self) -> &UserId {
        &self.user
    }
}
