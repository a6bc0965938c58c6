/// Main entry point for the habit tracker server
///
/// This file sets up logging, parses command line arguments, and starts the server.
/// The server listens for JSON-RPC requests over stdin/stdout.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

use habit_tracker_server::{HabitTrackerServer, UserId};

/// Get the default database path with a fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|p| p.join(".habit_tracker")),
        dirs::data_dir().map(|p| p.join("habit_tracker")),
        dirs::config_dir().map(|p| p.join("habit_tracker")),
        std::env::current_dir().ok().map(|p| p.join(".habit_tracker")),
    ];

    for dir in potential_paths.iter().flatten() {
        if is_writable_dir(dir) {
            return Ok(dir.join("habits.db"));
        }
    }

    // Last resort: a temporary directory
    let temp_path = std::env::temp_dir().join("habit_tracker");
    std::fs::create_dir_all(&temp_path)?;

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path.join("habits.db"))
}

fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join(".write_check");
    let writable = std::fs::write(&marker, b"ok").is_ok();
    let _ = std::fs::remove_file(&marker);
    writable
}

/// Command line arguments for the habit tracker server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file.
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "HABIT_DB")]
    database: Option<PathBuf>,

    /// User every request acts for
    #[arg(long, env = "HABIT_USER", default_value = "local")]
    user: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("habit_tracker_server={}", log_level))
        .with_writer(std::io::stderr) // stdout carries the protocol
        .init();

    info!("Starting habit tracker server");

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    let user = args.user.trim();
    if user.is_empty() {
        return Err("User ID cannot be empty".into());
    }

    info!("Using database at: {}", db_path.display());

    let server = HabitTrackerServer::new(db_path, UserId::new(user)).await?;
    server.run().await?;

    info!("Habit tracker server shutdown complete");
    Ok(())
}
