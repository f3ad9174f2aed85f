pub mod database;
pub mod prefs;

pub use database::{
    Database, MemorySessionStore, SessionRecord, SessionStore, SqliteSessionStore, Stats,
};
pub use prefs::{PrefStore, Preferences};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/restcycle/`, creating it if needed.
///
/// Set RESTCYCLE_DATA_DIR to relocate it (tests and scripted runs point
/// this at a temporary directory).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("RESTCYCLE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("restcycle"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
