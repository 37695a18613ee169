mod config;
pub mod database;

pub use config::{Config, PresenceConfig, PromptsConfig, ServerConfig, TimingConfig};
pub use database::{Database, SqliteEventSink, StoredEvent, StoredReaction};

use std::path::PathBuf;

/// Returns `~/.config/deskwell[-dev]/` based on DESKWELL_ENV.
///
/// Set DESKWELL_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("DESKWELL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("deskwell-dev")
    } else {
        base_dir.join("deskwell")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
