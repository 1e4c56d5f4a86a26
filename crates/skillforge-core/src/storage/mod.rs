mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{
    AutoChainConfig, Config, ConfigFile, GoalsConfig, NotificationsConfig, ScheduleConfig,
};
pub use database::Database;
pub use store::SessionStore;

use std::path::PathBuf;

/// Returns `~/.config/skillforge[-dev]/` based on SKILLFORGE_ENV.
///
/// Set SKILLFORGE_ENV=dev to use the development data directory, or
/// SKILLFORGE_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("SKILLFORGE_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("SKILLFORGE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("skillforge-dev")
            } else {
                base_dir.join("skillforge")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
