mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, HormonesConfig, NotificationsConfig, UiConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/patchday[-dev]/` based on PATCHDAY_ENV.
///
/// Set PATCHDAY_ENV=dev to use the development data directory, or
/// PATCHDAY_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("PATCHDAY_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("PATCHDAY_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("patchday-dev")
            } else {
                base_dir.join("patchday")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
