mod config;
pub mod durable;
pub mod shared;

pub use config::Config;
pub use durable::DurableStore;
pub use shared::SharedStore;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/focustick[-dev]/` based on FOCUSTICK_ENV.
///
/// Set FOCUSTICK_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSTICK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focustick-dev")
    } else {
        base_dir.join("focustick")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
