//! Cross-Platform Path Utilities
//!
//! Resolves the analyzer's home directory (~/.anr-analyzer/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the analyzer directory (~/.anr-analyzer/)
pub fn analyzer_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".anr-analyzer"))
}

/// Get the config file path (~/.anr-analyzer/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(analyzer_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure the parent directory of `file` exists.
pub fn ensure_parent_dir(file: &Path) -> AppResult<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
