//! Shared configuration-directory helpers
//!
//! All mailcheck tools keep their files (OAuth credentials, stored tokens)
//! under a single config directory (~/.config/mailcheck/). This crate
//! resolves paths inside that directory and loads JSON files from it.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Get the mailcheck config directory (~/.config/mailcheck/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mailcheck"))
}

/// Get the path to a file within the mailcheck config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Check whether a file exists in the mailcheck config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Load and parse a JSON file from the mailcheck config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let dir = config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with("mailcheck"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path("credentials.json");
        assert!(path.is_some());
        assert!(path.unwrap().ends_with("mailcheck/credentials.json"));
    }
}
