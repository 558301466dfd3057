//! Configuration for the Gmail backend
//!
//! Loads OAuth client credentials from (in order of priority):
//! 1. JSON file (Google Cloud Console format) in the mailcheck config dir
//! 2. Environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Credentials filename in the mailcheck config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Tracker configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("search criteria must not be empty")]
    EmptySearchCriteria,
    #[error("processed label name must not be empty")]
    EmptyLabelName,
}

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientEntry>,
    web: Option<ClientEntry>,
}

#[derive(Deserialize)]
struct ClientEntry {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from the config-directory file, falling back to
    /// the GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let file: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(file);
        }
        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(file)
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(file)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    // Both "installed" (desktop) and "web" credential types are accepted
    fn from_credential_file(file: GoogleCredentialFile) -> Result<Self> {
        let entry = file
            .installed
            .or(file.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: entry.client_id,
            client_secret: entry.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "desktop-id.apps.googleusercontent.com",
                "client_secret": "desktop-secret",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "desktop-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "desktop-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn test_rejects_unknown_shape() {
        assert!(GmailCredentials::from_json(r#"{ "other": {} }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(
            &path,
            r#"{ "installed": { "client_id": "id", "client_secret": "secret" } }"#,
        )
        .unwrap();

        let creds = GmailCredentials::from_file(&path).unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.client_secret, "secret");
    }
}
