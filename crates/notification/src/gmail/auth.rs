//! Gmail token management
//!
//! Turns a stored OAuth token file into valid bearer tokens, refreshing
//! against Google's token endpoint when the access token has expired.
//! Obtaining the initial grant (the interactive browser flow) is the
//! surrounding application's job; this library only consumes the stored
//! token, and reports a clear error when none is usable.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::GmailCredentials;

/// Token filename in the mailcheck config directory
const TOKEN_FILE: &str = "gmail-tokens.json";

/// Seconds before expiry at which a token is treated as stale
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Bearer-token management for the Gmail API
pub struct GmailAuth {
    client_id: String,
    client_secret: String,
    token_path: PathBuf,
}

/// Stored token data
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl GmailAuth {
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Create a token manager using the default token path
    /// (~/.config/mailcheck/gmail-tokens.json)
    pub fn new(credentials: &GmailCredentials) -> Result<Self> {
        let token_path =
            config::config_path(TOKEN_FILE).context("Could not determine config directory")?;
        Ok(Self::with_token_path(credentials, token_path))
    }

    /// Create a token manager reading tokens from a specific path
    pub fn with_token_path(credentials: &GmailCredentials, token_path: PathBuf) -> Self {
        Self {
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            token_path,
        }
    }

    /// Get a valid access token, refreshing if needed
    pub fn get_access_token(&self) -> Result<String> {
        let token = self.load_token().with_context(|| {
            format!(
                "No stored Gmail token at {}; authorize this mailbox first",
                self.token_path.display()
            )
        })?;

        if !Self::is_stale(token.expires_at) {
            return Ok(token.access_token);
        }

        let Some(refresh_token) = token.refresh_token else {
            bail!(
                "Stored Gmail token at {} has expired and has no refresh token; re-authorize this mailbox",
                self.token_path.display()
            );
        };

        let renewed = self.refresh_access_token(&refresh_token)?;
        self.save_token(&renewed)?;
        Ok(renewed.access_token)
    }

    /// Check whether a usable token is on disk
    pub fn is_authenticated(&self) -> bool {
        match self.load_token() {
            Ok(token) => !Self::is_stale(token.expires_at) || token.refresh_token.is_some(),
            Err(_) => false,
        }
    }

    fn is_stale(expires_at: Option<i64>) -> bool {
        match expires_at {
            Some(at) => at <= chrono::Utc::now().timestamp() + EXPIRY_BUFFER_SECS,
            // Tokens without expiry metadata are treated as stale so a
            // refresh decides their fate.
            None => true,
        }
    }

    /// Exchange a refresh token for a fresh access token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Google omits the refresh token on renewal; keep the old one
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    fn load_token(&self) -> Result<StoredToken> {
        let content = fs::read_to_string(&self.token_path)?;
        let token: StoredToken = serde_json::from_str(&content)?;
        Ok(token)
    }

    fn save_token(&self, token: &TokenResponse) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
        };

        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.token_path, content)?;
        Ok(())
    }
}
