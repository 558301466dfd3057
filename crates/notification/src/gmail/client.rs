//! Gmail API HTTP client
//!
//! Implements the [`MailClient`] capability against the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use base64::prelude::*;
use log::debug;
use std::time::Duration;

use super::api::{
    CreateLabelRequest, GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse,
    ModifyMessageRequest, SendMessageRequest, SendMessageResponse,
};
use super::{GmailAuth, normalize_message};
use crate::mailbox::{FetchOptions, MailClient, SearchQuery};
use crate::models::{LabelId, Message, MessageId, OutgoingMessage};

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL (authenticated user's mailbox)
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    /// Retry budget for per-message fetches
    const FETCH_RETRIES: u32 = 3;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    /// Check if the client holds a usable token
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let access_token = self.auth.get_access_token()?;

        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send {} request", what))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", what))
    }

    fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let access_token = self.auth.get_access_token()?;

        let mut response = ureq::post(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(body)
            .with_context(|| format!("Failed to send {} request", what))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Build the query string for a message fetch
    fn get_message_url(id: &MessageId, fetch: &FetchOptions) -> String {
        let mut url = format!(
            "{}/messages/{}?format={}",
            Self::BASE_URL,
            id.as_str(),
            fetch.format.as_str()
        );
        for header in &fetch.metadata_headers {
            url.push_str(&format!("&metadataHeaders={}", urlencoding::encode(header)));
        }
        if let Some(fields) = &fetch.return_fields {
            url.push_str(&format!("&fields={}", urlencoding::encode(fields)));
        }
        url
    }

    /// Fetch a message with exponential backoff retry
    fn get_message_with_retry(
        &self,
        id: &MessageId,
        fetch: &FetchOptions,
        max_retries: u32,
    ) -> Result<Message> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..max_retries {
            match self.fetch_message(id, fetch) {
                Ok(msg) => return Ok(msg),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries - 1 {
                        let jitter = Duration::from_millis(rand_jitter());
                        std::thread::sleep(delay + jitter);
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap())
    }

    fn fetch_message(&self, id: &MessageId, fetch: &FetchOptions) -> Result<Message> {
        let url = Self::get_message_url(id, fetch);
        let gmail_msg: GmailMessage = self.get_json(&url, "get message")?;
        Ok(normalize_message(gmail_msg))
    }

    /// List all labels in the mailbox
    fn list_labels(&self) -> Result<Vec<GmailLabel>> {
        let url = format!("{}/labels", Self::BASE_URL);
        let response: ListLabelsResponse = self.get_json(&url, "list labels")?;
        Ok(response.labels.unwrap_or_default())
    }

    /// Create a user label and return it
    fn create_label(&self, name: &str) -> Result<GmailLabel> {
        let url = format!("{}/labels", Self::BASE_URL);
        let body = CreateLabelRequest {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };
        let label: GmailLabel = self.post_json(&url, &body, "create label")?;
        debug!("Created label {:?} with id {}", name, label.id);
        Ok(label)
    }

    /// Build an RFC 2822 message for the raw send payload
    fn to_rfc2822(outgoing: &OutgoingMessage) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            outgoing.from.display(),
            outgoing.to.display(),
            outgoing.subject,
            outgoing.body
        )
    }
}

impl MailClient for GmailClient {
    fn list_messages(&self, query: &SearchQuery) -> Result<Vec<MessageId>> {
        let mut url = format!(
            "{}/messages?q={}",
            Self::BASE_URL,
            urlencoding::encode(&query.freetext)
        );
        if let Some(max) = query.max_results {
            url.push_str(&format!("&maxResults={}", max.min(500)));
        }

        let response: ListMessagesResponse = self.get_json(&url, "list messages")?;
        let ids = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect();
        Ok(ids)
    }

    fn get_message(&self, id: &MessageId, fetch: &FetchOptions) -> Result<Message> {
        self.fetch_message(id, fetch)
    }

    fn get_messages(&self, ids: &[MessageId], fetch: &FetchOptions) -> Result<Vec<Message>> {
        ids.iter()
            .map(|id| self.get_message_with_retry(id, fetch, Self::FETCH_RETRIES))
            .collect()
    }

    fn get_label_id(&self, name: &str, create_if_missing: bool) -> Result<Option<LabelId>> {
        let labels = self.list_labels()?;
        if let Some(label) = labels.iter().find(|l| l.name == name) {
            return Ok(Some(LabelId::new(&label.id)));
        }
        if !create_if_missing {
            return Ok(None);
        }

        let created = self.create_label(name)?;
        Ok(Some(LabelId::new(created.id)))
    }

    fn update_message(
        &self,
        id: &MessageId,
        add_label_ids: &[LabelId],
        remove_label_ids: &[LabelId],
    ) -> Result<Message> {
        let url = format!("{}/messages/{}/modify", Self::BASE_URL, id.as_str());
        let body = ModifyMessageRequest {
            add_label_ids: add_label_ids.iter().map(|l| l.as_str().to_string()).collect(),
            remove_label_ids: remove_label_ids
                .iter()
                .map(|l| l.as_str().to_string())
                .collect(),
        };

        let gmail_msg: GmailMessage = self.post_json(&url, &body, "modify message")?;
        Ok(normalize_message(gmail_msg))
    }

    fn trash_messages(&self, ids: &[MessageId]) -> Result<Vec<Message>> {
        let access_token = self.auth.get_access_token()?;
        let mut trashed = Vec::with_capacity(ids.len());

        for id in ids {
            let url = format!("{}/messages/{}/trash", Self::BASE_URL, id.as_str());
            let mut response = ureq::post(&url)
                .header("Authorization", &format!("Bearer {}", access_token))
                .send_empty()
                .with_context(|| format!("Failed to trash message {}", id))?;

            let gmail_msg: GmailMessage = response
                .body_mut()
                .read_json()
                .context("Failed to parse trash response")?;
            trashed.push(normalize_message(gmail_msg));
        }

        Ok(trashed)
    }

    fn delete_label(&self, id: &LabelId) -> Result<()> {
        let access_token = self.auth.get_access_token()?;
        let url = format!("{}/labels/{}", Self::BASE_URL, id.as_str());

        ureq::delete(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to delete label {}", id))?;

        Ok(())
    }

    fn send_message(&self, outgoing: &OutgoingMessage) -> Result<MessageId> {
        let raw = BASE64_URL_SAFE_NO_PAD.encode(Self::to_rfc2822(outgoing));
        let url = format!("{}/messages/send", Self::BASE_URL);

        let response: SendMessageResponse =
            self.post_json(&url, &SendMessageRequest { raw }, "send message")?;
        Ok(MessageId::new(response.id))
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::MessageFormat;
    use crate::models::EmailAddress;

    #[test]
    fn test_get_message_url_full() {
        let url = GmailClient::get_message_url(&MessageId::new("m1"), &FetchOptions::full());
        assert_eq!(
            url,
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/m1?format=full"
        );
    }

    #[test]
    fn test_get_message_url_metadata_headers() {
        let fetch = FetchOptions::metadata(vec!["From".to_string(), "Subject".to_string()]);
        let url = GmailClient::get_message_url(&MessageId::new("m1"), &fetch);
        assert!(url.contains("format=metadata"));
        assert!(url.contains("metadataHeaders=From"));
        assert!(url.contains("metadataHeaders=Subject"));
    }

    #[test]
    fn test_get_message_url_fields_encoded() {
        let fetch = FetchOptions {
            format: MessageFormat::Minimal,
            metadata_headers: Vec::new(),
            return_fields: Some("id,labelIds".to_string()),
        };
        let url = GmailClient::get_message_url(&MessageId::new("m1"), &fetch);
        assert!(url.contains("format=minimal"));
        assert!(url.contains("fields=id%2ClabelIds"));
    }

    #[test]
    fn test_to_rfc2822() {
        let outgoing = OutgoingMessage {
            from: EmailAddress::with_name("Pi", "pi@example.com"),
            to: EmailAddress::new("me@example.com"),
            subject: "Nightly report".to_string(),
            body: "All checks passed".to_string(),
        };

        let raw = GmailClient::to_rfc2822(&outgoing);
        assert!(raw.starts_with("From: Pi <pi@example.com>\r\n"));
        assert!(raw.contains("To: me@example.com\r\n"));
        assert!(raw.contains("Subject: Nightly report\r\n"));
        assert!(raw.ends_with("\r\n\r\nAll checks passed"));
    }
}
