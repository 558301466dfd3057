//! Message model representing a mail message returned by a search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Format the email address for an address header
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// A mail message as the tracker sees it
///
/// The tracker itself only relies on `id` and `label_ids`; the remaining
/// fields let callers read the notification's contents without another
/// round trip. Fields not covered by the requested fetch projection are
/// left at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Gmail message ID
    pub id: MessageId,
    /// Label IDs applied to the message (e.g., "INBOX", "UNREAD")
    pub label_ids: Vec<String>,
    /// Sender, when headers were fetched
    pub from: Option<EmailAddress>,
    /// Subject line
    pub subject: String,
    /// Short plain-text preview
    pub snippet: String,
    /// Decoded plain-text body, when the full payload was fetched
    pub body: Option<String>,
    /// When the message was received
    pub received_at: DateTime<Utc>,
    /// Gmail's internal timestamp (milliseconds since epoch)
    pub internal_date: i64,
}

impl Message {
    pub fn builder(id: MessageId) -> MessageBuilder {
        MessageBuilder::new(id)
    }

    /// Check whether a label is applied to this message
    pub fn has_label(&self, label_id: &crate::models::LabelId) -> bool {
        self.label_ids.iter().any(|l| l == label_id.as_str())
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    label_ids: Vec<String>,
    from: Option<EmailAddress>,
    subject: String,
    snippet: String,
    body: Option<String>,
    received_at: Option<DateTime<Utc>>,
    internal_date: i64,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            label_ids: Vec::new(),
            from: None,
            subject: String::new(),
            snippet: String::new(),
            body: None,
            received_at: None,
            internal_date: 0,
        }
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn internal_date(mut self, internal_date: i64) -> Self {
        self.internal_date = internal_date;
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            label_ids: self.label_ids,
            from: self.from,
            subject: self.subject,
            snippet: self.snippet,
            body: self.body,
            received_at: self.received_at.unwrap_or_else(Utc::now),
            internal_date: self.internal_date,
        }
    }
}

/// An outgoing message for the send capability
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}
