//! Mail client capability
//!
//! Defines the minimal contract a mailbox backend must implement for the
//! notification tracker: search, fetch, label resolution, and the label /
//! trash / send mutations. The Gmail adapter implements it against the REST
//! API; [`InMemoryMailClient`] implements it over an in-memory mailbox for
//! tests.

mod memory;

pub use memory::InMemoryMailClient;

use anyhow::Result;

use crate::models::{LabelId, Message, MessageId, OutgoingMessage};

/// A free-text mailbox search
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Free-text search criteria (Gmail `q` syntax for the Gmail backend)
    pub freetext: String,
    /// Maximum number of results to return (backend default if unset)
    pub max_results: Option<u32>,
}

impl SearchQuery {
    pub fn new(freetext: impl Into<String>) -> Self {
        Self {
            freetext: freetext.into(),
            max_results: None,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// How much of a message to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Full payload including body data
    #[default]
    Full,
    /// Headers only (restricted by `metadata_headers` if set)
    Metadata,
    /// IDs and labels only
    Minimal,
}

impl MessageFormat {
    /// Wire value for the Gmail `format` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Minimal => "minimal",
        }
    }
}

/// Projection options for message fetches
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Message format to request
    pub format: MessageFormat,
    /// Header names to include when `format` is `Metadata`
    pub metadata_headers: Vec<String>,
    /// Partial-response field filter (Gmail `fields` parameter)
    pub return_fields: Option<String>,
}

impl FetchOptions {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn metadata(headers: Vec<String>) -> Self {
        Self {
            format: MessageFormat::Metadata,
            metadata_headers: headers,
            return_fields: None,
        }
    }

    pub fn minimal() -> Self {
        Self {
            format: MessageFormat::Minimal,
            metadata_headers: Vec::new(),
            return_fields: None,
        }
    }
}

/// Trait for mailbox operations consumed by the notification tracker
///
/// Implementations surface backend failures unmodified; "no matching
/// message" and "no matching label" are absent results, not errors.
pub trait MailClient: Send + Sync {
    /// Search for messages, returning their ids (possibly empty)
    fn list_messages(&self, query: &SearchQuery) -> Result<Vec<MessageId>>;

    /// Fetch a single message honoring the fetch projection
    fn get_message(&self, id: &MessageId, fetch: &FetchOptions) -> Result<Message>;

    /// Fetch several messages honoring the fetch projection
    fn get_messages(&self, ids: &[MessageId], fetch: &FetchOptions) -> Result<Vec<Message>>;

    /// Resolve a label name to its id
    ///
    /// With `create_if_missing`, an absent label is created upstream and its
    /// new id returned; `Ok(None)` is only possible when creation was not
    /// requested.
    fn get_label_id(&self, name: &str, create_if_missing: bool) -> Result<Option<LabelId>>;

    /// Apply an incremental label mutation and return the updated message
    fn update_message(
        &self,
        id: &MessageId,
        add_label_ids: &[LabelId],
        remove_label_ids: &[LabelId],
    ) -> Result<Message>;

    /// Move messages to trash, returning their updated records
    fn trash_messages(&self, ids: &[MessageId]) -> Result<Vec<Message>>;

    /// Delete a label from the mailbox
    fn delete_label(&self, id: &LabelId) -> Result<()>;

    /// Send a message, returning the id it was assigned
    fn send_message(&self, outgoing: &OutgoingMessage) -> Result<MessageId>;
}
