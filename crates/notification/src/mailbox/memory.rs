//! In-memory mail client implementation
//!
//! Backs the trait with an in-memory mailbox for tests. Search is plain
//! case-insensitive term matching over sender, subject, and body text, which
//! is enough to stand in for Gmail's free-text search in scenarios. Upstream
//! calls are counted so tests can assert caching behavior, and failures can
//! be injected to exercise error propagation.

use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{FetchOptions, MailClient, MessageFormat, SearchQuery};
use crate::models::{LabelId, Message, MessageId, OutgoingMessage};

/// In-memory implementation of [`MailClient`]
pub struct InMemoryMailClient {
    /// Messages in arrival order (search results preserve this order)
    messages: RwLock<Vec<Message>>,
    /// Label name -> id
    labels: RwLock<HashMap<String, LabelId>>,
    next_label: AtomicUsize,
    next_message: AtomicUsize,
    /// When set, every trait call fails
    fail_requests: AtomicBool,
    list_calls: AtomicUsize,
    label_lookups: AtomicUsize,
    modify_calls: AtomicUsize,
}

impl InMemoryMailClient {
    /// Create a new empty in-memory mailbox
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            labels: RwLock::new(HashMap::new()),
            next_label: AtomicUsize::new(1),
            next_message: AtomicUsize::new(1),
            fail_requests: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            label_lookups: AtomicUsize::new(0),
            modify_calls: AtomicUsize::new(0),
        }
    }

    /// Seed the mailbox with a pre-built message
    pub fn add_message(&self, message: Message) {
        self.messages.write().unwrap().push(message);
    }

    /// When enabled, every subsequent trait call returns an error
    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Number of `list_messages` calls that reached the backend
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_label_id` calls that reached the backend
    pub fn label_lookups(&self) -> usize {
        self.label_lookups.load(Ordering::SeqCst)
    }

    /// Number of `update_message` calls that reached the backend
    pub fn modify_calls(&self) -> usize {
        self.modify_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_requests.load(Ordering::SeqCst) {
            bail!("injected backend failure");
        }
        Ok(())
    }

    /// Match a message against every whitespace-separated query term
    fn matches(message: &Message, freetext: &str) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            message
                .from
                .as_ref()
                .map(|a| a.display())
                .unwrap_or_default(),
            message.subject,
            message.snippet,
            message.body.as_deref().unwrap_or_default(),
        )
        .to_lowercase();

        freetext
            .split_whitespace()
            .all(|term| haystack.contains(&term.to_lowercase()))
    }

    /// Apply the fetch projection to a stored message
    fn project(message: &Message, fetch: &FetchOptions) -> Message {
        match fetch.format {
            MessageFormat::Full => message.clone(),
            MessageFormat::Metadata => {
                let mut projected = message.clone();
                projected.body = None;
                if !fetch.metadata_headers.is_empty() {
                    let wants = |name: &str| {
                        fetch
                            .metadata_headers
                            .iter()
                            .any(|h| h.eq_ignore_ascii_case(name))
                    };
                    if !wants("From") {
                        projected.from = None;
                    }
                    if !wants("Subject") {
                        projected.subject = String::new();
                    }
                }
                projected
            }
            MessageFormat::Minimal => Message::builder(message.id.clone())
                .label_ids(message.label_ids.clone())
                .snippet(message.snippet.clone())
                .received_at(message.received_at)
                .internal_date(message.internal_date)
                .build(),
        }
    }
}

impl Default for InMemoryMailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MailClient for InMemoryMailClient {
    fn list_messages(&self, query: &SearchQuery) -> Result<Vec<MessageId>> {
        // Counted before the failure check so tests see failed attempts too
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;

        let messages = self.messages.read().unwrap();
        let mut ids: Vec<MessageId> = messages
            .iter()
            .filter(|m| Self::matches(m, &query.freetext))
            .map(|m| m.id.clone())
            .collect();

        if let Some(max) = query.max_results {
            ids.truncate(max as usize);
        }

        Ok(ids)
    }

    fn get_message(&self, id: &MessageId, fetch: &FetchOptions) -> Result<Message> {
        self.check_failure()?;

        let messages = self.messages.read().unwrap();
        let message = messages
            .iter()
            .find(|m| &m.id == id)
            .ok_or_else(|| anyhow::anyhow!("no message with id {}", id))?;

        Ok(Self::project(message, fetch))
    }

    fn get_messages(&self, ids: &[MessageId], fetch: &FetchOptions) -> Result<Vec<Message>> {
        ids.iter().map(|id| self.get_message(id, fetch)).collect()
    }

    fn get_label_id(&self, name: &str, create_if_missing: bool) -> Result<Option<LabelId>> {
        self.check_failure()?;
        self.label_lookups.fetch_add(1, Ordering::SeqCst);

        let mut labels = self.labels.write().unwrap();
        if let Some(id) = labels.get(name) {
            return Ok(Some(id.clone()));
        }
        if !create_if_missing {
            return Ok(None);
        }

        let id = LabelId::new(format!(
            "Label_{}",
            self.next_label.fetch_add(1, Ordering::SeqCst)
        ));
        labels.insert(name.to_string(), id.clone());
        Ok(Some(id))
    }

    fn update_message(
        &self,
        id: &MessageId,
        add_label_ids: &[LabelId],
        remove_label_ids: &[LabelId],
    ) -> Result<Message> {
        self.check_failure()?;
        self.modify_calls.fetch_add(1, Ordering::SeqCst);

        let mut messages = self.messages.write().unwrap();
        let message = messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| anyhow::anyhow!("no message with id {}", id))?;

        for label in remove_label_ids {
            message.label_ids.retain(|l| l != label.as_str());
        }
        for label in add_label_ids {
            if !message.label_ids.iter().any(|l| l == label.as_str()) {
                message.label_ids.push(label.as_str().to_string());
            }
        }

        Ok(message.clone())
    }

    fn trash_messages(&self, ids: &[MessageId]) -> Result<Vec<Message>> {
        self.check_failure()?;

        let mut messages = self.messages.write().unwrap();
        let mut trashed = Vec::with_capacity(ids.len());

        for id in ids {
            let message = messages
                .iter_mut()
                .find(|m| &m.id == id)
                .ok_or_else(|| anyhow::anyhow!("no message with id {}", id))?;

            message.label_ids.retain(|l| l != LabelId::INBOX);
            if !message.label_ids.iter().any(|l| l == LabelId::TRASH) {
                message.label_ids.push(LabelId::TRASH.to_string());
            }
            trashed.push(message.clone());
        }

        Ok(trashed)
    }

    fn delete_label(&self, id: &LabelId) -> Result<()> {
        self.check_failure()?;

        let mut labels = self.labels.write().unwrap();
        labels.retain(|_, v| v != id);

        let mut messages = self.messages.write().unwrap();
        for message in messages.iter_mut() {
            message.label_ids.retain(|l| l != id.as_str());
        }

        Ok(())
    }

    fn send_message(&self, outgoing: &OutgoingMessage) -> Result<MessageId> {
        self.check_failure()?;

        let id = MessageId::new(format!(
            "msg_{}",
            self.next_message.fetch_add(1, Ordering::SeqCst)
        ));
        let message = Message::builder(id.clone())
            .label_ids(vec![
                LabelId::INBOX.to_string(),
                LabelId::UNREAD.to_string(),
            ])
            .from(outgoing.from.clone())
            .subject(outgoing.subject.clone())
            .snippet(outgoing.body.chars().take(100).collect::<String>())
            .body(Some(outgoing.body.clone()))
            .internal_date(chrono::Utc::now().timestamp_millis())
            .build();

        self.messages.write().unwrap().push(message);
        Ok(id)
    }
}
