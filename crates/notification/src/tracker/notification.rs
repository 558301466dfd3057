//! Notification tracker
//!
//! Watches a mailbox for a notification email matching a search criterion
//! and tracks whether it has been processed, where "processed" means a
//! dedicated label has been applied to it. All mailbox traffic goes through
//! the injected [`MailClient`]; results are cached until explicitly flushed
//! so a polling loop doesn't re-query on every predicate.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::config::ConfigError;
use crate::mailbox::{FetchOptions, MailClient, SearchQuery};
use crate::models::{LabelId, Message, MessageId};

/// Static configuration for a tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Free-text search identifying the notification email
    pub search_criteria: String,
    /// Name of the label that marks a notification as processed
    pub label_name: String,
    /// Cap on the number of search results (backend default if unset)
    pub max_results: Option<u32>,
    /// Projection applied when fetching full messages
    pub fetch: FetchOptions,
}

impl TrackerConfig {
    /// Create a validated configuration
    ///
    /// Fails fast when the search criteria or label name is empty; a tracker
    /// with either would silently match nothing or create an unnamed label.
    pub fn new(
        search_criteria: impl Into<String>,
        label_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let search_criteria = search_criteria.into();
        let label_name = label_name.into();

        if search_criteria.trim().is_empty() {
            return Err(ConfigError::EmptySearchCriteria);
        }
        if label_name.trim().is_empty() {
            return Err(ConfigError::EmptyLabelName);
        }

        Ok(Self {
            search_criteria,
            label_name,
            max_results: None,
            fetch: FetchOptions::full(),
        })
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Label mutations to apply to the tracked notification
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelChanges {
    /// Apply the processed label
    pub apply_processed_label: bool,
    /// Remove UNREAD
    pub mark_as_read: bool,
    /// Add TRASH and remove INBOX
    pub trash: bool,
}

impl LabelChanges {
    fn is_empty(self) -> bool {
        !self.apply_processed_label && !self.mark_as_read && !self.trash
    }
}

/// Cached mailbox state, populated on demand
///
/// `message_ids` and `messages` always describe the same search result set;
/// both are cleared together on flush. Fields are only written after the
/// corresponding upstream call succeeded, so a failure leaves the previous
/// known-good state in place.
#[derive(Debug, Default)]
struct TrackerCache {
    message_ids: Option<Vec<MessageId>>,
    messages: Option<Vec<Message>>,
    label_id: Option<LabelId>,
}

/// Tracks a notification email through its received/processed lifecycle
///
/// Not synchronized: a tracker is meant to be driven from a single logical
/// flow, and methods take `&mut self`.
pub struct NotificationTracker {
    client: Arc<dyn MailClient>,
    config: TrackerConfig,
    cache: TrackerCache,
}

impl NotificationTracker {
    /// Create a new tracker over a mail client
    pub fn new(client: Arc<dyn MailClient>, config: TrackerConfig) -> Self {
        Self {
            client,
            config,
            cache: TrackerCache::default(),
        }
    }

    /// Ids of the messages matching the search criteria
    ///
    /// Searches the mailbox on first call and serves the cached result
    /// afterwards, including when the search matched nothing. An empty
    /// result is "none found", not an error.
    pub fn message_ids(&mut self) -> Result<Vec<MessageId>> {
        if let Some(ids) = &self.cache.message_ids {
            return Ok(ids.clone());
        }

        let mut query = SearchQuery::new(self.config.search_criteria.clone());
        query.max_results = self.config.max_results;

        let ids = self.client.list_messages(&query)?;
        debug!(
            "Search {:?} matched {} message(s)",
            self.config.search_criteria,
            ids.len()
        );

        self.cache.message_ids = Some(ids.clone());
        Ok(ids)
    }

    /// The messages matching the search criteria, fetched with the
    /// configured projection; empty when nothing matched
    pub fn messages(&mut self) -> Result<Vec<Message>> {
        if let Some(messages) = &self.cache.messages {
            return Ok(messages.clone());
        }

        let ids = self.message_ids()?;
        let messages = if ids.is_empty() {
            Vec::new()
        } else {
            self.client.get_messages(&ids, &self.config.fetch)?
        };

        self.cache.messages = Some(messages.clone());
        Ok(messages)
    }

    /// Check whether the notification has arrived
    pub fn has_been_received(&mut self) -> Result<bool> {
        Ok(!self.message_ids()?.is_empty())
    }

    /// Id of the processed label, created upstream if it doesn't exist yet
    ///
    /// Resolved at most once per tracker until [`flush_cache`] is called.
    ///
    /// [`flush_cache`]: NotificationTracker::flush_cache
    pub fn processed_label_id(&mut self) -> Result<LabelId> {
        if let Some(id) = &self.cache.label_id {
            return Ok(id.clone());
        }

        let id = self
            .client
            .get_label_id(&self.config.label_name, true)?
            .with_context(|| {
                format!("Label {:?} was not created upstream", self.config.label_name)
            })?;
        debug!("Resolved label {:?} to {}", self.config.label_name, id);

        self.cache.label_id = Some(id.clone());
        Ok(id)
    }

    /// Check whether the notification has been processed
    ///
    /// True iff the first matching message carries the processed label.
    /// When the search matched nothing this returns false rather than an
    /// error: absence means there is nothing to handle, and callers already
    /// distinguish that case through [`has_been_received`].
    ///
    /// [`has_been_received`]: NotificationTracker::has_been_received
    pub fn has_been_processed(&mut self) -> Result<bool> {
        let label_id = self.processed_label_id()?;
        let messages = self.messages()?;

        Ok(messages
            .first()
            .is_some_and(|message| message.has_label(&label_id)))
    }

    /// Check whether every matching message has been processed
    ///
    /// No matching messages is reported as false, matching
    /// [`has_been_processed`].
    ///
    /// [`has_been_processed`]: NotificationTracker::has_been_processed
    pub fn all_have_been_processed(&mut self) -> Result<bool> {
        let label_id = self.processed_label_id()?;
        let messages = self.messages()?;

        Ok(!messages.is_empty() && messages.iter().all(|m| m.has_label(&label_id)))
    }

    /// Apply label mutations to every matching message
    ///
    /// Builds one incremental mutation from the requested changes and
    /// applies it per message. With no change requested this is a no-op
    /// returning the cached messages unchanged. On success the message
    /// cache is replaced with the backend's responses, so the processed
    /// predicates observe the new label state without a re-fetch.
    pub fn update_labels(&mut self, changes: LabelChanges) -> Result<Vec<Message>> {
        if changes.is_empty() {
            return self.messages();
        }

        let mut add: Vec<LabelId> = Vec::new();
        let mut remove: Vec<LabelId> = Vec::new();

        if changes.apply_processed_label {
            add.push(self.processed_label_id()?);
        }
        if changes.mark_as_read {
            remove.push(LabelId::new(LabelId::UNREAD));
        }
        if changes.trash {
            add.push(LabelId::new(LabelId::TRASH));
            remove.push(LabelId::new(LabelId::INBOX));
        }

        let ids = self.message_ids()?;
        let mut updated = Vec::with_capacity(ids.len());
        for id in &ids {
            updated.push(self.client.update_message(id, &add, &remove)?);
        }

        info!(
            "Updated labels on {} message(s) (+{:?} -{:?})",
            updated.len(),
            add,
            remove
        );

        self.cache.messages = Some(updated.clone());
        Ok(updated)
    }

    /// Move every matching message to trash
    pub fn trash(&mut self) -> Result<Vec<Message>> {
        let ids = self.message_ids()?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let trashed = self.client.trash_messages(&ids)?;
        info!("Trashed {} message(s)", trashed.len());

        self.cache.messages = Some(trashed.clone());
        Ok(trashed)
    }

    /// Reset all cached state, forcing the next read to re-query
    pub fn flush_cache(&mut self) {
        debug!("Flushing tracker cache");
        self.cache = TrackerCache::default();
    }
}
