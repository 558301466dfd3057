//! Notification crate - email notification tracking
//!
//! This crate watches a Gmail mailbox for a specific notification email and
//! tracks whether it has been handled:
//! - Domain models (Message, MessageId, LabelId, EmailAddress)
//! - The `MailClient` capability trait plus an in-memory test double
//! - A Gmail REST adapter with bearer-token management
//! - The `NotificationTracker` with its lazy result cache
//!
//! The tracker searches for messages matching a free-text criterion, caches
//! the resulting ids/messages/label id, and reports "received" (the search
//! matched) and "processed" (a dedicated label has been applied) states.
//! Mutations (apply label, mark read, trash) go back through the same
//! client capability.

pub mod config;
pub mod gmail;
pub mod mailbox;
pub mod models;
pub mod tracker;

pub use config::{ConfigError, GmailCredentials};
pub use gmail::{GmailAuth, GmailClient, normalize_message};
pub use mailbox::{FetchOptions, InMemoryMailClient, MailClient, MessageFormat, SearchQuery};
pub use models::{EmailAddress, LabelId, Message, MessageId, OutgoingMessage};
pub use tracker::{LabelChanges, NotificationTracker, TrackerConfig};
