//! Notification tracking
//!
//! Provides the tracker that watches a mailbox for a specific notification
//! email and records whether it has been handled.

mod notification;

pub use notification::{LabelChanges, NotificationTracker, TrackerConfig};
