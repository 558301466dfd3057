//! Integration tests for the notification crate
//!
//! These tests drive a `NotificationTracker` against the in-memory mail
//! client through complete receive/process/cleanup scenarios.

use std::sync::Arc;

use notification::{
    EmailAddress, FetchOptions, InMemoryMailClient, LabelChanges, MailClient, NotificationTracker,
    OutgoingMessage, SearchQuery, TrackerConfig,
};

const LABEL: &str = "report-checker-processed";

/// Deliver a notification email into the mailbox
fn deliver(client: &InMemoryMailClient, subject: &str) {
    client
        .send_message(&OutgoingMessage {
            from: EmailAddress::with_name("Nightly Pi", "pi@example.com"),
            to: EmailAddress::new("me@example.com"),
            subject: subject.to_string(),
            body: format!("Details for: {}", subject),
        })
        .unwrap();
}

fn make_tracker(client: &Arc<InMemoryMailClient>, criteria: &str) -> NotificationTracker {
    let config = TrackerConfig::new(criteria, LABEL).unwrap();
    NotificationTracker::new(client.clone(), config)
}

#[test]
fn test_no_matching_email() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "something unrelated");
    let mut tracker = make_tracker(&client, "support payments report");

    assert!(!tracker.has_been_received().unwrap());
    assert!(!tracker.has_been_processed().unwrap());
    assert!(!tracker.all_have_been_processed().unwrap());
    assert!(tracker.messages().unwrap().is_empty());
}

#[test]
fn test_receive_then_process_lifecycle() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "support payments report ready");
    let mut tracker = make_tracker(&client, "support payments report");

    // Received but not yet processed
    assert!(tracker.has_been_received().unwrap());
    assert!(!tracker.has_been_processed().unwrap());

    // Apply the processed label and mark read
    let updated = tracker
        .update_labels(LabelChanges {
            apply_processed_label: true,
            mark_as_read: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert!(!updated[0].label_ids.contains(&"UNREAD".to_string()));

    // Predicates now observe the new state without a re-fetch
    assert!(tracker.has_been_processed().unwrap());
    assert!(tracker.all_have_been_processed().unwrap());
}

#[test]
fn test_processed_state_visible_to_fresh_tracker() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "backup finished");

    let mut first = make_tracker(&client, "backup finished");
    first
        .update_labels(LabelChanges {
            apply_processed_label: true,
            ..Default::default()
        })
        .unwrap();

    // A second tracker with the same configuration sees the applied label
    let mut second = make_tracker(&client, "backup finished");
    assert!(second.has_been_received().unwrap());
    assert!(second.has_been_processed().unwrap());
}

#[test]
fn test_all_processed_requires_every_message() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "disk alert host-a");
    deliver(&client, "disk alert host-b");

    let mut tracker = make_tracker(&client, "disk alert");
    let ids = tracker.message_ids().unwrap();
    assert_eq!(ids.len(), 2);

    // Label only the first message out of band
    let label_id = client.get_label_id(LABEL, true).unwrap().unwrap();
    client.update_message(&ids[0], &[label_id], &[]).unwrap();

    tracker.flush_cache();
    assert!(tracker.has_been_processed().unwrap());
    assert!(!tracker.all_have_been_processed().unwrap());

    // Labelling everything flips the aggregate predicate
    tracker
        .update_labels(LabelChanges {
            apply_processed_label: true,
            ..Default::default()
        })
        .unwrap();
    assert!(tracker.all_have_been_processed().unwrap());
}

#[test]
fn test_flush_cache_observes_new_mail() {
    let client = Arc::new(InMemoryMailClient::new());
    let mut tracker = make_tracker(&client, "weekly digest");

    assert!(!tracker.has_been_received().unwrap());

    // The notification arrives after the first poll
    deliver(&client, "weekly digest for week 34");
    assert!(!tracker.has_been_received().unwrap()); // still cached

    tracker.flush_cache();
    assert!(tracker.has_been_received().unwrap());
}

#[test]
fn test_trash_removes_from_inbox() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "stale notification");
    let mut tracker = make_tracker(&client, "stale notification");

    let trashed = tracker.trash().unwrap();
    assert_eq!(trashed.len(), 1);
    assert!(trashed[0].label_ids.contains(&"TRASH".to_string()));
    assert!(!trashed[0].label_ids.contains(&"INBOX".to_string()));
}

#[test]
fn test_max_results_bounds_search() {
    let client = Arc::new(InMemoryMailClient::new());
    for i in 0..4 {
        deliver(&client, &format!("build failed #{}", i));
    }

    let config = TrackerConfig::new("build failed", LABEL)
        .unwrap()
        .with_max_results(1);
    let mut tracker = NotificationTracker::new(client.clone(), config);

    assert_eq!(tracker.message_ids().unwrap().len(), 1);
    assert_eq!(tracker.messages().unwrap().len(), 1);
}

#[test]
fn test_metadata_projection_flows_through_tracker() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "cron summary");

    let config = TrackerConfig::new("cron summary", LABEL)
        .unwrap()
        .with_fetch(FetchOptions::metadata(vec!["Subject".to_string()]));
    let mut tracker = NotificationTracker::new(client.clone(), config);

    let messages = tracker.messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "cron summary");
    assert!(messages[0].body.is_none());
}

#[test]
fn test_label_cleanup_resets_processed_state() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "deploy done");
    let mut tracker = make_tracker(&client, "deploy done");

    tracker
        .update_labels(LabelChanges {
            apply_processed_label: true,
            ..Default::default()
        })
        .unwrap();
    assert!(tracker.has_been_processed().unwrap());

    // Harness-style cleanup: delete the label entirely
    let label_id = client.get_label_id(LABEL, false).unwrap().unwrap();
    client.delete_label(&label_id).unwrap();

    tracker.flush_cache();
    assert!(!tracker.has_been_processed().unwrap());
}

#[test]
fn test_upstream_failure_propagates_and_cache_recovers() {
    let client = Arc::new(InMemoryMailClient::new());
    deliver(&client, "quota warning");
    let mut tracker = make_tracker(&client, "quota warning");

    client.fail_requests(true);
    assert!(tracker.has_been_received().is_err());

    // Nothing was cached by the failed call
    client.fail_requests(false);
    assert!(tracker.has_been_received().unwrap());
    assert_eq!(client.list_calls(), 2);
}

#[test]
fn test_search_query_direct() {
    let client = InMemoryMailClient::new();
    deliver(&client, "alpha beta");
    deliver(&client, "alpha gamma");

    let ids = client
        .list_messages(&SearchQuery::new("alpha").with_max_results(10))
        .unwrap();
    assert_eq!(ids.len(), 2);

    let ids = client.list_messages(&SearchQuery::new("beta")).unwrap();
    assert_eq!(ids.len(), 1);
}
