//! Gmail API integration
//!
//! This module provides:
//! - Bearer-token management for the Gmail API
//! - A Gmail REST client implementing the [`MailClient`] capability
//! - Response normalization to domain models
//!
//! [`MailClient`]: crate::mailbox::MailClient

mod auth;
mod client;
mod normalize;

pub use auth::GmailAuth;
pub use client::GmailClient;
pub use normalize::normalize_message;

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Full message from the Gmail API
    ///
    /// Most fields are optional because metadata/minimal formats and
    /// partial-response field filters omit them.
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub label_ids: Option<Vec<String>>,
        #[serde(default)]
        pub snippet: Option<String>,
        #[serde(default)]
        pub internal_date: Option<String>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers and body
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded)
    #[derive(Debug, Deserialize)]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
    }

    /// Message part (for multipart messages)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// A label as the API reports it
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
    }

    /// Response from listing labels
    #[derive(Debug, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// Request body for creating a label
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateLabelRequest<'a> {
        pub name: &'a str,
        pub label_list_visibility: &'a str,
        pub message_list_visibility: &'a str,
    }

    /// Request body for `users.messages.modify`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        pub add_label_ids: Vec<String>,
        pub remove_label_ids: Vec<String>,
    }

    /// Request body for `users.messages.send`
    #[derive(Debug, Serialize)]
    pub struct SendMessageRequest {
        /// URL-safe base64 encoded RFC 2822 message
        pub raw: String,
    }

    /// Response from `users.messages.send`
    #[derive(Debug, Deserialize)]
    pub struct SendMessageResponse {
        pub id: String,
    }
}
