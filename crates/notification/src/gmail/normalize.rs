//! Gmail API response normalization
//!
//! Converts Gmail wire messages to domain [`Message`] records. Fields the
//! requested projection omitted simply stay at their defaults.

use base64::prelude::*;
use chrono::{TimeZone, Utc};

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{EmailAddress, Message, MessageId};

/// Normalize a Gmail API message to a domain Message
pub fn normalize_message(gmail_msg: GmailMessage) -> Message {
    let id = MessageId::new(&gmail_msg.id);
    let label_ids = gmail_msg.label_ids.unwrap_or_default();

    let internal_date: i64 = gmail_msg
        .internal_date
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let received_at = Utc
        .timestamp_millis_opt(internal_date)
        .single()
        .unwrap_or_else(Utc::now);

    let from = gmail_msg
        .payload
        .as_ref()
        .and_then(|p| extract_header(p, "From"))
        .map(|s| EmailAddress::parse(&s));

    let subject = gmail_msg
        .payload
        .as_ref()
        .and_then(|p| extract_header(p, "Subject"))
        .unwrap_or_default();

    let body = gmail_msg.payload.as_ref().and_then(extract_plain_text_body);

    let snippet = gmail_msg
        .snippet
        .map(|s| decode_html_entities(&s))
        .unwrap_or_default();

    let mut builder = Message::builder(id)
        .label_ids(label_ids)
        .subject(subject)
        .snippet(snippet)
        .body(body)
        .received_at(received_at)
        .internal_date(internal_date);
    if let Some(from) = from {
        builder = builder.from(from);
    }
    builder.build()
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Extract plain text body from message payload
fn extract_plain_text_body(payload: &MessagePayload) -> Option<String> {
    // Simple message with body data
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
        && payload
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/plain"))
    {
        return decode_base64_body(data);
    }

    // Multipart: look for a text/plain part
    if let Some(parts) = &payload.parts
        && let Some(text) = find_plain_text_in_parts(parts)
    {
        return Some(text);
    }

    // Fall back to any body content
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        return decode_base64_body(data);
    }

    None
}

/// Recursively search message parts for text/plain content
fn find_plain_text_in_parts(parts: &[MessagePart]) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/plain"))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }

        if let Some(nested) = &part.parts
            && let Some(text) = find_plain_text_in_parts(nested)
        {
            return Some(text);
        }
    }

    None
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so multiple decoders
/// are tried.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            if let Ok(s) = String::from_utf8(decoded) {
                return Some(s);
            }
        }
    }

    None
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};

    fn payload_with_headers(headers: Vec<(&str, &str)>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            body: None,
            parts: None,
            mime_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = payload_with_headers(vec![("FROM", "test@example.com")]);
        assert_eq!(
            extract_header(&payload, "from"),
            Some("test@example.com".to_string())
        );
        assert_eq!(extract_header(&payload, "Subject"), None);
    }

    #[test]
    fn test_decode_base64_body() {
        // "Hello, World!" in base64url
        let decoded = decode_base64_body("SGVsbG8sIFdvcmxkIQ");
        assert_eq!(decoded, Some("Hello, World!".to_string()));
    }

    #[test]
    fn test_decode_html_entities() {
        assert_eq!(
            decode_html_entities("Reports &amp; alerts &lt;done&gt;"),
            "Reports & alerts <done>"
        );
    }

    #[test]
    fn test_normalize_full_message() {
        let msg = GmailMessage {
            id: "m1".to_string(),
            label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
            snippet: Some("All checks passed".to_string()),
            internal_date: Some("1700000000000".to_string()),
            payload: Some(MessagePayload {
                headers: Some(vec![
                    Header {
                        name: "From".to_string(),
                        value: "Pi <pi@example.com>".to_string(),
                    },
                    Header {
                        name: "Subject".to_string(),
                        value: "Nightly report".to_string(),
                    },
                ]),
                body: Some(MessageBody {
                    size: Some(13),
                    data: Some("SGVsbG8sIFdvcmxkIQ".to_string()),
                }),
                parts: None,
                mime_type: Some("text/plain".to_string()),
            }),
        };

        let message = normalize_message(msg);
        assert_eq!(message.id.as_str(), "m1");
        assert_eq!(message.subject, "Nightly report");
        assert_eq!(message.from.as_ref().unwrap().email, "pi@example.com");
        assert_eq!(message.body, Some("Hello, World!".to_string()));
        assert_eq!(message.internal_date, 1700000000000);
        assert!(message.label_ids.contains(&"UNREAD".to_string()));
    }

    #[test]
    fn test_normalize_minimal_message() {
        let msg = GmailMessage {
            id: "m2".to_string(),
            label_ids: Some(vec!["INBOX".to_string()]),
            snippet: None,
            internal_date: None,
            payload: None,
        };

        let message = normalize_message(msg);
        assert_eq!(message.id.as_str(), "m2");
        assert!(message.body.is_none());
        assert!(message.from.is_none());
        assert_eq!(message.subject, "");
    }
}
