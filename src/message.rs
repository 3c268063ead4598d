//! Mail data model shared by the scanner, triage policy, and transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single email retrieved from a mail folder.
///
/// Optional fields default gracefully: the scanner must never fail on a
/// message with a missing body or no attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Opaque identifier, unique within a folder listing.
    pub id: String,
    /// IMAP UID, when the transport provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    /// Raw From header (may contain display name plus angle-bracket address).
    pub from: String,
    /// Raw To header.
    pub to: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    /// Message size in bytes as reported by the server.
    #[serde(default)]
    pub size: u64,
    /// Protocol flags (e.g. `\Seen`).
    #[serde(default)]
    pub flags: Vec<String>,
    /// Short body preview for listings.
    #[serde(default)]
    pub preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Whether the `\Seen` flag is set.
    pub fn is_read(&self) -> bool {
        self.flags.iter().any(|f| f == "\\Seen")
    }
}

/// Attachment metadata. Content is never fetched — only the filename is
/// inspected by the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

/// Read-state filter for message listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFilter {
    Unread,
    Read,
    #[default]
    Both,
}

/// Options for listing messages in the selected folder.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of messages to return.
    pub count: Option<usize>,
    /// Number of messages to skip from the start of the listing.
    pub offset: usize,
    /// Substring match against the subject.
    pub search_phrase: Option<String>,
    pub filter: MessageFilter,
}

impl SearchOptions {
    /// List up to `count` unread messages.
    pub fn unread(count: usize) -> Self {
        Self {
            count: Some(count),
            filter: MessageFilter::Unread,
            ..Self::default()
        }
    }
}

/// Per-folder counters from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderStats {
    pub name: String,
    pub unread: u32,
    pub total: u32,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_read_checks_seen_flag() {
        let mut msg = test_message();
        assert!(!msg.is_read());
        msg.flags.push("\\Seen".into());
        assert!(msg.is_read());
    }

    #[test]
    fn search_options_unread() {
        let opts = SearchOptions::unread(50);
        assert_eq!(opts.count, Some(50));
        assert_eq!(opts.filter, MessageFilter::Unread);
        assert_eq!(opts.offset, 0);
    }

    #[test]
    fn message_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "1",
            "from": "a@example.com",
            "to": "b@example.com",
            "subject": "Hi",
            "date": "2025-06-01T12:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.body.is_none());
        assert!(msg.attachments.is_empty());
        assert!(msg.flags.is_empty());
        assert_eq!(msg.size, 0);
    }

    fn test_message() -> Message {
        Message {
            id: "1".into(),
            uid: None,
            from: "alice@example.com".into(),
            to: "bob@example.com".into(),
            subject: "Hello".into(),
            date: Utc::now(),
            size: 0,
            flags: vec![],
            preview: String::new(),
            body: None,
            attachments: vec![],
        }
    }
}
