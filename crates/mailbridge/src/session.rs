//! Session collaborator surface.
//!
//! The network session, folder store and wire serialization live behind
//! these traits; the crate itself never opens a socket. Implementations
//! adapt a concrete protocol library (or a test double) to the
//! [`Sender`](crate::send::MailSender) and
//! [`Receiver`](crate::receive::MailReceiver) orchestration.

use crate::address::MailAddress;
use crate::error::Result;
use crate::profile::ConnectionProfile;
use chrono::{DateTime, Utc};
use mailbridge_mime::MimeNode;

/// Folder access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMode {
    /// Messages can be read but not flagged or expunged.
    ReadOnly,
    /// Messages can be flagged deleted and expunged on close.
    ReadWrite,
}

/// A fully rendered outbound message, ready for the session library to
/// serialize and submit.
///
/// All header strings are already wire-encoded; the body is the
/// composed part tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Encoded `From` header value.
    pub from: String,
    /// Encoded `Reply-To` header values.
    pub reply_to: Vec<String>,
    /// Encoded `To` header values.
    pub to: Vec<String>,
    /// Encoded `Cc` header values.
    pub cc: Vec<String>,
    /// Encoded `Bcc` header values.
    pub bcc: Vec<String>,
    /// Encoded `Subject` header value.
    pub subject: String,
    /// Submission timestamp.
    pub sent_date: DateTime<Utc>,
    /// Extra headers, in registration order.
    pub headers: Vec<(String, String)>,
    /// Composed body tree.
    pub body: MimeNode,
}

/// A received message as handed over by the store, before any content
/// extraction.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// All message headers, in wire order.
    pub headers: Vec<(String, String)>,
    /// `From` addresses.
    pub from: Vec<MailAddress>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<MailAddress>,
    /// `To` addresses.
    pub to: Vec<MailAddress>,
    /// `Cc` addresses.
    pub cc: Vec<MailAddress>,
    /// Raw (possibly encoded-word) subject.
    pub subject: String,
    /// Parsed `Date` header, when present.
    pub sent_date: Option<DateTime<Utc>>,
    /// Message size in bytes, as reported by the store.
    pub size: usize,
    /// Parsed part tree.
    pub body: MimeNode,
}

impl RawMessage {
    /// Returns all values for the named header, matched
    /// case-insensitively, in wire order.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Returns the first value for the named header, matched
    /// case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outbound submission endpoint.
pub trait MailTransport {
    /// Submits one message over a session configured from the profile.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be established or the
    /// message is rejected.
    fn send(&mut self, profile: &ConnectionProfile, message: &OutboundMessage) -> Result<()>;
}

/// Inbound message store.
pub trait MailStore {
    /// Open-folder handle type.
    type Folder: FolderHandle;

    /// Establishes the session described by the profile.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting or authenticating fails.
    fn connect(&mut self, profile: &ConnectionProfile) -> Result<()>;

    /// Opens the named folder in the given mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the folder does not exist or cannot be
    /// opened in that mode.
    fn open_folder(&mut self, name: &str, mode: FolderMode) -> Result<Self::Folder>;

    /// Tears down the session.
    ///
    /// # Errors
    ///
    /// Returns an error when the session cannot be closed cleanly.
    fn close(&mut self) -> Result<()>;
}

/// One open folder.
pub trait FolderHandle {
    /// Fetches every message in the folder, in folder order.
    ///
    /// # Errors
    ///
    /// Returns an error when the fetch fails.
    fn fetch_all(&mut self) -> Result<Vec<RawMessage>>;

    /// Flags the message at `index` (folder order, zero-based) as
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns an error when the flag cannot be set.
    fn mark_deleted(&mut self, index: usize) -> Result<()>;

    /// Closes the folder, expunging flagged messages when `expunge` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error when the close fails.
    fn close(&mut self, expunge: bool) -> Result<()>;
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mailbridge_mime::{Leaf, TEXT_PLAIN};

    fn message_with_headers(headers: Vec<(String, String)>) -> RawMessage {
        RawMessage {
            headers,
            from: Vec::new(),
            reply_to: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            subject: String::new(),
            sent_date: None,
            size: 0,
            body: MimeNode::Leaf(Leaf::new(TEXT_PLAIN, Bytes::new())),
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let message = message_with_headers(vec![
            ("Message-ID".to_string(), "<a@x>".to_string()),
            ("message-id".to_string(), "<b@x>".to_string()),
        ]);
        assert_eq!(message.header_values("MESSAGE-ID"), vec!["<a@x>", "<b@x>"]);
        assert_eq!(message.header("Message-Id"), Some("<a@x>"));
    }

    #[test]
    fn test_header_missing_is_empty() {
        let message = message_with_headers(Vec::new());
        assert!(message.header_values("User-Agent").is_empty());
        assert!(message.header("User-Agent").is_none());
    }
}
