//! Folder iteration and per-message content loading.

use crate::address::MailAddress;
use crate::error::Result;
use crate::profile::ConnectionProfile;
use crate::session::{FolderHandle, FolderMode, MailStore, RawMessage};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use mailbridge_mime::encoding::decode_text;
use mailbridge_mime::{ExtractedContent, InlinePart, MESSAGE_PARTIAL, PartPayload, extract};
use std::cell::OnceCell;

const DEFAULT_FOLDER: &str = "INBOX";

/// What to do with the folder walk after one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next message.
    Continue,
    /// Stop after this message.
    Stop,
}

/// Per-message callback result: how to continue and whether to flag the
/// message deleted.
///
/// Delete flags are committed only when the folder is open read-write;
/// [`Flow::Stop`] takes effect after the current message's flag is
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Walk continuation.
    pub flow: Flow,
    /// Flag this message deleted.
    pub delete: bool,
}

impl Verdict {
    /// Keep the message and continue.
    #[must_use]
    pub const fn keep() -> Self {
        Self {
            flow: Flow::Continue,
            delete: false,
        }
    }

    /// Flag the message deleted and continue.
    #[must_use]
    pub const fn delete() -> Self {
        Self {
            flow: Flow::Continue,
            delete: true,
        }
    }

    /// Keep the message and stop the walk.
    #[must_use]
    pub const fn stop() -> Self {
        Self {
            flow: Flow::Stop,
            delete: false,
        }
    }

    /// Flag the message deleted, then stop the walk.
    #[must_use]
    pub const fn delete_and_stop() -> Self {
        Self {
            flow: Flow::Stop,
            delete: true,
        }
    }
}

/// Folder walker invoking a callback once per message, in folder order.
#[derive(Debug, Clone)]
pub struct MailReceiver {
    profile: ConnectionProfile,
    folder_name: String,
    readonly: bool,
}

impl MailReceiver {
    /// Creates a receiver over the given connection profile, reading
    /// `INBOX` read-only.
    #[must_use]
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            folder_name: DEFAULT_FOLDER.to_string(),
            readonly: true,
        }
    }

    /// Sets the folder to walk. Blank names are ignored.
    #[must_use]
    pub fn folder_name(mut self, name: &str) -> Self {
        if !name.trim().is_empty() {
            self.folder_name = name.to_string();
        }
        self
    }

    /// Selects read-only (the default) or read-write access. Delete
    /// verdicts are honored only in read-write mode.
    #[must_use]
    pub const fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Connects, walks the folder and invokes the callback once per
    /// message.
    ///
    /// Folder and store teardown run on every exit path; their failures
    /// are logged and suppressed so they never mask the walk's own
    /// result.
    ///
    /// # Errors
    ///
    /// Returns connect, open and fetch failures, and any error the
    /// callback itself returns.
    pub fn execute<S, F>(&self, store: &mut S, mut callback: F) -> Result<()>
    where
        S: MailStore,
        F: FnMut(&MessageLoader) -> Result<Verdict>,
    {
        store.connect(&self.profile)?;
        let result = self.walk_folder(store, &mut callback);
        if let Err(error) = store.close() {
            tracing::warn!(%error, "failed to close store");
        }
        result
    }

    fn walk_folder<S, F>(&self, store: &mut S, callback: &mut F) -> Result<()>
    where
        S: MailStore,
        F: FnMut(&MessageLoader) -> Result<Verdict>,
    {
        let mode = if self.readonly {
            FolderMode::ReadOnly
        } else {
            FolderMode::ReadWrite
        };
        let mut folder = store.open_folder(&self.folder_name, mode)?;
        let result = self.process(&mut folder, callback);
        if let Err(error) = folder.close(!self.readonly) {
            tracing::warn!(%error, folder = %self.folder_name, "failed to close folder");
        }
        result
    }

    fn process<H, F>(&self, folder: &mut H, callback: &mut F) -> Result<()>
    where
        H: FolderHandle,
        F: FnMut(&MessageLoader) -> Result<Verdict>,
    {
        let messages = folder.fetch_all()?;
        tracing::debug!(
            folder = %self.folder_name,
            count = messages.len(),
            "walking folder"
        );
        for (index, message) in messages.into_iter().enumerate() {
            let loader = MessageLoader::new(message);
            let verdict = callback(&loader)?;
            if verdict.delete && !self.readonly {
                folder.mark_deleted(index)?;
            }
            if verdict.flow == Flow::Stop {
                break;
            }
        }
        Ok(())
    }
}

/// Read-side view over one received message.
///
/// Content extraction runs at most once; the first accessor touching
/// the body triggers it and later calls reuse the cached result.
#[derive(Debug)]
pub struct MessageLoader {
    message: RawMessage,
    content: OnceCell<ExtractedContent>,
}

impl MessageLoader {
    /// Wraps a raw message.
    #[must_use]
    pub fn new(message: RawMessage) -> Self {
        Self {
            message,
            content: OnceCell::new(),
        }
    }

    /// Returns the underlying raw message.
    #[must_use]
    pub const fn raw(&self) -> &RawMessage {
        &self.message
    }

    /// Returns the `Message-ID` header values joined with `,`, or an
    /// empty string.
    #[must_use]
    pub fn message_id(&self) -> String {
        self.message.header_values("Message-ID").join(",")
    }

    /// Returns the sending client identification: `User-Agent`, falling
    /// back to `X-Mailer`, or an empty string.
    #[must_use]
    pub fn user_agent(&self) -> String {
        let mua = self.message.header_values("User-Agent").join(",");
        if mua.trim().is_empty() {
            self.message.header_values("X-Mailer").join(",")
        } else {
            mua
        }
    }

    /// Returns the sent date, when the message carried one.
    #[must_use]
    pub const fn sent_date(&self) -> Option<DateTime<Utc>> {
        self.message.sent_date
    }

    /// Returns the message size in bytes, as reported by the store.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.message.size
    }

    /// Returns all message headers, in wire order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.message.headers
    }

    /// Returns the `From` addresses.
    #[must_use]
    pub fn from_list(&self) -> &[MailAddress] {
        &self.message.from
    }

    /// Returns the `Reply-To` addresses.
    #[must_use]
    pub fn reply_to_list(&self) -> &[MailAddress] {
        &self.message.reply_to
    }

    /// Returns the `To` addresses.
    #[must_use]
    pub fn to_list(&self) -> &[MailAddress] {
        &self.message.to
    }

    /// Returns the `Cc` addresses.
    #[must_use]
    pub fn cc_list(&self) -> &[MailAddress] {
        &self.message.cc
    }

    /// Returns the subject, tolerantly decoding encoded words.
    ///
    /// # Errors
    ///
    /// Returns an error when an encoded word names an unknown charset.
    pub fn subject(&self) -> Result<String> {
        Ok(decode_text(&self.message.subject)?)
    }

    /// Returns true when the message is one fragment of a split
    /// message.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.message.body.content_type().contains(MESSAGE_PARTIAL)
    }

    /// Returns the plain text body, empty if absent.
    ///
    /// # Errors
    ///
    /// Returns an error when content extraction fails.
    pub fn text(&self) -> Result<&str> {
        Ok(&self.content()?.text)
    }

    /// Returns the HTML body, empty if absent.
    ///
    /// # Errors
    ///
    /// Returns an error when content extraction fails.
    pub fn html(&self) -> Result<&str> {
        Ok(&self.content()?.html)
    }

    /// Returns the attachment parts, in wire order.
    ///
    /// # Errors
    ///
    /// Returns an error when content extraction fails.
    pub fn attachments(&self) -> Result<&[PartPayload]> {
        Ok(&self.content()?.attachments)
    }

    /// Returns the inline-referenced parts, in wire order.
    ///
    /// # Errors
    ///
    /// Returns an error when content extraction fails.
    pub fn inline_images(&self) -> Result<&[InlinePart]> {
        Ok(&self.content()?.inline_images)
    }

    /// Returns the raw fragment content of a split message, if this is
    /// one.
    ///
    /// # Errors
    ///
    /// Returns an error when content extraction fails.
    pub fn partial_content(&self) -> Result<Option<&Bytes>> {
        Ok(self.content()?.partial.as_ref())
    }

    fn content(&self) -> Result<&ExtractedContent> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let content = extract(&self.message.body)?;
        Ok(self.content.get_or_init(|| content))
    }
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
    use crate::error::Error;
    use mailbridge_mime::{Container, Leaf, MimeNode, MultipartSubtype, TEXT_PLAIN};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    struct MockStore {
        log: Rc<RefCell<Log>>,
        messages: Vec<RawMessage>,
        fail_folder_close: bool,
        fail_store_close: bool,
    }

    struct MockFolder {
        log: Rc<RefCell<Log>>,
        messages: Vec<RawMessage>,
        fail_close: bool,
    }

    impl MockStore {
        fn with_messages(messages: Vec<RawMessage>) -> Self {
            Self {
                log: Rc::new(RefCell::new(Log::default())),
                messages,
                fail_folder_close: false,
                fail_store_close: false,
            }
        }

        fn events(&self) -> Vec<String> {
            self.log.borrow().events.clone()
        }
    }

    impl MailStore for MockStore {
        type Folder = MockFolder;

        fn connect(&mut self, _profile: &ConnectionProfile) -> Result<()> {
            self.log.borrow_mut().events.push("connect".to_string());
            Ok(())
        }

        fn open_folder(&mut self, name: &str, mode: FolderMode) -> Result<Self::Folder> {
            self.log
                .borrow_mut()
                .events
                .push(format!("open:{name}:{mode:?}"));
            Ok(MockFolder {
                log: Rc::clone(&self.log),
                messages: self.messages.clone(),
                fail_close: self.fail_folder_close,
            })
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().events.push("store_close".to_string());
            if self.fail_store_close {
                return Err(Error::transport("store close failed"));
            }
            Ok(())
        }
    }

    impl FolderHandle for MockFolder {
        fn fetch_all(&mut self) -> Result<Vec<RawMessage>> {
            Ok(self.messages.clone())
        }

        fn mark_deleted(&mut self, index: usize) -> Result<()> {
            self.log.borrow_mut().events.push(format!("mark:{index}"));
            Ok(())
        }

        fn close(&mut self, expunge: bool) -> Result<()> {
            self.log
                .borrow_mut()
                .events
                .push(format!("folder_close:expunge={expunge}"));
            if self.fail_close {
                return Err(Error::transport("folder close failed"));
            }
            Ok(())
        }
    }

    fn text_message(subject: &str, body: &str) -> RawMessage {
        RawMessage {
            headers: Vec::new(),
            from: Vec::new(),
            reply_to: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            subject: subject.to_string(),
            sent_date: None,
            size: body.len(),
            body: MimeNode::Leaf(Leaf::new(
                "text/plain; charset=utf-8",
                Bytes::copy_from_slice(body.as_bytes()),
            )),
        }
    }

    #[test]
    fn test_walk_visits_messages_in_order() {
        let mut store =
            MockStore::with_messages(vec![text_message("a", "1"), text_message("b", "2")]);
        let mut seen = Vec::new();

        MailReceiver::new(ConnectionProfile::imap())
            .execute(&mut store, |loader| {
                seen.push(loader.subject().unwrap());
                Ok(Verdict::keep())
            })
            .unwrap();

        assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            store.events(),
            vec![
                "connect",
                "open:INBOX:ReadOnly",
                "folder_close:expunge=false",
                "store_close",
            ]
        );
    }

    #[test]
    fn test_delete_committed_only_in_read_write() {
        let messages = vec![text_message("a", "1"), text_message("b", "2")];

        let mut readonly = MockStore::with_messages(messages.clone());
        MailReceiver::new(ConnectionProfile::imap())
            .execute(&mut readonly, |_| Ok(Verdict::delete()))
            .unwrap();
        assert!(!readonly.events().iter().any(|e| e.starts_with("mark:")));

        let mut writable = MockStore::with_messages(messages);
        MailReceiver::new(ConnectionProfile::imap())
            .readonly(false)
            .execute(&mut writable, |_| Ok(Verdict::delete()))
            .unwrap();
        let events = writable.events();
        assert!(events.contains(&"mark:0".to_string()));
        assert!(events.contains(&"mark:1".to_string()));
        assert!(events.contains(&"folder_close:expunge=true".to_string()));
    }

    #[test]
    fn test_stop_commits_current_delete_then_breaks() {
        let mut store = MockStore::with_messages(vec![
            text_message("a", "1"),
            text_message("b", "2"),
            text_message("c", "3"),
        ]);
        let mut visited = 0;

        MailReceiver::new(ConnectionProfile::imap())
            .readonly(false)
            .execute(&mut store, |_| {
                visited += 1;
                if visited == 2 {
                    Ok(Verdict::delete_and_stop())
                } else {
                    Ok(Verdict::keep())
                }
            })
            .unwrap();

        assert_eq!(visited, 2);
        let events = store.events();
        assert!(events.contains(&"mark:1".to_string()));
        assert!(!events.contains(&"mark:2".to_string()));
    }

    #[test]
    fn test_callback_error_still_closes_everything() {
        let mut store = MockStore::with_messages(vec![text_message("a", "1")]);

        let result = MailReceiver::new(ConnectionProfile::imap())
            .execute(&mut store, |_| Err(Error::transport("boom")));

        assert!(matches!(result, Err(Error::Transport(_))));
        let events = store.events();
        assert!(events.contains(&"folder_close:expunge=false".to_string()));
        assert!(events.contains(&"store_close".to_string()));
    }

    #[test]
    fn test_close_failure_never_masks_success() {
        let mut store = MockStore::with_messages(vec![text_message("a", "1")]);
        store.fail_folder_close = true;
        store.fail_store_close = true;

        MailReceiver::new(ConnectionProfile::imap())
            .execute(&mut store, |_| Ok(Verdict::keep()))
            .unwrap();
    }

    #[test]
    fn test_folder_name_blank_keeps_default() {
        let mut store = MockStore::with_messages(Vec::new());
        MailReceiver::new(ConnectionProfile::imap())
            .folder_name("  ")
            .execute(&mut store, |_| Ok(Verdict::keep()))
            .unwrap();
        assert!(store.events().contains(&"open:INBOX:ReadOnly".to_string()));

        let mut store = MockStore::with_messages(Vec::new());
        MailReceiver::new(ConnectionProfile::imap())
            .folder_name("Archive")
            .execute(&mut store, |_| Ok(Verdict::keep()))
            .unwrap();
        assert!(store.events().contains(&"open:Archive:ReadOnly".to_string()));
    }

    #[test]
    fn test_loader_extracts_once_and_caches() {
        let loader = MessageLoader::new(text_message("s", "body"));
        let first = loader.text().unwrap();
        let second = loader.text().unwrap();
        assert_eq!(first, "body");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_loader_header_accessors() {
        let mut message = text_message("s", "b");
        message.headers = vec![
            ("Message-ID".to_string(), "<a@x>".to_string()),
            ("Message-ID".to_string(), "<b@x>".to_string()),
            ("X-Mailer".to_string(), "LegacyMailer 1.0".to_string()),
        ];
        let loader = MessageLoader::new(message);
        assert_eq!(loader.message_id(), "<a@x>,<b@x>");
        assert_eq!(loader.user_agent(), "LegacyMailer 1.0");

        let mut message = text_message("s", "b");
        message.headers = vec![("User-Agent".to_string(), "Modern/2".to_string())];
        let loader = MessageLoader::new(message);
        assert_eq!(loader.user_agent(), "Modern/2");
    }

    #[test]
    fn test_loader_decodes_subject() {
        let loader = MessageLoader::new(text_message("=?UTF-8?B?44GT44KT44Gr44Gh44Gv?=", "b"));
        assert_eq!(loader.subject().unwrap(), "こんにちは");
    }

    #[test]
    fn test_partial_message_detected() {
        let mut message = text_message("s", "");
        message.body = MimeNode::Leaf(Leaf::new(
            "message/partial; id=\"x\"; number=1; total=2",
            Bytes::from_static(b"fragment"),
        ));
        let loader = MessageLoader::new(message);

        assert!(loader.is_partial());
        assert_eq!(
            loader.partial_content().unwrap(),
            Some(&Bytes::from_static(b"fragment"))
        );
        assert_eq!(loader.text().unwrap(), "");
        assert!(loader.attachments().unwrap().is_empty());
    }

    #[test]
    fn test_loader_buckets_multipart_content() {
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Leaf(Leaf::new(
            TEXT_PLAIN,
            Bytes::from_static(b"plain"),
        )));
        mixed.push(MimeNode::Leaf(
            Leaf::new(
                "application/pdf",
                Bytes::from_static(b"%PDF"),
            )
            .with_disposition(mailbridge_mime::Disposition::Attachment)
            .with_file_name("report.pdf"),
        ));

        let mut message = text_message("s", "");
        message.body = MimeNode::Container(mixed);
        let loader = MessageLoader::new(message);

        assert_eq!(loader.text().unwrap(), "plain");
        let attachments = loader.attachments().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].file_name, "report.pdf");
    }
}
