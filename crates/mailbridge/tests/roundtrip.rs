//! End-to-end send/receive tests over an in-memory session.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use bytes::Bytes;
use mailbridge::{
    ConnectionProfile, Error, FolderHandle, FolderMode, MailAddress, MailReceiver, MailSender,
    MailStore, MailTransport, OutboundMessage, RawMessage, Result, Verdict,
};
use mailbridge::mime::{InlinePart, PartPayload};
use std::cell::RefCell;
use std::rc::Rc;

/// One shared mailbox acting as both the submission endpoint and the
/// folder store, so a sent message can be read back unchanged.
#[derive(Default)]
struct InMemoryMailbox {
    messages: Rc<RefCell<Vec<RawMessage>>>,
    next_id: u32,
}

impl InMemoryMailbox {
    fn deliver(&mut self, message: &OutboundMessage) {
        self.next_id += 1;
        let mut headers = message.headers.clone();
        headers.push((
            "Message-ID".to_string(),
            format!("<{}@mem.example>", self.next_id),
        ));
        headers.push(("User-Agent".to_string(), "mailbridge-test".to_string()));

        self.messages.borrow_mut().push(RawMessage {
            headers,
            from: vec![MailAddress::new(message.from.clone())],
            reply_to: message.reply_to.iter().cloned().map(MailAddress::new).collect(),
            to: message.to.iter().cloned().map(MailAddress::new).collect(),
            cc: message.cc.iter().cloned().map(MailAddress::new).collect(),
            subject: message.subject.clone(),
            sent_date: Some(message.sent_date),
            size: 0,
            body: message.body.clone(),
        });
    }
}

impl MailTransport for InMemoryMailbox {
    fn send(&mut self, _profile: &ConnectionProfile, message: &OutboundMessage) -> Result<()> {
        self.deliver(message);
        Ok(())
    }
}

struct InMemoryFolder {
    messages: Rc<RefCell<Vec<RawMessage>>>,
    flagged: Vec<usize>,
}

impl MailStore for InMemoryMailbox {
    type Folder = InMemoryFolder;

    fn connect(&mut self, _profile: &ConnectionProfile) -> Result<()> {
        Ok(())
    }

    fn open_folder(&mut self, name: &str, _mode: FolderMode) -> Result<Self::Folder> {
        if name != "INBOX" {
            return Err(Error::transport(format!("no such folder: {name}")));
        }
        Ok(InMemoryFolder {
            messages: Rc::clone(&self.messages),
            flagged: Vec::new(),
        })
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl FolderHandle for InMemoryFolder {
    fn fetch_all(&mut self) -> Result<Vec<RawMessage>> {
        Ok(self.messages.borrow().clone())
    }

    fn mark_deleted(&mut self, index: usize) -> Result<()> {
        self.flagged.push(index);
        Ok(())
    }

    fn close(&mut self, expunge: bool) -> Result<()> {
        if expunge {
            let mut messages = self.messages.borrow_mut();
            let flagged = std::mem::take(&mut self.flagged);
            let mut index = 0;
            messages.retain(|_| {
                let keep = !flagged.contains(&index);
                index += 1;
                keep
            });
        }
        Ok(())
    }
}

#[test]
fn sent_message_reads_back_with_all_content_buckets() {
    let mut mailbox = InMemoryMailbox::default();

    MailSender::new(ConnectionProfile::smtp())
        .from(MailAddress::with_personal("sender@example.com", "Sänder"))
        .to(MailAddress::new("rcpt@example.com"))
        .subject("Größenbericht")
        .text("plain body")
        .html("<p>html body <img src=\"cid:logo\"></p>")
        .attachment(PartPayload::new("report.pdf", Bytes::from_static(b"%PDF-1.4")))
        .inline_image(InlinePart::new("logo", "logo.png", Bytes::from_static(b"PNG")))
        .execute(&mut mailbox)
        .unwrap();

    let mut loaded = Vec::new();
    MailReceiver::new(ConnectionProfile::imap())
        .execute(&mut mailbox, |loader| {
            loaded.push((
                loader.subject().unwrap(),
                loader.text().unwrap().to_string(),
                loader.html().unwrap().to_string(),
                loader.attachments().unwrap().to_vec(),
                loader.inline_images().unwrap().to_vec(),
                loader.message_id(),
                loader.user_agent(),
            ));
            Ok(Verdict::keep())
        })
        .unwrap();

    let (subject, text, html, attachments, inline_images, message_id, user_agent) = &loaded[0];
    assert_eq!(subject, "Größenbericht");
    assert_eq!(text, "plain body");
    assert_eq!(html, "<p>html body <img src=\"cid:logo\"></p>");
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].file_name, "report.pdf");
    assert_eq!(&attachments[0].content[..], b"%PDF-1.4");
    assert_eq!(inline_images.len(), 1);
    assert_eq!(inline_images[0].content_id, "logo");
    assert_eq!(&inline_images[0].content()[..], b"PNG");
    assert_eq!(message_id, "<1@mem.example>");
    assert_eq!(user_agent, "mailbridge-test");
}

#[test]
fn read_write_delete_expunges_on_close() {
    let mut mailbox = InMemoryMailbox::default();
    for subject in ["first", "second", "third"] {
        MailSender::new(ConnectionProfile::smtp())
            .from(MailAddress::new("sender@example.com"))
            .to(MailAddress::new("rcpt@example.com"))
            .subject(subject)
            .text(subject)
            .execute(&mut mailbox)
            .unwrap();
    }

    MailReceiver::new(ConnectionProfile::pop3())
        .readonly(false)
        .execute(&mut mailbox, |loader| {
            if loader.subject().unwrap() == "second" {
                Ok(Verdict::delete())
            } else {
                Ok(Verdict::keep())
            }
        })
        .unwrap();

    let mut remaining = Vec::new();
    MailReceiver::new(ConnectionProfile::pop3())
        .execute(&mut mailbox, |loader| {
            remaining.push(loader.subject().unwrap());
            Ok(Verdict::keep())
        })
        .unwrap();
    assert_eq!(remaining, vec!["first".to_string(), "third".to_string()]);
}

#[test]
fn unknown_folder_fails_but_reaches_no_callback() {
    let mut mailbox = InMemoryMailbox::default();
    let mut called = false;

    let result = MailReceiver::new(ConnectionProfile::imap())
        .folder_name("Drafts")
        .execute(&mut mailbox, |_| {
            called = true;
            Ok(Verdict::keep())
        });

    assert!(matches!(result, Err(Error::Transport(_))));
    assert!(!called);
}
