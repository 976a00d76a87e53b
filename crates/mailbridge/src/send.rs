//! Outbound message building and submission.

use crate::address::MailAddress;
use crate::error::{Error, Result};
use crate::profile::ConnectionProfile;
use crate::session::{MailTransport, OutboundMessage};
use chrono::Utc;
use mailbridge_mime::encoding::encode_word;
use mailbridge_mime::{Composer, InlinePart, PartPayload};

const DEFAULT_CHARSET: &str = "utf-8";
const DEFAULT_TRANSFER_ENCODING: &str = "8bit";
const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

/// Fluent builder collecting everything one outbound message needs,
/// then handing the rendered result to a [`MailTransport`].
///
/// Blank inputs on every setter are ignored rather than stored, so
/// callers can thread optional form fields straight through.
#[derive(Debug, Clone)]
pub struct MailSender {
    profile: ConnectionProfile,
    charset: String,
    headers: Vec<(String, String)>,
    from: Option<MailAddress>,
    reply_to: Vec<MailAddress>,
    to: Vec<MailAddress>,
    cc: Vec<MailAddress>,
    bcc: Vec<MailAddress>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<PartPayload>,
    inline_images: Vec<InlinePart>,
}

impl MailSender {
    /// Creates a sender over the given connection profile.
    ///
    /// Defaults to UTF-8 content with an `8bit` transfer encoding.
    #[must_use]
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            charset: DEFAULT_CHARSET.to_string(),
            headers: vec![(
                CONTENT_TRANSFER_ENCODING.to_string(),
                DEFAULT_TRANSFER_ENCODING.to_string(),
            )],
            from: None,
            reply_to: Vec::new(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            text: None,
            html: None,
            attachments: Vec::new(),
            inline_images: Vec::new(),
        }
    }

    /// Registers a header attached to the message and to its textual
    /// body parts. A no-op unless both key and value are non-blank;
    /// a repeated key replaces the earlier value.
    #[must_use]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if key.trim().is_empty() || value.trim().is_empty() {
            return self;
        }
        self.set_header(key, value);
        self
    }

    /// Sets the charset used for bodies, subject, display names and
    /// file names. Blank values are ignored.
    #[must_use]
    pub fn charset(mut self, charset: &str) -> Self {
        if !charset.trim().is_empty() {
            self.charset = charset.to_string();
        }
        self
    }

    /// Sets the charset together with the transfer encoding advertised
    /// on textual parts.
    #[must_use]
    pub fn charset_with_encoding(mut self, charset: &str, transfer_encoding: &str) -> Self {
        if !transfer_encoding.trim().is_empty() {
            self.set_header(CONTENT_TRANSFER_ENCODING, transfer_encoding);
        }
        self.charset(charset)
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, address: MailAddress) -> Self {
        self.from = Some(address);
        self
    }

    /// Adds a reply-to address.
    #[must_use]
    pub fn reply_to(mut self, address: MailAddress) -> Self {
        self.reply_to.push(address);
        self
    }

    /// Adds a primary recipient.
    #[must_use]
    pub fn to(mut self, address: MailAddress) -> Self {
        self.to.push(address);
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn cc(mut self, address: MailAddress) -> Self {
        self.cc.push(address);
        self
    }

    /// Adds a blind-carbon-copy recipient.
    #[must_use]
    pub fn bcc(mut self, address: MailAddress) -> Self {
        self.bcc.push(address);
        self
    }

    /// Sets the subject. Blank values are ignored.
    #[must_use]
    pub fn subject(mut self, subject: &str) -> Self {
        if !subject.trim().is_empty() {
            self.subject = subject.to_string();
        }
        self
    }

    /// Sets the plain-text body. Blank values are ignored.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        if !text.trim().is_empty() {
            self.text = Some(text.to_string());
        }
        self
    }

    /// Sets the HTML body. Blank values are ignored.
    #[must_use]
    pub fn html(mut self, html: &str) -> Self {
        if !html.trim().is_empty() {
            self.html = Some(html.to_string());
        }
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attachment(mut self, attachment: PartPayload) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds an inline image referenced from the HTML body.
    #[must_use]
    pub fn inline_image(mut self, image: InlinePart) -> Self {
        self.inline_images.push(image);
        self
    }

    /// Renders the message and submits it through the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFrom`] when no sender address was set,
    /// an encoding error when a header or body cannot be represented in
    /// the configured charset, and transport failures unchanged.
    pub fn execute(&self, transport: &mut impl MailTransport) -> Result<()> {
        let from = self.from.as_ref().ok_or(Error::MissingFrom)?;

        let mut composer = Composer::new(&self.charset);
        for (key, value) in &self.headers {
            composer = composer.with_header(key.clone(), value.clone());
        }
        let body = composer.compose(
            self.text.as_deref(),
            self.html.as_deref(),
            &self.attachments,
            &self.inline_images,
        )?;

        let message = OutboundMessage {
            from: from.to_header(&self.charset)?,
            reply_to: self.render_addresses(&self.reply_to)?,
            to: self.render_addresses(&self.to)?,
            cc: self.render_addresses(&self.cc)?,
            bcc: self.render_addresses(&self.bcc)?,
            subject: encode_word(&self.subject, &self.charset)?,
            sent_date: Utc::now(),
            headers: self.headers.clone(),
            body,
        };

        tracing::info!(
            to = self.to.len(),
            cc = self.cc.len(),
            bcc = self.bcc.len(),
            attachments = self.attachments.len(),
            "submitting message"
        );
        transport.send(&self.profile, &message)
    }

    fn set_header(&mut self, key: &str, value: &str) {
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            slot.1 = value.to_string();
        } else {
            self.headers.push((key.to_string(), value.to_string()));
        }
    }

    fn render_addresses(&self, addresses: &[MailAddress]) -> Result<Vec<String>> {
        addresses
            .iter()
            .map(|address| address.to_header(&self.charset))
            .collect()
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
    use bytes::Bytes;
    use mailbridge_mime::{MimeNode, MultipartSubtype, TEXT_PLAIN};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<OutboundMessage>,
        fail: bool,
    }

    impl MailTransport for RecordingTransport {
        fn send(
            &mut self,
            _profile: &ConnectionProfile,
            message: &OutboundMessage,
        ) -> Result<()> {
            if self.fail {
                return Err(Error::transport("552 mailbox full"));
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn sender() -> MailSender {
        MailSender::new(ConnectionProfile::smtp())
            .from(MailAddress::new("sender@example.com"))
            .to(MailAddress::new("rcpt@example.com"))
    }

    #[test]
    fn test_execute_without_from_fails() {
        let mut transport = RecordingTransport::default();
        let result = MailSender::new(ConnectionProfile::smtp())
            .to(MailAddress::new("rcpt@example.com"))
            .execute(&mut transport);
        assert!(matches!(result, Err(Error::MissingFrom)));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_execute_renders_headers_and_body() {
        let mut transport = RecordingTransport::default();
        sender()
            .subject("Grüße")
            .text("hello")
            .execute(&mut transport)
            .unwrap();

        let message = &transport.sent[0];
        assert_eq!(message.from, "sender@example.com");
        assert_eq!(message.to, vec!["rcpt@example.com".to_string()]);
        assert!(message.subject.starts_with("=?utf-8?B?"));

        let MimeNode::Leaf(leaf) = &message.body else {
            panic!("text-only message must compose a single leaf");
        };
        assert!(leaf.content_type.starts_with(TEXT_PLAIN));
        assert_eq!(leaf.body, Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_default_transfer_encoding_header() {
        let mut transport = RecordingTransport::default();
        sender().text("x").execute(&mut transport).unwrap();
        assert_eq!(
            transport.sent[0].headers,
            vec![("Content-Transfer-Encoding".to_string(), "8bit".to_string())]
        );
    }

    #[test]
    fn test_charset_with_encoding_replaces_default_header() {
        let mut transport = RecordingTransport::default();
        sender()
            .charset_with_encoding("iso-2022-jp", "7bit")
            .text("x")
            .execute(&mut transport)
            .unwrap();

        let headers = &transport.sent[0].headers;
        assert_eq!(
            headers,
            &vec![("Content-Transfer-Encoding".to_string(), "7bit".to_string())]
        );
    }

    #[test]
    fn test_blank_setters_are_noops() {
        let built = sender()
            .subject("kept")
            .subject("   ")
            .charset("")
            .header("", "value")
            .header("X-Key", " ")
            .text("kept body")
            .text("");

        let mut transport = RecordingTransport::default();
        built.execute(&mut transport).unwrap();
        let message = &transport.sent[0];
        assert_eq!(message.subject, "kept");
        assert_eq!(message.headers.len(), 1);

        let MimeNode::Leaf(leaf) = &message.body else {
            panic!("expected single leaf");
        };
        assert_eq!(leaf.body, Bytes::from_static(b"kept body"));
    }

    #[test]
    fn test_full_message_composes_mixed_tree() {
        let mut transport = RecordingTransport::default();
        sender()
            .text("plain")
            .html("<p>hi</p>")
            .attachment(PartPayload::new("a.bin", Bytes::from_static(b"\x00\x01")))
            .execute(&mut transport)
            .unwrap();

        let MimeNode::Container(container) = &transport.sent[0].body else {
            panic!("expected container");
        };
        assert_eq!(container.subtype, MultipartSubtype::Mixed);
        assert_eq!(container.children.len(), 2);
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };
        let result = sender().text("x").execute(&mut transport);
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_unencodable_subject_fails_before_send() {
        let mut transport = RecordingTransport::default();
        let result = sender()
            .charset("iso-8859-1")
            .subject("Кириллица")
            .text("x")
            .execute(&mut transport);
        assert!(matches!(result, Err(Error::Mime(_))));
        assert!(transport.sent.is_empty());
    }
}
