//! File-like message parts: attachments and inline images.

use bytes::Bytes;

/// A file-like message part: a name plus a readable byte source.
///
/// The content is reference-counted, so the same source can be read by
/// the composer and by the caller without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPayload {
    /// File name, possibly empty.
    pub file_name: String,
    /// Part content.
    pub content: Bytes,
}

impl PartPayload {
    /// Creates a new part payload.
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// An inline-referenced part, typically an image embedded in an HTML
/// body through its content-id.
///
/// Usable anywhere a [`PartPayload`] is accepted via
/// [`From<InlinePart>`] or [`InlinePart::payload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePart {
    /// Content-ID referenced by the HTML body (`cid:` URL).
    pub content_id: String,
    /// The underlying file part.
    pub payload: PartPayload,
}

impl InlinePart {
    /// Creates a new inline part.
    pub fn new(
        content_id: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            payload: PartPayload::new(file_name, content),
        }
    }

    /// Returns the file name of the underlying part.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.payload.file_name
    }

    /// Returns the content of the underlying part.
    #[must_use]
    pub const fn content(&self) -> &Bytes {
        &self.payload.content
    }

    /// Returns the underlying part payload.
    #[must_use]
    pub const fn payload(&self) -> &PartPayload {
        &self.payload
    }
}

impl From<InlinePart> for PartPayload {
    fn from(part: InlinePart) -> Self {
        part.payload
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

    #[test]
    fn test_payload_content_shared() {
        let payload = PartPayload::new("report.pdf", &b"%PDF"[..]);
        let copy = payload.clone();
        // Both handles read the same bytes.
        assert_eq!(payload.content, copy.content);
        assert_eq!(&payload.content[..], b"%PDF");
    }

    #[test]
    fn test_inline_part_substitutes_for_payload() {
        let inline = InlinePart::new("logo@example", "logo.png", &b"PNG"[..]);
        assert_eq!(inline.file_name(), "logo.png");

        let payload: PartPayload = inline.into();
        assert_eq!(payload.file_name, "logo.png");
        assert_eq!(&payload.content[..], b"PNG");
    }
}
