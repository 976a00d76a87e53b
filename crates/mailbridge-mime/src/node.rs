//! MIME part tree model.

use bytes::Bytes;
use std::fmt;

/// Content type literal for plain text parts.
pub const TEXT_PLAIN: &str = "text/plain";

/// Content type literal for HTML parts.
pub const TEXT_HTML: &str = "text/html";

/// Content type literal for one fragment of a split message.
pub const MESSAGE_PARTIAL: &str = "message/partial";

/// Default content type for file parts of unknown type.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Multipart container subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartSubtype {
    /// Independent parts, typically a body plus attachments.
    Mixed,
    /// Interchangeable renderings of the same content.
    Alternative,
    /// A root part plus the resources it references inline.
    Related,
}

impl MultipartSubtype {
    /// Returns the content type literal for this subtype.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Mixed => "multipart/mixed",
            Self::Alternative => "multipart/alternative",
            Self::Related => "multipart/related",
        }
    }
}

impl fmt::Display for MultipartSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}

/// How a receiving client should present a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Presented as a downloadable file.
    Attachment,
    /// Rendered inside the message body.
    Inline,
}

impl Disposition {
    /// Returns the wire literal for this disposition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }

    /// Parses a wire disposition string, ignoring parameters and case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let base = value.split(';').next().unwrap_or(value).trim();
        if base.eq_ignore_ascii_case("attachment") {
            Some(Self::Attachment)
        } else if base.eq_ignore_ascii_case("inline") {
            Some(Self::Inline)
        } else {
            None
        }
    }
}

/// A MIME tree node: either a content-bearing leaf or a multipart
/// container of ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeNode {
    /// Content-bearing part with no children.
    Leaf(Leaf),
    /// Multipart container.
    Container(Container),
}

impl MimeNode {
    /// Returns the declared content type of this node.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.content_type,
            Self::Container(container) => container.subtype.content_type(),
        }
    }

    /// Returns true for multipart containers.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Container(_))
    }
}

/// A content-bearing MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Full content type string, parameters included.
    pub content_type: String,
    /// Part body, already transfer-decoded.
    pub body: Bytes,
    /// Presentation disposition, if any.
    pub disposition: Option<Disposition>,
    /// Content-ID for inline-referenced parts.
    pub content_id: Option<String>,
    /// Wire-encoded file name for file-like parts.
    pub file_name: Option<String>,
    /// Extra part headers.
    pub headers: Vec<(String, String)>,
}

impl Leaf {
    /// Creates a new leaf with the given content type and body.
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
            disposition: None,
            content_id: None,
            file_name: None,
            headers: Vec::new(),
        }
    }

    /// Sets the disposition.
    #[must_use]
    pub const fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    /// Sets the content-id.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// Sets the wire-encoded file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Replaces the part headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the charset parameter of the content type, if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"'))
            } else {
                None
            }
        })
    }
}

/// A multipart container holding an ordered child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Multipart subtype.
    pub subtype: MultipartSubtype,
    /// Child nodes, in wire order.
    pub children: Vec<MimeNode>,
}

impl Container {
    /// Creates an empty container of the given subtype.
    #[must_use]
    pub const fn new(subtype: MultipartSubtype) -> Self {
        Self {
            subtype,
            children: Vec::new(),
        }
    }

    /// Appends a child node.
    pub fn push(&mut self, node: MimeNode) {
        self.children.push(node);
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
    fn test_subtype_content_types() {
        assert_eq!(MultipartSubtype::Mixed.content_type(), "multipart/mixed");
        assert_eq!(
            MultipartSubtype::Alternative.content_type(),
            "multipart/alternative"
        );
        assert_eq!(
            MultipartSubtype::Related.content_type(),
            "multipart/related"
        );
    }

    #[test]
    fn test_disposition_literals() {
        assert_eq!(Disposition::Attachment.as_str(), "attachment");
        assert_eq!(Disposition::Inline.as_str(), "inline");
    }

    #[test]
    fn test_disposition_parse() {
        assert_eq!(
            Disposition::parse("attachment; filename=a.txt"),
            Some(Disposition::Attachment)
        );
        assert_eq!(Disposition::parse("INLINE"), Some(Disposition::Inline));
        assert_eq!(Disposition::parse("form-data"), None);
    }

    #[test]
    fn test_leaf_charset_param() {
        let leaf = Leaf::new("text/plain; charset=ISO-2022-JP", &b""[..]);
        assert_eq!(leaf.charset(), Some("ISO-2022-JP"));

        let quoted = Leaf::new("text/html; charset=\"utf-8\"", &b""[..]);
        assert_eq!(quoted.charset(), Some("utf-8"));

        let bare = Leaf::new("text/plain", &b""[..]);
        assert_eq!(bare.charset(), None);
    }

    #[test]
    fn test_node_content_type() {
        let leaf = MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"hi"[..]));
        assert_eq!(leaf.content_type(), "text/plain");
        assert!(!leaf.is_multipart());

        let container = MimeNode::Container(Container::new(MultipartSubtype::Mixed));
        assert_eq!(container.content_type(), "multipart/mixed");
        assert!(container.is_multipart());
    }
}
