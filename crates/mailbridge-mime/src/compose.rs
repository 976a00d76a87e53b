//! MIME tree composition.
//!
//! Turns a flat set of optional content categories (plain text, HTML,
//! attachments, inline images) into the minimal correctly-nested
//! multipart tree.

use crate::encoding::{encode_body, encode_word};
use crate::error::Result;
use crate::node::{
    APPLICATION_OCTET_STREAM, Container, Disposition, Leaf, MimeNode, MultipartSubtype, TEXT_HTML,
    TEXT_PLAIN,
};
use crate::part::{InlinePart, PartPayload};

/// Pure decision engine building a MIME part tree from optional content
/// categories.
///
/// The tree shape depends only on which categories are present; child
/// ordering equals the caller's insertion order.
#[derive(Debug, Clone)]
pub struct Composer {
    charset: String,
    headers: Vec<(String, String)>,
}

impl Composer {
    /// Creates a composer encoding textual content and file names in
    /// the given charset.
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
            headers: Vec::new(),
        }
    }

    /// Registers a header attached to every textual leaf produced by
    /// [`Composer::compose`]. Attachment and inline leaves never carry
    /// these.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Returns the registered header set, in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Builds the part tree for the given content.
    ///
    /// A missing text value composes as an empty string, never as an
    /// omitted leaf: the text/plain part is present in every shape,
    /// including the degenerate no-content message.
    ///
    /// # Errors
    ///
    /// Returns an error if a body or file name cannot be represented in
    /// the configured charset.
    pub fn compose(
        &self,
        text: Option<&str>,
        html: Option<&str>,
        attachments: &[PartPayload],
        inline_images: &[InlinePart],
    ) -> Result<MimeNode> {
        let text = text.unwrap_or("");

        let Some(html) = html else {
            if attachments.is_empty() {
                // text/plain
                return Ok(MimeNode::Leaf(self.text_leaf(text)?));
            }
            // multipart/mixed
            // ├ text/plain
            // └ attachment×N
            let mut mixed = Container::new(MultipartSubtype::Mixed);
            mixed.push(MimeNode::Leaf(self.text_leaf(text)?));
            for file in attachments {
                mixed.push(MimeNode::Leaf(self.attachment_leaf(file)?));
            }
            return Ok(MimeNode::Container(mixed));
        };

        let alternative = self.alternative_part(text, html, inline_images)?;
        if attachments.is_empty() {
            // multipart/alternative
            // ├ text/plain
            // └ text/html | multipart/related
            return Ok(MimeNode::Container(alternative));
        }

        // multipart/mixed
        // ├ multipart/alternative
        // └ attachment×N
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Container(alternative));
        for file in attachments {
            mixed.push(MimeNode::Leaf(self.attachment_leaf(file)?));
        }
        Ok(MimeNode::Container(mixed))
    }

    /// Builds the alternative branch: the plain variant always comes
    /// first, the HTML variant wraps into multipart/related when inline
    /// images reference it.
    fn alternative_part(
        &self,
        text: &str,
        html: &str,
        inline_images: &[InlinePart],
    ) -> Result<Container> {
        let mut alternative = Container::new(MultipartSubtype::Alternative);
        alternative.push(MimeNode::Leaf(self.text_leaf(text)?));

        if inline_images.is_empty() {
            alternative.push(MimeNode::Leaf(self.html_leaf(html)?));
        } else {
            // multipart/related
            // ├ text/html
            // └ inline×N
            let mut related = Container::new(MultipartSubtype::Related);
            related.push(MimeNode::Leaf(self.html_leaf(html)?));
            for image in inline_images {
                related.push(MimeNode::Leaf(self.inline_leaf(image)?));
            }
            alternative.push(MimeNode::Container(related));
        }
        Ok(alternative)
    }

    fn text_leaf(&self, text: &str) -> Result<Leaf> {
        let charset = &self.charset;
        Ok(
            Leaf::new(format!("{TEXT_PLAIN}; charset={charset}"), encode_body(text, charset)?)
                .with_headers(self.headers.clone()),
        )
    }

    fn html_leaf(&self, html: &str) -> Result<Leaf> {
        let charset = &self.charset;
        Ok(
            Leaf::new(format!("{TEXT_HTML}; charset={charset}"), encode_body(html, charset)?)
                .with_headers(self.headers.clone()),
        )
    }

    fn attachment_leaf(&self, file: &PartPayload) -> Result<Leaf> {
        Ok(Leaf::new(APPLICATION_OCTET_STREAM, file.content.clone())
            .with_disposition(Disposition::Attachment)
            .with_file_name(encode_word(&file.file_name, &self.charset)?))
    }

    fn inline_leaf(&self, image: &InlinePart) -> Result<Leaf> {
        Ok(Leaf::new(APPLICATION_OCTET_STREAM, image.content().clone())
            .with_disposition(Disposition::Inline)
            .with_content_id(image.content_id.clone())
            .with_file_name(encode_word(image.file_name(), &self.charset)?))
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

    fn attachment(name: &str) -> PartPayload {
        PartPayload::new(name, &b"data"[..])
    }

    fn inline(cid: &str) -> InlinePart {
        InlinePart::new(cid, "image.png", &b"PNG"[..])
    }

    fn expect_leaf(node: &MimeNode) -> &Leaf {
        match node {
            MimeNode::Leaf(leaf) => leaf,
            MimeNode::Container(_) => panic!("expected leaf, got container"),
        }
    }

    fn expect_container(node: &MimeNode, subtype: MultipartSubtype) -> &Container {
        match node {
            MimeNode::Container(container) => {
                assert_eq!(container.subtype, subtype);
                container
            }
            MimeNode::Leaf(_) => panic!("expected container, got leaf"),
        }
    }

    #[test]
    fn test_text_only_is_single_leaf() {
        let tree = Composer::new("utf-8")
            .compose(Some("hello"), None, &[], &[])
            .unwrap();
        let leaf = expect_leaf(&tree);
        assert!(leaf.content_type.starts_with(TEXT_PLAIN));
        assert_eq!(&leaf.body[..], b"hello");
    }

    #[test]
    fn test_text_with_attachments_is_mixed() {
        let tree = Composer::new("utf-8")
            .compose(Some("hello"), None, &[attachment("a.txt"), attachment("b.txt")], &[])
            .unwrap();
        let mixed = expect_container(&tree, MultipartSubtype::Mixed);
        assert_eq!(mixed.children.len(), 3);
        assert!(
            expect_leaf(&mixed.children[0])
                .content_type
                .starts_with(TEXT_PLAIN)
        );
        assert_eq!(
            expect_leaf(&mixed.children[1]).file_name.as_deref(),
            Some("a.txt")
        );
        assert_eq!(
            expect_leaf(&mixed.children[2]).file_name.as_deref(),
            Some("b.txt")
        );
    }

    #[test]
    fn test_text_and_html_is_alternative() {
        let tree = Composer::new("utf-8")
            .compose(Some("hello"), Some("<p>hello</p>"), &[], &[])
            .unwrap();
        let alternative = expect_container(&tree, MultipartSubtype::Alternative);
        assert_eq!(alternative.children.len(), 2);
        assert!(
            expect_leaf(&alternative.children[0])
                .content_type
                .starts_with(TEXT_PLAIN)
        );
        assert!(
            expect_leaf(&alternative.children[1])
                .content_type
                .starts_with(TEXT_HTML)
        );
    }

    #[test]
    fn test_html_with_inline_images_nests_related() {
        let tree = Composer::new("utf-8")
            .compose(Some("hello"), Some("<img src=\"cid:logo\">"), &[], &[inline("logo")])
            .unwrap();
        let alternative = expect_container(&tree, MultipartSubtype::Alternative);
        assert_eq!(alternative.children.len(), 2);
        let related = expect_container(&alternative.children[1], MultipartSubtype::Related);
        assert!(
            expect_leaf(&related.children[0])
                .content_type
                .starts_with(TEXT_HTML)
        );
        assert_eq!(
            expect_leaf(&related.children[1]).content_id.as_deref(),
            Some("logo")
        );
    }

    #[test]
    fn test_html_with_attachments_wraps_alternative_in_mixed() {
        let tree = Composer::new("utf-8")
            .compose(Some("hello"), Some("<p>hello</p>"), &[attachment("a.txt")], &[])
            .unwrap();
        let mixed = expect_container(&tree, MultipartSubtype::Mixed);
        assert_eq!(mixed.children.len(), 2);
        let alternative = expect_container(&mixed.children[0], MultipartSubtype::Alternative);
        assert_eq!(alternative.children.len(), 2);
        assert_eq!(
            expect_leaf(&mixed.children[1]).file_name.as_deref(),
            Some("a.txt")
        );
    }

    #[test]
    fn test_full_shape_mixed_alternative_related() {
        let tree = Composer::new("utf-8")
            .compose(
                Some("hello"),
                Some("<img src=\"cid:logo\">"),
                &[attachment("a.txt")],
                &[inline("logo")],
            )
            .unwrap();
        let mixed = expect_container(&tree, MultipartSubtype::Mixed);
        let alternative = expect_container(&mixed.children[0], MultipartSubtype::Alternative);
        let related = expect_container(&alternative.children[1], MultipartSubtype::Related);
        assert_eq!(related.children.len(), 2);
        assert_eq!(
            expect_leaf(&mixed.children[1]).file_name.as_deref(),
            Some("a.txt")
        );
    }

    #[test]
    fn test_compose_empty_message_keeps_text_leaf() {
        // Legacy compatibility: no content still yields an empty
        // text/plain leaf, not an error and not an omitted part.
        let tree = Composer::new("utf-8").compose(None, None, &[], &[]).unwrap();
        let leaf = expect_leaf(&tree);
        assert!(leaf.content_type.starts_with(TEXT_PLAIN));
        assert!(leaf.body.is_empty());
    }

    #[test]
    fn test_headers_on_textual_leaves_only() {
        let tree = Composer::new("utf-8")
            .with_header("Content-Transfer-Encoding", "7bit")
            .compose(Some("hello"), Some("<p>hello</p>"), &[attachment("a.txt")], &[])
            .unwrap();
        let mixed = expect_container(&tree, MultipartSubtype::Mixed);
        let alternative = expect_container(&mixed.children[0], MultipartSubtype::Alternative);

        for child in &alternative.children {
            assert_eq!(
                expect_leaf(child).headers,
                vec![(
                    "Content-Transfer-Encoding".to_string(),
                    "7bit".to_string()
                )]
            );
        }
        assert!(expect_leaf(&mixed.children[1]).headers.is_empty());
    }

    #[test]
    fn test_unencodable_file_name_is_hard_error() {
        let result = Composer::new("ISO-2022-JP").compose(
            Some("hello"),
            None,
            &[attachment("привет.txt")],
            &[],
        );
        assert!(matches!(result, Err(Error::Unencodable { .. })));
    }

    #[test]
    fn test_file_name_wire_encoded() {
        let tree = Composer::new("utf-8")
            .compose(Some("hi"), None, &[attachment("résumé.pdf")], &[])
            .unwrap();
        let mixed = expect_container(&tree, MultipartSubtype::Mixed);
        let name = expect_leaf(&mixed.children[1]).file_name.clone().unwrap();
        assert!(name.starts_with("=?utf-8?B?"));
    }
}
