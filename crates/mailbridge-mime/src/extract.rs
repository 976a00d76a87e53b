//! MIME tree extraction.
//!
//! Recursively walks a received part tree and buckets every leaf by
//! role, or short-circuits on split (`message/partial`) messages.

use crate::encoding::{decode_body, decode_text};
use crate::error::Result;
use crate::node::{Container, Disposition, Leaf, MESSAGE_PARTIAL, MimeNode, TEXT_HTML, TEXT_PLAIN};
use crate::part::{InlinePart, PartPayload};
use bytes::Bytes;

/// Content of a received message, bucketed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Plain text body, empty if absent.
    pub text: String,
    /// HTML body, empty if absent.
    pub html: String,
    /// Attachment parts, in wire order.
    pub attachments: Vec<PartPayload>,
    /// Inline-referenced parts, in wire order.
    pub inline_images: Vec<InlinePart>,
    /// Raw fragment content, present only for split messages.
    pub partial: Option<Bytes>,
}

/// Classifies every part of the tree into content buckets.
///
/// A `message/partial` root short-circuits: only
/// [`ExtractedContent::partial`] is populated and no classification
/// happens. A root that is a single non-multipart leaf becomes the
/// `text` bucket verbatim, regardless of its declared subtype.
///
/// The walk is pure; callers wanting once-per-message caching hold on
/// to the returned value.
///
/// # Errors
///
/// Returns an error if an attachment or inline file name carries an
/// encoded word that cannot be decoded.
pub fn extract(root: &MimeNode) -> Result<ExtractedContent> {
    let mut content = ExtractedContent::default();

    match root {
        MimeNode::Leaf(leaf) if leaf.content_type.contains(MESSAGE_PARTIAL) => {
            content.partial = Some(leaf.body.clone());
        }
        MimeNode::Leaf(leaf) => {
            content.text = decode_body(&leaf.body, leaf.charset());
        }
        MimeNode::Container(container) => walk(container, &mut content)?,
    }
    Ok(content)
}

fn walk(container: &Container, content: &mut ExtractedContent) -> Result<()> {
    for child in &container.children {
        match child {
            MimeNode::Container(inner) => walk(inner, content)?,
            MimeNode::Leaf(leaf) => classify(leaf, content)?,
        }
    }
    Ok(())
}

/// Subtype first, disposition second; anything else is dropped, not
/// rejected.
fn classify(leaf: &Leaf, content: &mut ExtractedContent) -> Result<()> {
    if leaf.content_type.starts_with(TEXT_HTML) {
        content.html = decode_body(&leaf.body, leaf.charset());
    } else if leaf.content_type.starts_with(TEXT_PLAIN) {
        content.text = decode_body(&leaf.body, leaf.charset());
    } else {
        match leaf.disposition {
            Some(Disposition::Attachment) => {
                content
                    .attachments
                    .push(PartPayload::new(leaf_file_name(leaf)?, leaf.body.clone()));
            }
            Some(Disposition::Inline) => {
                content.inline_images.push(InlinePart::new(
                    leaf.content_id.clone().unwrap_or_default(),
                    leaf_file_name(leaf)?,
                    leaf.body.clone(),
                ));
            }
            None => {}
        }
    }
    Ok(())
}

fn leaf_file_name(leaf: &Leaf) -> Result<String> {
    leaf.file_name.as_deref().map_or_else(|| Ok(String::new()), decode_text)
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
    use crate::compose::Composer;
    use crate::node::MultipartSubtype;
    use proptest::prelude::*;

    #[test]
    fn test_partial_root_short_circuits() {
        let leaf = Leaf::new("message/partial; number=1; total=3", &b"fragment"[..]);
        let content = extract(&MimeNode::Leaf(leaf)).unwrap();

        assert_eq!(content.partial.as_deref(), Some(&b"fragment"[..]));
        assert!(content.text.is_empty());
        assert!(content.html.is_empty());
        assert!(content.attachments.is_empty());
        assert!(content.inline_images.is_empty());
    }

    #[test]
    fn test_single_leaf_root_is_text_verbatim() {
        // Subtype is not consulted for a bare root leaf.
        let leaf = Leaf::new("text/html; charset=utf-8", &b"<p>hi</p>"[..]);
        let content = extract(&MimeNode::Leaf(leaf)).unwrap();
        assert_eq!(content.text, "<p>hi</p>");
        assert!(content.html.is_empty());
    }

    #[test]
    fn test_unrecognized_leaf_is_dropped() {
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"body"[..])));
        mixed.push(MimeNode::Leaf(Leaf::new(
            "application/pkcs7-signature",
            &b"sig"[..],
        )));

        let content = extract(&MimeNode::Container(mixed)).unwrap();
        assert_eq!(content.text, "body");
        assert!(content.attachments.is_empty());
        assert!(content.inline_images.is_empty());
    }

    #[test]
    fn test_deeply_nested_tree() {
        let mut related = Container::new(MultipartSubtype::Related);
        related.push(MimeNode::Leaf(Leaf::new(
            "text/html; charset=utf-8",
            &b"<p>deep</p>"[..],
        )));
        related.push(MimeNode::Leaf(
            Leaf::new("image/png", &b"PNG"[..])
                .with_disposition(Disposition::Inline)
                .with_content_id("logo"),
        ));

        let mut alternative = Container::new(MultipartSubtype::Alternative);
        alternative.push(MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"deep"[..])));
        alternative.push(MimeNode::Container(related));

        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Container(alternative));
        mixed.push(MimeNode::Leaf(
            Leaf::new("application/pdf", &b"%PDF"[..])
                .with_disposition(Disposition::Attachment)
                .with_file_name("report.pdf"),
        ));

        let content = extract(&MimeNode::Container(mixed)).unwrap();
        assert_eq!(content.text, "deep");
        assert_eq!(content.html, "<p>deep</p>");
        assert_eq!(content.attachments.len(), 1);
        assert_eq!(content.attachments[0].file_name, "report.pdf");
        assert_eq!(content.inline_images.len(), 1);
        assert_eq!(content.inline_images[0].content_id, "logo");
    }

    #[test]
    fn test_inline_without_content_id_gets_empty_string() {
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Leaf(
            Leaf::new("image/png", &b"PNG"[..]).with_disposition(Disposition::Inline),
        ));

        let content = extract(&MimeNode::Container(mixed)).unwrap();
        assert_eq!(content.inline_images[0].content_id, "");
    }

    #[test]
    fn test_multiple_text_parts_last_wins() {
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"first"[..])));
        mixed.push(MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"second"[..])));

        let content = extract(&MimeNode::Container(mixed)).unwrap();
        assert_eq!(content.text, "second");
    }

    #[test]
    fn test_encoded_attachment_name_decoded() {
        let mut mixed = Container::new(MultipartSubtype::Mixed);
        mixed.push(MimeNode::Leaf(Leaf::new(TEXT_PLAIN, &b"body"[..])));
        mixed.push(MimeNode::Leaf(
            Leaf::new("application/pdf", &b"%PDF"[..])
                .with_disposition(Disposition::Attachment)
                .with_file_name("=?UTF-8?B?csOpc3Vtw6kucGRm?="),
        ));

        let content = extract(&MimeNode::Container(mixed)).unwrap();
        assert_eq!(content.attachments[0].file_name, "résumé.pdf");
    }

    #[test]
    fn test_roundtrip_text_only() {
        let tree = Composer::new("utf-8").compose(Some("T"), None, &[], &[]).unwrap();
        let content = extract(&tree).unwrap();
        assert_eq!(content.text, "T");
        assert!(content.html.is_empty());
        assert!(content.attachments.is_empty());
        assert!(content.inline_images.is_empty());
        assert!(content.partial.is_none());
    }

    #[test]
    fn test_roundtrip_full_message() {
        let attachments = vec![
            PartPayload::new("a1.txt", &b"one"[..]),
            PartPayload::new("a2.txt", &b"two"[..]),
        ];
        let inline_images = vec![InlinePart::new("i1", "logo.png", &b"PNG"[..])];

        let tree = Composer::new("utf-8")
            .compose(Some("T"), Some("H"), &attachments, &inline_images)
            .unwrap();
        let content = extract(&tree).unwrap();

        assert_eq!(content.text, "T");
        assert_eq!(content.html, "H");
        assert_eq!(
            content
                .attachments
                .iter()
                .map(|a| a.file_name.as_str())
                .collect::<Vec<_>>(),
            vec!["a1.txt", "a2.txt"]
        );
        assert_eq!(content.attachments[0].content, attachments[0].content);
        assert_eq!(content.inline_images[0].content_id, "i1");
    }

    #[test]
    fn test_roundtrip_iso_2022_jp_body() {
        let tree = Composer::new("ISO-2022-JP")
            .compose(Some("こんにちは"), Some("<p>世界</p>"), &[], &[])
            .unwrap();
        let content = extract(&tree).unwrap();
        assert_eq!(content.text, "こんにちは");
        assert_eq!(content.html, "<p>世界</p>");
    }

    proptest! {
        #[test]
        fn prop_compose_extract_roundtrip(
            text in "[a-zA-Z0-9 .,!]{0,40}",
            html in proptest::option::of("<p>[a-zA-Z0-9 ]{0,20}</p>"),
            attachment_names in proptest::collection::vec("[a-z]{1,8}\\.bin", 0..3),
            content_ids in proptest::collection::vec("[a-z]{1,8}@example", 0..3),
        ) {
            let attachments: Vec<PartPayload> = attachment_names
                .iter()
                .map(|name| PartPayload::new(name.clone(), &b"data"[..]))
                .collect();
            let inline_images: Vec<InlinePart> = content_ids
                .iter()
                .map(|cid| InlinePart::new(cid.clone(), "img.png", &b"PNG"[..]))
                .collect();

            let tree = Composer::new("utf-8")
                .compose(Some(&text), html.as_deref(), &attachments, &inline_images)
                .unwrap();
            let content = extract(&tree).unwrap();

            prop_assert_eq!(&content.text, &text);
            prop_assert_eq!(content.html.as_str(), html.as_deref().unwrap_or(""));
            prop_assert_eq!(
                content.attachments.iter().map(|a| a.file_name.clone()).collect::<Vec<_>>(),
                attachment_names
            );
            // Inline parts only survive when an HTML body carries them.
            if html.is_some() {
                prop_assert_eq!(
                    content.inline_images.iter().map(|i| i.content_id.clone()).collect::<Vec<_>>(),
                    content_ids
                );
            } else {
                prop_assert!(content.inline_images.is_empty());
            }
        }
    }
}
