//! # mailbridge-mime
//!
//! MIME tree composition and extraction for email.
//!
//! ## Features
//!
//! - **Composition**: deterministically builds the minimal correct
//!   multipart tree from optional text, HTML, attachment and
//!   inline-image content
//! - **Extraction**: recursively buckets an arbitrary received part
//!   tree by role, with split-message (`message/partial`) detection
//! - **Encoded words**: RFC 2047 header encoding keyed to a
//!   caller-supplied charset, plus tolerant decoding of legacy senders
//!
//! ## Quick Start
//!
//! ### Composing a part tree
//!
//! ```ignore
//! use mailbridge_mime::{Composer, InlinePart, PartPayload};
//!
//! let attachments = vec![PartPayload::new("report.pdf", pdf_bytes)];
//! let inline = vec![InlinePart::new("logo", "logo.png", png_bytes)];
//!
//! let tree = Composer::new("utf-8")
//!     .with_header("Content-Transfer-Encoding", "8bit")
//!     .compose(Some("plain body"), Some("<p>html body</p>"), &attachments, &inline)?;
//! ```
//!
//! ### Extracting received content
//!
//! ```ignore
//! use mailbridge_mime::extract;
//!
//! let content = extract(&tree)?;
//! println!("text: {}", content.text);
//! for attachment in &content.attachments {
//!     println!("attachment: {}", attachment.file_name);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod compose;
mod error;
mod extract;
mod node;
mod part;

pub mod encoding;

pub use compose::Composer;
pub use error::{Error, Result};
pub use extract::{ExtractedContent, extract};
pub use node::{
    APPLICATION_OCTET_STREAM, Container, Disposition, Leaf, MESSAGE_PARTIAL, MimeNode,
    MultipartSubtype, TEXT_HTML, TEXT_PLAIN,
};
pub use part::{InlinePart, PartPayload};
