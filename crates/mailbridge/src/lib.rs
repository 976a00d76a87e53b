//! # mailbridge
//!
//! Mail composition and extraction layer above a transport-agnostic
//! session.
//!
//! ## Features
//!
//! - **Sending**: a fluent [`MailSender`] builder rendering addresses,
//!   subject and a composed MIME tree into one [`OutboundMessage`]
//! - **Receiving**: a [`MailReceiver`] folder walk with per-message
//!   [`Verdict`]s and a caching [`MessageLoader`] content view
//! - **Configuration**: a [`ConnectionProfile`] of protocol-scoped
//!   settings with a plaintext-to-TLS key migration
//! - **Session traits**: [`MailTransport`] and [`MailStore`] keep the
//!   actual network session pluggable (and trivially mockable)
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbridge::{ConnectionProfile, MailAddress, MailSender};
//!
//! let mut profile = ConnectionProfile::smtp();
//! profile
//!     .host("smtp.example.com")
//!     .port("587")
//!     .authenticate("user", "secret")
//!     .starttls(false);
//!
//! MailSender::new(profile)
//!     .from(MailAddress::with_personal("user@example.com", "User"))
//!     .to(MailAddress::new("rcpt@example.com"))
//!     .subject("Hello")
//!     .text("plain body")
//!     .html("<p>html body</p>")
//!     .execute(&mut transport)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod profile;
mod receive;
mod send;
mod session;

pub use address::MailAddress;
pub use error::{Error, Result};
pub use profile::{
    ConnectionProfile, Credential, CredentialProvider, DEFAULT_SSL_SOCKET_FACTORY,
    DEFAULT_TIMEOUT_MS, ProtocolFamily, SettingValue, TrustedHostFactory,
};
pub use receive::{Flow, MailReceiver, MessageLoader, Verdict};
pub use send::MailSender;
pub use session::{
    FolderHandle, FolderMode, MailStore, MailTransport, OutboundMessage, RawMessage,
};

pub use mailbridge_mime as mime;
