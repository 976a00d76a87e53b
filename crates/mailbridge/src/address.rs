//! Mail participant addresses.

use crate::error::Result;
use mailbridge_mime::encoding::encode_word;
use std::fmt;

/// One mail participant: an address plus an optional display name.
///
/// Immutable after construction; equality is by value. Address syntax
/// validation belongs to the session collaborator, not to this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    address: String,
    personal: Option<String>,
}

impl MailAddress {
    /// Creates an address without a display name.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            personal: None,
        }
    }

    /// Creates an address with a display name.
    pub fn with_personal(address: impl Into<String>, personal: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            personal: Some(personal.into()),
        }
    }

    /// Returns the bare address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn personal(&self) -> Option<&str> {
        self.personal.as_deref()
    }

    /// Renders the wire form, encoding the display name in the given
    /// charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name cannot be encoded in the
    /// charset.
    pub fn to_header(&self, charset: &str) -> Result<String> {
        match self.personal.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(personal) => {
                let encoded = encode_word(personal, charset)?;
                Ok(format!("{encoded} <{}>", self.address))
            }
            None => Ok(self.address.clone()),
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.personal.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(personal) => write!(f, "{personal} <{}>", self.address),
            None => f.write_str(&self.address),
        }
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
    fn test_display_without_personal() {
        let address = MailAddress::new("user@example.com");
        assert_eq!(address.to_string(), "user@example.com");
    }

    #[test]
    fn test_display_with_personal() {
        let address = MailAddress::with_personal("user@example.com", "User Name");
        assert_eq!(address.to_string(), "User Name <user@example.com>");
    }

    #[test]
    fn test_header_ascii_personal_unencoded() {
        let address = MailAddress::with_personal("user@example.com", "User Name");
        assert_eq!(
            address.to_header("utf-8").unwrap(),
            "User Name <user@example.com>"
        );
    }

    #[test]
    fn test_header_non_ascii_personal_encoded() {
        let address = MailAddress::with_personal("user@example.com", "Ülrich");
        let header = address.to_header("utf-8").unwrap();
        assert!(header.starts_with("=?utf-8?B?"));
        assert!(header.ends_with("<user@example.com>"));
    }

    #[test]
    fn test_blank_personal_renders_bare_address() {
        let address = MailAddress::with_personal("user@example.com", "   ");
        assert_eq!(address.to_header("utf-8").unwrap(), "user@example.com");
    }

    #[test]
    fn test_equality_by_value() {
        assert_eq!(
            MailAddress::with_personal("a@b.c", "N"),
            MailAddress::with_personal("a@b.c", "N")
        );
        assert_ne!(MailAddress::new("a@b.c"), MailAddress::new("x@b.c"));
    }
}
