//! MIME encoding and decoding utilities.
//!
//! Covers Base64, RFC 2047 encoded words keyed to a caller-supplied
//! charset, and the tolerant header decoding legacy senders require.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Resolves a charset label to an encoding.
fn lookup(charset: &str) -> Result<&'static Encoding> {
    Encoding::for_label(charset.as_bytes())
        .ok_or_else(|| Error::UnsupportedCharset(charset.to_string()))
}

/// Encodes text into the byte representation of the given charset.
///
/// # Errors
///
/// Returns an error if the charset is unknown or the text contains
/// characters the charset cannot represent.
pub fn encode_body(text: &str, charset: &str) -> Result<Vec<u8>> {
    let encoding = lookup(charset)?;
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(Error::Unencodable {
            charset: charset.to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Decodes body bytes using the given charset label.
///
/// Unknown or absent labels fall back to lossy UTF-8; received content
/// is decoded permissively, never rejected.
#[must_use]
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    match charset.and_then(|label| Encoding::for_label(label.as_bytes())) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Encodes a header value as an RFC 2047 encoded word in the given
/// charset.
///
/// Values that are plain ASCII (and free of `=` / `?`) pass through
/// unchanged.
///
/// # Errors
///
/// Returns an error if the charset is unknown or cannot represent the
/// text. Header encoding failures are hard errors: a half-encoded name
/// would corrupt the message on the wire.
pub fn encode_word(text: &str, charset: &str) -> Result<String> {
    if text.chars().all(|c| c.is_ascii() && c != '=' && c != '?') {
        return Ok(text.to_string());
    }

    let encoded = encode_base64(&encode_body(text, charset)?);
    Ok(format!("=?{charset}?B?{encoded}?="))
}

/// Decodes a header value containing MIME encoded words.
///
/// Tolerances carried over from widely-deployed senders:
///
/// - only the portion starting at the first `=?` marker is decoded; a
///   leading plain prefix passes through verbatim;
/// - back-to-back encoded words missing the separating space (`?==?`)
///   are spliced apart before decoding;
/// - whitespace between two adjacent encoded words is dropped, while
///   whitespace next to plain text is kept;
/// - tokens that are not well-formed encoded words pass through as
///   literals.
///
/// # Errors
///
/// Returns an error if an encoded word names an unknown charset or
/// carries invalid Base64/Q data.
pub fn decode_text(value: &str) -> Result<String> {
    let Some(start) = value.find("=?") else {
        return Ok(value.to_string());
    };

    let rest = value[start..].replace("?==?", "?= =?");
    let mut out = String::with_capacity(value.len());
    out.push_str(&value[..start]);

    let mut prev_encoded = false;
    for (i, token) in rest.split(' ').enumerate() {
        match decode_word(token)? {
            Some(decoded) => {
                // Whitespace between two encoded words is not content.
                if i > 0 && !prev_encoded {
                    out.push(' ');
                }
                out.push_str(&decoded);
                prev_encoded = true;
            }
            None => {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(token);
                prev_encoded = false;
            }
        }
    }
    Ok(out)
}

/// Decodes a single `=?charset?encoding?data?=` token.
///
/// Returns `Ok(None)` for tokens that are not well-formed encoded words
/// so the caller can pass them through as literal text.
fn decode_word(token: &str) -> Result<Option<String>> {
    let Some(inner) = token
        .strip_prefix("=?")
        .and_then(|t| t.strip_suffix("?="))
    else {
        return Ok(None);
    };

    let mut fields = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(data)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Ok(None);
    };
    if data.contains('?') {
        return Ok(None);
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(data)?,
        "Q" | "q" => decode_q(data)?,
        _ => return Ok(None),
    };

    // Strip an RFC 2231 language suffix from the charset label.
    let label = charset.split('*').next().unwrap_or(charset);
    let resolved = lookup(label)?;

    Ok(Some(resolved.decode(&bytes).0.into_owned()))
}

/// Decodes Q-encoded data (RFC 2047 variant of quoted-printable,
/// underscore standing in for space).
fn decode_q(data: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.bytes();

    while let Some(b) = bytes.next() {
        match b {
            b'_' => out.push(b' '),
            b'=' => {
                let (Some(hi), Some(lo)) = (bytes.next(), bytes.next()) else {
                    return Err(Error::InvalidEncoding(
                        "Incomplete Q escape sequence".to_string(),
                    ));
                };
                let hex = [hi, lo];
                let hex = std::str::from_utf8(&hex)
                    .map_err(|_| Error::InvalidEncoding("Invalid Q escape".to_string()))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                out.push(byte);
            }
            _ => out.push(b),
        }
    }
    Ok(out)
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
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_encode_word_ascii_passthrough() {
        assert_eq!(encode_word("report.txt", "UTF-8").unwrap(), "report.txt");
    }

    #[test]
    fn test_encode_word_utf8() {
        let encoded = encode_word("Héllo", "UTF-8").unwrap();
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
        assert_eq!(decode_text(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_encode_word_iso_2022_jp_roundtrip() {
        let encoded = encode_word("こんにちは", "ISO-2022-JP").unwrap();
        assert!(encoded.starts_with("=?ISO-2022-JP?B?"));
        assert_eq!(decode_text(&encoded).unwrap(), "こんにちは");
    }

    #[test]
    fn test_encode_word_unknown_charset() {
        assert!(matches!(
            encode_word("Héllo", "no-such-charset"),
            Err(Error::UnsupportedCharset(_))
        ));
    }

    #[test]
    fn test_encode_body_unmappable_is_hard_error() {
        // Cyrillic has no ISO-2022-JP representation.
        assert!(matches!(
            encode_body("привет", "ISO-2022-JP"),
            Err(Error::Unencodable { .. })
        ));
    }

    #[test]
    fn test_decode_body_falls_back_to_lossy_utf8() {
        assert_eq!(decode_body(b"plain", None), "plain");
        assert_eq!(decode_body("héllo".as_bytes(), Some("bogus")), "héllo");
    }

    #[test]
    fn test_decode_text_plain_passthrough() {
        assert_eq!(decode_text("just a subject").unwrap(), "just a subject");
    }

    #[test]
    fn test_decode_text_leading_prefix_kept() {
        let value = format!("prefix{}", encode_word("Héllo", "UTF-8").unwrap());
        assert_eq!(decode_text(&value).unwrap(), "prefixHéllo");
    }

    #[test]
    fn test_decode_text_back_to_back_words() {
        let a = encode_word("Héllo ", "UTF-8").unwrap();
        let b = encode_word("Wörld", "UTF-8").unwrap();
        // No separating space between the two encoded words.
        let value = format!("prefix{a}{b}");
        assert_eq!(decode_text(&value).unwrap(), "prefixHéllo Wörld");
    }

    #[test]
    fn test_decode_text_space_between_words_dropped() {
        let a = encode_word("Héllo", "UTF-8").unwrap();
        let b = encode_word("Wörld", "UTF-8").unwrap();
        let value = format!("{a} {b}");
        assert_eq!(decode_text(&value).unwrap(), "HélloWörld");
    }

    #[test]
    fn test_decode_text_plain_spacing_kept() {
        let word = encode_word("Héllo", "UTF-8").unwrap();
        let value = format!("before {word} after");
        assert_eq!(decode_text(&value).unwrap(), "before Héllo after");
    }

    #[test]
    fn test_decode_text_q_encoding() {
        assert_eq!(
            decode_text("=?UTF-8?Q?H=C3=A9llo_World?=").unwrap(),
            "Héllo World"
        );
    }

    #[test]
    fn test_decode_text_malformed_word_is_literal() {
        assert_eq!(decode_text("=?broken").unwrap(), "=?broken");
        assert_eq!(decode_text("=?a?X?data?=").unwrap(), "=?a?X?data?=");
    }

    #[test]
    fn test_decode_text_unknown_charset_is_error() {
        assert!(matches!(
            decode_text("=?no-such-charset?B?SGk=?="),
            Err(Error::UnsupportedCharset(_))
        ));
    }

    #[test]
    fn test_decode_q_incomplete_escape() {
        assert!(matches!(
            decode_text("=?UTF-8?Q?bad=4?="),
            Err(Error::InvalidEncoding(_))
        ));
    }
}
