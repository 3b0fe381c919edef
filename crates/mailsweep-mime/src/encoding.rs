//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded words and RFC 2231
//! parameter values. Every decoder here is lenient: archived mail is often
//! malformed and a best-effort string beats a dropped message.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine that tolerates missing padding and trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64 data, ignoring line breaks and any other character outside
/// the Base64 alphabet.
///
/// # Errors
///
/// Returns an error if the remaining symbols do not form valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    LENIENT_BASE64.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks are removed and `=XX` escapes become bytes. A malformed
/// escape is kept verbatim instead of failing the whole body.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        match (data.get(i + 1), data.get(i + 2)) {
            // Soft line break
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    result.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    result.push(b'=');
                    i += 1;
                }
            },
            _ => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Converts bytes in the given charset to a string.
///
/// Latin-1 family charsets map byte-for-byte; everything else is read as
/// UTF-8 with invalid sequences replaced.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    match charset.trim().to_ascii_lowercase().as_str() {
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1"
        | "windows-1252" | "cp1252" => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes a header value that may contain RFC 2047 encoded words.
///
/// Format of an encoded word: `=?charset?encoding?encoded-text?=`. Encoded
/// words may appear anywhere in the value; whitespace between two adjacent
/// encoded words is dropped. Text that merely looks like an encoded word but
/// does not decode is kept as-is.
///
/// Absent or empty input yields an empty string. This never fails.
#[must_use]
pub fn decode_header(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut after_encoded_word = false;

    while let Some((start, end, decoded)) = find_encoded_word(rest) {
        let between = &rest[..start];
        if !(after_encoded_word && between.trim().is_empty()) {
            out.push_str(between);
        }
        out.push_str(&decoded);
        after_encoded_word = true;
        rest = &rest[end..];
    }
    out.push_str(rest);

    out
}

/// Locates the first decodable encoded word, returning its byte range and
/// decoded text.
fn find_encoded_word(s: &str) -> Option<(usize, usize, String)> {
    let mut from = 0;
    while let Some(offset) = s[from..].find("=?") {
        let start = from + offset;
        if let Some((len, decoded)) = parse_encoded_word(&s[start..]) {
            return Some((start, start + len, decoded));
        }
        from = start + 2;
    }
    None
}

/// Parses an encoded word at the start of `s` (which begins with `=?`).
fn parse_encoded_word(s: &str) -> Option<(usize, String)> {
    let body = s.get(2..)?;
    let charset_end = body.find('?')?;
    let charset = &body[..charset_end];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let after_charset = &body[charset_end + 1..];
    let mut header = after_charset.bytes();
    let encoding = header.next()?;
    if !encoding.is_ascii_alphabetic() || header.next()? != b'?' {
        return None;
    }

    let text_and_rest = &after_charset[2..];
    let text_end = text_and_rest.find("?=")?;
    let text = &text_and_rest[..text_end];
    if text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding.to_ascii_uppercase() {
        b'B' => decode_base64(text).ok()?,
        b'Q' => decode_q(text.as_bytes()),
        _ => return None,
    };

    // RFC 2231 allows a language suffix: `utf-8*en`
    let charset = charset.split('*').next().unwrap_or(charset);
    let len = 2 + charset_end + 1 + 2 + text_end + 2;
    Some((len, decode_charset(&bytes, charset)))
}

/// Decodes the RFC 2047 "Q" encoding (Quoted-Printable with `_` for space).
fn decode_q(text: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = text
        .iter()
        .map(|&b| if b == b'_' { b' ' } else { b })
        .collect();
    decode_quoted_printable(&spaced)
}

/// Decodes `%XX` escapes as used in RFC 2231 extended parameter values.
#[must_use]
pub fn percent_decode(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2))
            && let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo))
        {
            result.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        result.push(bytes[i]);
        i += 1;
    }

    result
}

/// Decodes an RFC 2231 extended value of the form `charset'language'text`.
///
/// # Errors
///
/// Returns an error if the value has no charset delimiter.
pub fn decode_rfc2231(value: &str) -> Result<String> {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_language), Some(text)) => {
            Ok(decode_charset(&percent_decode(text), charset))
        }
        _ => Err(Error::InvalidEncoding(format!(
            "RFC 2231 value without charset: {value}"
        ))),
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
    fn test_base64_decode() {
        let decoded = decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_ignores_line_breaks_and_padding() {
        let decoded = decode_base64("SGVsbG8s\r\nIFdvcmxkIQ").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_rejects_truncated_input() {
        assert!(decode_base64("SGVsb").is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
        assert_eq!(
            decode_quoted_printable(b"H=C3=A9llo"),
            "Héllo".as_bytes().to_vec()
        );
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_keeps_malformed_escape() {
        assert_eq!(decode_quoted_printable(b"100=ZZ"), b"100=ZZ");
        assert_eq!(decode_quoted_printable(b"end="), b"end=");
    }

    #[test]
    fn test_decode_header_plain() {
        assert_eq!(decode_header(Some("Hello")), "Hello");
        assert_eq!(decode_header(Some("")), "");
        assert_eq!(decode_header(None), "");
    }

    #[test]
    fn test_decode_header_base64() {
        assert_eq!(decode_header(Some("=?utf-8?B?SMOpbGxv?=")), "Héllo");
    }

    #[test]
    fn test_decode_header_q_encoding() {
        assert_eq!(decode_header(Some("=?utf-8?Q?H=C3=A9llo_there?=")), "Héllo there");
        assert_eq!(decode_header(Some("=?ISO-8859-1?q?caf=E9?=")), "café");
    }

    #[test]
    fn test_decode_header_mixed_text() {
        assert_eq!(
            decode_header(Some("Re: =?utf-8?B?SMOpbGxv?= world")),
            "Re: Héllo world"
        );
    }

    #[test]
    fn test_decode_header_adjacent_words_join() {
        assert_eq!(
            decode_header(Some("=?utf-8?Q?Hel?=\r\n =?utf-8?Q?lo?=")),
            "Hello"
        );
    }

    #[test]
    fn test_decode_header_invalid_word_kept() {
        assert_eq!(decode_header(Some("=?utf-8?X?abc?=")), "=?utf-8?X?abc?=");
        assert_eq!(decode_header(Some("price =? 5")), "price =? 5");
    }

    #[test]
    fn test_decode_header_invalid_utf8_is_lossy() {
        // 0xFF is never valid UTF-8
        let decoded = decode_header(Some("=?utf-8?Q?a=FFb?="));
        assert_eq!(decoded, "a\u{FFFD}b");
    }

    #[test]
    fn test_decode_rfc2231() {
        assert_eq!(
            decode_rfc2231("UTF-8''%E2%82%AC%20rates.pdf").unwrap(),
            "€ rates.pdf"
        );
        assert_eq!(decode_rfc2231("iso-8859-1'en'caf%E9").unwrap(), "café");
        assert!(decode_rfc2231("no-delimiters").is_err());
    }

    #[test]
    fn test_percent_decode_keeps_stray_percent() {
        assert_eq!(percent_decode("50%"), b"50%");
        assert_eq!(percent_decode("%4"), b"%4");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn plain_text_passes_through(s in "\\PC*") {
            prop_assume!(!s.contains("=?"));
            prop_assert_eq!(decode_header(Some(&s)), s);
        }

        #[test]
        fn base64_words_decode_to_source(s in "\\PC{0,40}") {
            let word = format!("=?utf-8?B?{}?=", base64::engine::general_purpose::STANDARD.encode(&s));
            prop_assert_eq!(decode_header(Some(&word)), s);
        }

        #[test]
        fn arbitrary_input_never_panics(s in "(=\\?|\\?=|[A-Za-z0-9?=_ ])*") {
            let _ = decode_header(Some(&s));
        }
    }
}
