//! MIME message structure and handling.

use crate::content_type::{ContentDisposition, ContentType};
use crate::date::year_of;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::Result;
use crate::header::Headers;
use std::fmt;

/// Nesting limit for multipart and encapsulated messages.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Returns true if the body is stored without a transfer encoding.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// A MIME entity: headers plus either a leaf body or child parts.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw, still transfer-encoded). Empty for containers.
    pub body: Vec<u8>,
    /// Child parts of a multipart or encapsulated message.
    pub children: Vec<Part>,
}

impl Part {
    /// Parses a MIME entity from raw bytes.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &[u8], depth: usize) -> Self {
        let (header_bytes, body) = split_entity(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));
        let mut part = Self {
            headers,
            body: Vec::new(),
            children: Vec::new(),
        };

        if depth < MAX_DEPTH {
            let content_type = part.content_type();
            if content_type.is_multipart()
                && let Some(sections) = content_type
                    .boundary()
                    .and_then(|boundary| split_multipart(body, boundary))
            {
                part.children = sections
                    .into_iter()
                    .map(|section| Self::parse_at_depth(section, depth + 1))
                    .collect();
                return part;
            }
            if content_type.is_message() && part.transfer_encoding().is_identity() {
                part.children = vec![Self::parse_at_depth(body, depth + 1)];
                return part;
            }
        }

        part.body = body.to_vec();
        part
    }

    /// Gets the content type, falling back to `text/plain` when the header is
    /// absent or malformed.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the content disposition, if present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns true if this part holds other parts instead of a body.
    #[must_use]
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    /// Gets the decoded filename: the disposition `filename` parameter, or
    /// the content type `name` parameter as a fallback.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename())
            .or_else(|| self.content_type().parameters.get_decoded("name"))
    }

    /// Returns true if this part should be saved as an attachment: its
    /// disposition mentions `attachment` or it carries a non-empty filename.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        let by_disposition = self
            .headers
            .get_decoded("content-disposition")
            .is_some_and(|d| d.to_lowercase().contains("attachment"));
        by_disposition || self.filename().is_some_and(|name| !name.is_empty())
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if Base64 decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Returns the decoded payload of a leaf part, or `None` for containers.
    ///
    /// A body that does not decode is returned as sent, still encoded.
    #[must_use]
    pub fn payload(&self) -> Option<Vec<u8>> {
        (!self.is_container()).then(|| {
            self.decode_body()
                .unwrap_or_else(|_| self.body.clone())
        })
    }
}

/// Splits an entity into its header block and body.
fn split_entity(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(b"\r\n").or_else(|| raw.strip_prefix(b"\n")) {
        return (&[], body);
    }

    for (i, byte) in raw.iter().enumerate() {
        if *byte != b'\n' {
            continue;
        }
        match (raw.get(i + 1), raw.get(i + 2)) {
            (Some(b'\n'), _) => return (&raw[..=i], &raw[i + 2..]),
            (Some(b'\r'), Some(b'\n')) => return (&raw[..=i], &raw[i + 3..]),
            _ => {}
        }
    }

    (raw, &[])
}

/// Splits a multipart body on its boundary.
///
/// Returns `None` when the boundary never occurs, so the caller can treat the
/// body as a single part. A missing closing delimiter keeps the last part.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Option<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut sections = Vec::new();
    let mut open: Option<usize> = None;
    let mut found = false;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |offset| pos + offset);
        let line = body[pos..line_end].trim_ascii_end();

        if let Some(rest) = line.strip_prefix(delimiter) {
            let closing = rest.starts_with(b"--");
            if closing || rest.trim_ascii().is_empty() {
                if let Some(start) = open {
                    sections.push(strip_line_break(&body[start..pos]));
                }
                found = true;
                if closing {
                    return Some(sections);
                }
                open = Some((line_end + 1).min(body.len()));
            }
        }

        pos = line_end + 1;
    }

    if let Some(start) = open {
        sections.push(&body[start..]);
    }
    found.then_some(sections)
}

/// The line break before a delimiter belongs to the delimiter.
fn strip_line_break(section: &[u8]) -> &[u8] {
    section
        .strip_suffix(b"\r\n")
        .or_else(|| section.strip_suffix(b"\n"))
        .unwrap_or(section)
}

/// A parsed MIME message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a raw RFC 5322 message. Never fails: structure that cannot be
    /// interpreted degrades to a single-part body.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self {
            root: Part::parse(raw),
        }
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root.headers.get_decoded("subject")
    }

    /// Gets the raw Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.root.headers.get("date")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.root.headers.get("message-id")
    }

    /// Returns the year of the Date header, as written by the sender.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.date().and_then(year_of)
    }

    /// Iterates over every entity depth-first, starting with the root.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![&self.root],
        }
    }
}

/// Depth-first iterator over the parts of a [`Message`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Part>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Part;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        self.stack.extend(part.children.iter().rev());
        Some(part)
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

    fn root(message: &Message) -> &Part {
        message.walk().next().unwrap()
    }

    const MULTIPART: &[u8] = b"From: sender@example.com\r\n\
Subject: Report\r\n\
Message-ID: <abc@example.com>\r\n\
Date: Mon, 15 Jan 2024 09:30:00 +0100\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
preamble\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain body\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"data.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC\r\n\
--outer--\r\n\
epilogue\r\n";

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-unknown"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_single_part_message() {
        let message = Message::parse(b"Subject: Hi\r\nDate: 2 Jan 2023 10:00:00 GMT\r\n\r\nHello");
        assert_eq!(message.subject().as_deref(), Some("Hi"));
        assert_eq!(message.year(), Some(2023));
        assert_eq!(root(&message).body, b"Hello");
        assert_eq!(message.walk().count(), 1);
    }

    #[test]
    fn test_lf_only_line_endings() {
        let message = Message::parse(b"Subject: LF\nX-Other: 1\n\nBody\n");
        assert_eq!(message.subject().as_deref(), Some("LF"));
        assert_eq!(root(&message).body, b"Body\n");
    }

    #[test]
    fn test_headers_only_message() {
        let message = Message::parse(b"Subject: nothing else");
        assert_eq!(message.subject().as_deref(), Some("nothing else"));
        assert!(root(&message).body.is_empty());
    }

    #[test]
    fn test_nested_multipart_walk() {
        let message = Message::parse(MULTIPART);
        let types: Vec<String> = message
            .walk()
            .map(|p| p.content_type().to_string())
            .collect();
        assert_eq!(
            types,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "application/octet-stream",
            ]
        );
        assert_eq!(message.message_id(), Some("<abc@example.com>"));
        assert_eq!(message.year(), Some(2024));
    }

    #[test]
    fn test_section_bodies_exclude_delimiter_line_break() {
        let message = Message::parse(MULTIPART);
        let plain = message
            .walk()
            .find(|p| p.content_type().sub_type == "plain")
            .unwrap();
        assert_eq!(plain.body, b"plain body");
    }

    #[test]
    fn test_attachment_detection_and_payload() {
        let message = Message::parse(MULTIPART);
        let attachments: Vec<&Part> = message.walk().filter(|p| p.is_attachment()).collect();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("data.bin"));
        assert_eq!(attachments[0].payload().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_container_has_no_payload() {
        let message = Message::parse(MULTIPART);
        assert!(root(&message).payload().is_none());
    }

    #[test]
    fn test_missing_boundary_degrades_to_single_part() {
        let raw = b"Content-Type: multipart/mixed; boundary=nope\r\n\r\njust text\r\n";
        let message = Message::parse(raw);
        assert!(!root(&message).is_container());
        assert_eq!(root(&message).body, b"just text\r\n");
    }

    #[test]
    fn test_unterminated_multipart_keeps_last_part() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n--b\r\n\r\nfirst\r\n--b\r\n\r\nsecond";
        let message = Message::parse(raw);
        assert_eq!(root(&message).children.len(), 2);
        assert_eq!(root(&message).children[1].body, b"second");
    }

    #[test]
    fn test_encapsulated_message_is_walked() {
        let raw = b"Content-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\n\
Content-Type: message/rfc822\r\n\
\r\n\
Subject: inner\r\n\
Content-Type: text/plain; name=\"inner.txt\"\r\n\
\r\n\
inner body\r\n\
--b--\r\n";
        let message = Message::parse(raw);
        let names: Vec<String> = message.walk().filter_map(|p| p.filename()).collect();
        assert_eq!(names, vec!["inner.txt"]);
    }

    #[test]
    fn test_quoted_printable_payload() {
        let part = Part::parse(b"Content-Transfer-Encoding: quoted-printable\r\n\r\nH=C3=A9llo=\r\n!");
        assert_eq!(part.payload().unwrap(), "Héllo!".as_bytes());
    }

    #[test]
    fn test_invalid_base64_payload_falls_back_to_raw_body() {
        let part = Part::parse(b"Content-Transfer-Encoding: base64\r\n\r\nSGVsb");
        assert!(part.decode_body().is_err());
        assert_eq!(part.payload().unwrap(), b"SGVsb");
    }

    #[test]
    fn test_inline_part_with_name_is_attachment() {
        let part = Part::parse(b"Content-Type: image/png; name=logo.png\r\nContent-Disposition: inline\r\n\r\nPNG");
        assert!(part.is_attachment());
        assert_eq!(part.filename().as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_body_part_is_not_attachment() {
        let part = Part::parse(b"Content-Type: text/plain\r\n\r\nhello");
        assert!(!part.is_attachment());
    }
}
