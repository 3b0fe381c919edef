//! MIME content type and content disposition handling.

use crate::encoding::{decode_charset, decode_header, decode_rfc2231, percent_decode};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Parameters of a structured header (`; key=value` pairs).
///
/// Keys are stored lowercased. Quoted values are unquoted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: HashMap<String, String>,
}

impl Parameters {
    /// Parses the parameter list that follows the first `;` of a header value.
    ///
    /// Semicolons inside quoted strings do not split parameters.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut values = HashMap::new();
        for segment in split_unquoted(s, ';') {
            if let Some((key, value)) = segment.split_once('=') {
                let key = key.trim().to_lowercase();
                if !key.is_empty() {
                    values.insert(key, unquote(value.trim()));
                }
            }
        }
        Self { values }
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a decoded parameter value.
    ///
    /// Resolution order: RFC 2231 continuations (`name*0`, `name*1*`, ...),
    /// a single RFC 2231 extended value (`name*`), then the plain value with
    /// any RFC 2047 encoded words decoded.
    #[must_use]
    pub fn get_decoded(&self, key: &str) -> Option<String> {
        let key = key.to_lowercase();

        if let Some(value) = self.continuation(&key) {
            return Some(value);
        }
        if let Some(extended) = self.values.get(&format!("{key}*")) {
            return Some(decode_rfc2231(extended).unwrap_or_else(|_| extended.clone()));
        }
        self.values
            .get(&key)
            .map(|value| decode_header(Some(value)))
    }

    /// Reassembles an RFC 2231 continuation (`key*0`, `key*1`, ...).
    fn continuation(&self, key: &str) -> Option<String> {
        let mut segments: Vec<(u32, bool, &str)> = self
            .values
            .iter()
            .filter_map(|(name, value)| {
                let rest = name.strip_prefix(key)?.strip_prefix('*')?;
                let (index, encoded) = rest
                    .strip_suffix('*')
                    .map_or((rest, false), |index| (index, true));
                let index = index.parse().ok()?;
                Some((index, encoded, value.as_str()))
            })
            .collect();

        if segments.is_empty() {
            return None;
        }
        segments.sort_by_key(|(index, _, _)| *index);

        let mut charset = "utf-8".to_string();
        let mut bytes = Vec::new();
        for (position, (_, encoded, value)) in segments.into_iter().enumerate() {
            if !encoded {
                bytes.extend_from_slice(value.as_bytes());
                continue;
            }
            let mut text = value;
            if position == 0 {
                let mut pieces = value.splitn(3, '\'');
                if let (Some(cs), Some(_language), Some(rest)) =
                    (pieces.next(), pieces.next(), pieces.next())
                {
                    if !cs.is_empty() {
                        charset = cs.to_string();
                    }
                    text = rest;
                }
            }
            bytes.extend(percent_decode(text));
        }

        Some(decode_charset(&bytes, &charset))
    }
}

/// Splits on `separator` outside of double-quoted strings.
fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                segments.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&s[start..]);
    segments
}

/// Removes surrounding quotes and backslash escapes from a parameter value.
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .map(|v| v.strip_suffix('"').unwrap_or(v))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Parameters,
}

impl ContentType {
    /// Creates a new content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Parameters::default(),
        }
    }

    /// Creates a text/plain content type (the RFC 2045 default).
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").filter(|b| !b.is_empty())
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is an encapsulated message (`message/rfc822`).
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("message") && self.sub_type.eq_ignore_ascii_case("rfc822")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the `type/subtype` pair is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("Empty type: {s}")));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: Parameters::parse(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (e.g., "inline", "attachment").
    pub kind: String,
    /// Disposition parameters (e.g., filename).
    pub parameters: Parameters,
}

impl ContentDisposition {
    /// Parses a content disposition string. Never fails; an empty value yields
    /// an empty kind.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        Self {
            kind: kind.trim().to_lowercase(),
            parameters: Parameters::parse(params),
        }
    }

    /// Checks whether the disposition marks an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the decoded `filename` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters.get_decoded("filename")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.parameters.get("charset"), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("garbage").is_err());
        assert!(ContentType::parse("/plain").is_err());
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::parse("image/png; name=a.png").unwrap();
        assert_eq!(ct.to_string(), "image/png");
    }

    #[test]
    fn test_message_rfc822() {
        let ct = ContentType::parse("message/rfc822").unwrap();
        assert!(ct.is_message());
        assert!(!ct.is_multipart());
    }

    #[test]
    fn test_quoted_semicolon_does_not_split() {
        let cd = ContentDisposition::parse("attachment; filename=\"a;b.pdf\"; size=10");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename().as_deref(), Some("a;b.pdf"));
        assert_eq!(cd.parameters.get("size"), Some("10"));
    }

    #[test]
    fn test_disposition_inline() {
        let cd = ContentDisposition::parse("INLINE");
        assert_eq!(cd.kind, "inline");
        assert!(!cd.is_attachment());
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn test_filename_rfc2047() {
        let cd = ContentDisposition::parse("attachment; filename=\"=?utf-8?B?SMOpbGxvLnR4dA==?=\"");
        assert_eq!(cd.filename().as_deref(), Some("Héllo.txt"));
    }

    #[test]
    fn test_filename_rfc2231_extended() {
        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''%E2%82%AC.pdf");
        assert_eq!(cd.filename().as_deref(), Some("€.pdf"));
    }

    #[test]
    fn test_filename_rfc2231_continuation() {
        let cd = ContentDisposition::parse(
            "attachment; filename*0*=UTF-8''long%20; filename*1=\"name\"; filename*2=\".txt\"",
        );
        assert_eq!(cd.filename().as_deref(), Some("long name.txt"));
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("plain"), "plain");
    }
}
