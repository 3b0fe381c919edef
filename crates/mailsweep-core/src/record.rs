//! The decoded view of a fetched message.

use mailsweep_mime::Message;

/// An attachment found in a message.
#[derive(Debug)]
pub struct AttachmentPart {
    /// Decoded file name as sent, possibly empty. Not yet sanitized.
    pub filename: String,
    /// Transfer-decoded payload. Bodies that do not decode are kept as sent.
    pub payload: Vec<u8>,
}

/// What the archiver needs from one raw message.
#[derive(Debug)]
pub struct MessageRecord {
    raw: Vec<u8>,
    date: Option<String>,
    year: Option<i32>,
    subject: Option<String>,
    message_id: Option<String>,
    attachments: Vec<AttachmentPart>,
}

impl MessageRecord {
    /// Parses a raw RFC 5322 message. Never fails; missing or malformed
    /// headers become `None`.
    #[must_use]
    pub fn parse(raw: Vec<u8>) -> Self {
        let message = Message::parse(&raw);

        let attachments = message
            .walk()
            .filter(|part| part.is_attachment())
            .filter_map(|part| {
                let payload = part.payload()?;
                Some(AttachmentPart {
                    filename: part.filename().unwrap_or_default(),
                    payload,
                })
            })
            .collect();

        let date = message.date().map(str::to_string);
        let year = message.year();
        let subject = message.subject();
        let message_id = message.message_id().map(str::to_string);

        Self {
            raw,
            date,
            year,
            subject,
            message_id,
            attachments,
        }
    }

    /// Returns the message exactly as fetched.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the raw `Date` header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Returns the year of the `Date` header, if it parses.
    #[must_use]
    pub const fn year(&self) -> Option<i32> {
        self.year
    }

    /// Returns the decoded `Subject` header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the `Message-ID` header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Returns the attachments in document order.
    #[must_use]
    pub fn attachments(&self) -> &[AttachmentPart] {
        &self.attachments
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RAW: &[u8] = b"Message-ID: <abc@example.com>\r\n\
Date: Tue, 2 Jan 2024 10:00:00 +0000\r\n\
Subject: =?utf-8?Q?Caf=C3=A9_menu?=\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--b1\r\n\
Content-Type: application/pdf; name=\"menu.pdf\"\r\n\
Content-Disposition: attachment; filename=\"menu.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0=\r\n\
--b1\r\n\
Content-Type: image/png\r\n\
Content-Disposition: inline\r\n\
\r\n\
not an attachment\r\n\
--b1--\r\n";

    #[test]
    fn test_parse_headers() {
        let record = MessageRecord::parse(RAW.to_vec());
        assert_eq!(record.message_id(), Some("<abc@example.com>"));
        assert_eq!(record.date(), Some("Tue, 2 Jan 2024 10:00:00 +0000"));
        assert_eq!(record.year(), Some(2024));
        assert_eq!(record.subject(), Some("Café menu"));
        assert_eq!(record.raw(), RAW);
    }

    #[test]
    fn test_parse_attachments() {
        let record = MessageRecord::parse(RAW.to_vec());
        let attachments = record.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "menu.pdf");
        assert_eq!(attachments[0].payload, b"%PDF-");
    }

    #[test]
    fn test_parse_bare_message() {
        let record = MessageRecord::parse(b"no headers at all".to_vec());
        assert_eq!(record.message_id(), None);
        assert_eq!(record.date(), None);
        assert_eq!(record.year(), None);
        assert_eq!(record.subject(), None);
        assert!(record.attachments().is_empty());
    }

    #[test]
    fn test_disposition_without_filename() {
        let raw = b"Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment\r\n\
\r\n\
data";
        let record = MessageRecord::parse(raw.to_vec());
        assert_eq!(record.attachments().len(), 1);
        assert_eq!(record.attachments()[0].filename, "");
    }
}
