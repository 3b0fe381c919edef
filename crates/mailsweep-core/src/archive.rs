//! Writing messages and attachments to disk.
//!
//! Layout under the archive root:
//!
//! ```text
//! <root>/<YYYY>/<base>.eml
//! <root>/<YYYY>/<attachment name>
//! <root>/Unknown_Year/...
//! ```
//!
//! Every file is written to a hidden sibling, synced, then renamed over the
//! target. Archiving the same message twice therefore leaves one complete
//! file, never a duplicate or a torn one.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::record::{AttachmentPart, MessageRecord};
use crate::report::{Event, ReportSink};
use crate::sanitize::{safe_file_name, sanitize};

/// Folder for messages whose `Date` header does not parse.
pub const UNKNOWN_YEAR: &str = "Unknown_Year";

/// Name for attachments whose file name sanitizes to nothing.
pub const ATTACHMENT_FALLBACK: &str = "attachment.bin";

const NO_SUBJECT: &str = "No_Subject";

/// Appended to attachment names that would otherwise end in `.eml`.
const ATTACHMENT_SUFFIX: &str = ".attachment";

/// Longest file name written, in bytes. Sanitized names are ASCII.
const MAX_NAME_LEN: usize = 200;

/// Longest extension kept when a name is shortened.
const MAX_EXTENSION_LEN: usize = 16;

/// Failure to store the message itself.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The year folder could not be created.
    #[error("Cannot create folder {}: {source}", .path.display())]
    CreateFolder {
        /// Folder path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The `.eml` file could not be written.
    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure to store one attachment. Never fails the message.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The attachment file could not be written.
    #[error("Cannot write attachment {}: {source}", .path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Where a message ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedMessage {
    /// Path of the `.eml` file.
    pub path: PathBuf,
    /// Paths of the attachments written.
    pub attachments: Vec<PathBuf>,
    /// Number of attachments that could not be saved.
    pub failed_attachments: usize,
}

/// Returns the year folder name for a record: the four-digit year of its
/// `Date` header, or [`UNKNOWN_YEAR`].
#[must_use]
pub fn year_folder(record: &MessageRecord) -> String {
    record
        .year()
        .map_or_else(|| UNKNOWN_YEAR.to_string(), |year| format!("{year:04}"))
}

/// Returns the file stem for a record.
///
/// The sanitized `Message-ID` when present, so the same message always maps
/// to the same file. Otherwise the date and subject.
#[must_use]
pub fn base_name(record: &MessageRecord) -> String {
    let name = match record.message_id().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => sanitize(id),
        None => {
            let date = record
                .date()
                .unwrap_or_default()
                .replace(' ', "_")
                .replace(':', "-");
            let subject = record
                .subject()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_SUBJECT);
            sanitize(&format!("{date}_{subject}"))
        }
    };
    shorten(name)
}

/// Caps a sanitized name at [`MAX_NAME_LEN`], keeping a short extension.
fn shorten(mut name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot <= MAX_EXTENSION_LEN => {
            let extension = name.split_off(dot);
            name.truncate(MAX_NAME_LEN - extension.len());
            name.push_str(&extension);
        }
        _ => name.truncate(MAX_NAME_LEN),
    }
    name
}

/// Writes `bytes` to `path` through a synced temporary sibling.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.part"));

    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, path).await?;
        sync_parent(path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}

/// Makes a completed rename durable.
#[cfg(unix)]
async fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) => tokio::fs::File::open(dir).await?.sync_all().await,
        None => Ok(()),
    }
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Persists messages under an archive root.
#[derive(Debug, Clone)]
pub struct Archiver {
    root: PathBuf,
}

impl Archiver {
    /// Creates an archiver writing below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes the raw message and its attachments.
    ///
    /// Returns once the `.eml` file is durable. Attachment failures are
    /// reported to `sink` and counted, but do not fail the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the year folder or the `.eml` file cannot be
    /// written.
    pub async fn archive(
        &self,
        record: &MessageRecord,
        sink: &mut impl ReportSink,
    ) -> Result<ArchivedMessage, ArchiveError> {
        let folder = self.root.join(year_folder(record));
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| ArchiveError::CreateFolder {
                path: folder.clone(),
                source,
            })?;

        let path = folder.join(format!("{}.eml", base_name(record)));
        write_atomic(&path, record.raw())
            .await
            .map_err(|source| ArchiveError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Wrote message");

        let mut archived = ArchivedMessage {
            path,
            attachments: Vec::new(),
            failed_attachments: 0,
        };

        for attachment in record.attachments() {
            match save_attachment(&folder, attachment).await {
                Ok(Some(path)) => {
                    archived.attachments.push(path.clone());
                    sink.report(Event::AttachmentSaved { path });
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%error, "Attachment not saved");
                    archived.failed_attachments += 1;
                    sink.report(Event::AttachmentFailed(error));
                }
            }
        }

        Ok(archived)
    }
}

/// Returns the file name for an attachment.
///
/// Attachments share the year folder with archived messages, so a name can
/// never end in `.eml` (in any case): it could replace a message whose server
/// copy is about to be deleted.
fn attachment_name(filename: &str) -> String {
    let name = shorten(safe_file_name(filename, ATTACHMENT_FALLBACK));
    if name.to_ascii_lowercase().ends_with(".eml") {
        shorten(name + ATTACHMENT_SUFFIX)
    } else {
        name
    }
}

/// Writes one attachment into `folder`. Empty payloads are skipped.
async fn save_attachment(
    folder: &Path,
    attachment: &AttachmentPart,
) -> Result<Option<PathBuf>, AttachmentError> {
    if attachment.payload.is_empty() {
        return Ok(None);
    }

    let path = folder.join(attachment_name(&attachment.filename));
    write_atomic(&path, &attachment.payload)
        .await
        .map_err(|source| AttachmentError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(Some(path))
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
    use crate::report::MemorySink;

    fn record(raw: &str) -> MessageRecord {
        MessageRecord::parse(raw.as_bytes().to_vec())
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    const WITH_ATTACHMENT: &str = "Message-ID: <m1@example.com>\r\n\
Date: Tue, 2 Jan 2024 10:00:00 +0000\r\n\
Subject: Report\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
body\r\n\
--b\r\n\
Content-Type: text/plain; name=\"notes/../q1.txt\"\r\n\
Content-Disposition: attachment\r\n\
\r\n\
numbers\r\n\
--b--\r\n";

    #[test]
    fn test_base_name_prefers_message_id() {
        let r = record("Message-ID: <a.b@c>\r\nSubject: x\r\n\r\n");
        assert_eq!(base_name(&r), "_a.b_c_");
    }

    #[test]
    fn test_base_name_from_date_and_subject() {
        let r = record("Date: Tue, 2 Jan 2024 10:00:00 +0000\r\nSubject: Hi there\r\n\r\n");
        assert_eq!(base_name(&r), "Tue__2_Jan_2024_10-00-00__0000_Hi_there");
    }

    #[test]
    fn test_base_name_without_subject() {
        let r = record("Message-ID:   \r\nDate: 1 Jan 2020 00:00 +0000\r\n\r\n");
        assert_eq!(base_name(&r), "1_Jan_2020_00-00__0000_No_Subject");
        assert_eq!(base_name(&record("\r\nbody")), "_No_Subject");
    }

    #[test]
    fn test_shorten_keeps_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let short = shorten(long);
        assert_eq!(short.len(), MAX_NAME_LEN);
        assert!(short.ends_with("a.pdf"));

        let no_ext = shorten("b".repeat(300));
        assert_eq!(no_ext.len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_year_folder() {
        assert_eq!(year_folder(&record("Date: 5 May 1999 12:00 +0000\r\n\r\n")), "1999");
        assert_eq!(year_folder(&record("Date: someday\r\n\r\n")), UNKNOWN_YEAR);
        assert_eq!(year_folder(&record("Subject: no date\r\n\r\n")), UNKNOWN_YEAR);
    }

    #[tokio::test]
    async fn test_archive_writes_message_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(dir.path());
        let mut sink = MemorySink::new();

        let archived = archiver
            .archive(&record(WITH_ATTACHMENT), &mut sink)
            .await
            .unwrap();

        let year = dir.path().join("2024");
        assert_eq!(archived.path, year.join("_m1_example.com_.eml"));
        assert_eq!(
            std::fs::read(&archived.path).unwrap(),
            WITH_ATTACHMENT.as_bytes()
        );
        assert_eq!(archived.attachments, vec![year.join("notes_.._q1.txt")]);
        assert_eq!(std::fs::read(&archived.attachments[0]).unwrap(), b"numbers");
        assert_eq!(archived.failed_attachments, 0);
        assert!(matches!(sink.events[..], [Event::AttachmentSaved { .. }]));
        assert_eq!(
            files_in(&year),
            vec!["_m1_example.com_.eml", "notes_.._q1.txt"]
        );
    }

    #[tokio::test]
    async fn test_archive_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(dir.path());
        let mut sink = MemorySink::new();
        let r = record(WITH_ATTACHMENT);

        let first = archiver.archive(&r, &mut sink).await.unwrap();
        let second = archiver.archive(&r, &mut sink).await.unwrap();

        assert_eq!(first, second);
        let year = dir.path().join("2024");
        assert_eq!(
            files_in(&year),
            vec!["_m1_example.com_.eml", "notes_.._q1.txt"]
        );
        assert_eq!(std::fs::read(&first.path).unwrap(), WITH_ATTACHMENT.as_bytes());
    }

    #[tokio::test]
    async fn test_unparsable_date_goes_to_unknown_year() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(dir.path());
        let raw = "Message-ID: <x@y>\r\nDate: the day after tomorrow\r\n\r\nhi";

        let archived = archiver
            .archive(&record(raw), &mut MemorySink::new())
            .await
            .unwrap();

        assert_eq!(archived.path, dir.path().join(UNKNOWN_YEAR).join("_x_y_.eml"));
        assert!(archived.path.exists());
    }

    #[tokio::test]
    async fn test_undecodable_attachment_is_saved_as_sent() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(dir.path());
        let mut sink = MemorySink::new();
        let raw = "Message-ID: <bad@x>\r\n\
Date: 1 Feb 2023 08:00 +0000\r\n\
Content-Type: multipart/mixed; boundary=q\r\n\
\r\n\
--q\r\n\
Content-Disposition: attachment; filename=\"\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
SGVsb\r\n\
--q\r\n\
Content-Disposition: attachment; filename=\"empty.txt\"\r\n\
\r\n\
--q--\r\n";

        let archived = archiver.archive(&record(raw), &mut sink).await.unwrap();

        let fallback = dir.path().join("2023").join(ATTACHMENT_FALLBACK);
        assert_eq!(archived.attachments, vec![fallback.clone()]);
        assert_eq!(std::fs::read(&fallback).unwrap(), b"SGVsb");
        assert_eq!(archived.failed_attachments, 0);
        assert_eq!(sink.attachment_failures(), 0);
        assert!(!dir.path().join("2023").join("empty.txt").exists());
    }

    #[test]
    fn test_attachment_name_never_ends_in_eml() {
        assert_eq!(attachment_name("report.pdf"), "report.pdf");
        assert_eq!(attachment_name(""), ATTACHMENT_FALLBACK);
        assert_eq!(attachment_name("_x_y_.eml"), "_x_y_.eml.attachment");
        assert_eq!(attachment_name("Forwarded.EML"), "Forwarded.EML.attachment");

        let long = attachment_name(&format!("{}.eml", "a".repeat(300)));
        assert_eq!(long.len(), MAX_NAME_LEN);
        assert!(long.ends_with(".attachment"));

        // Truncation alone must not produce a `.eml` ending either.
        let truncated = attachment_name(&format!("{}.eml{}", "b".repeat(196), "c".repeat(40)));
        assert!(!truncated.to_ascii_lowercase().ends_with(".eml"));
    }

    #[tokio::test]
    async fn test_attachment_cannot_replace_archived_message() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(dir.path());
        let mut sink = MemorySink::new();
        let raw = "Message-ID: <x@y>\r\n\
Date: 1 Mar 2023 08:00 +0000\r\n\
Content-Type: multipart/mixed; boundary=q\r\n\
\r\n\
--q\r\n\
Content-Disposition: attachment; filename=\"_x_y_.eml\"\r\n\
\r\n\
EVIL\r\n\
--q--\r\n";

        let archived = archiver.archive(&record(raw), &mut sink).await.unwrap();

        let year = dir.path().join("2023");
        assert_eq!(archived.path, year.join("_x_y_.eml"));
        assert_eq!(std::fs::read(&archived.path).unwrap(), raw.as_bytes());
        assert_eq!(archived.attachments, vec![year.join("_x_y_.eml.attachment")]);
        assert_eq!(std::fs::read(&archived.attachments[0]).unwrap(), b"EVIL");
    }

    #[tokio::test]
    async fn test_attachment_write_failure_does_not_fail_message() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the attachment file should go.
        std::fs::create_dir_all(dir.path().join("2024").join("notes_.._q1.txt")).unwrap();
        let archiver = Archiver::new(dir.path());
        let mut sink = MemorySink::new();

        let archived = archiver
            .archive(&record(WITH_ATTACHMENT), &mut sink)
            .await
            .unwrap();

        assert!(archived.path.exists());
        assert_eq!(archived.failed_attachments, 1);
        assert!(matches!(
            &sink.events[0],
            Event::AttachmentFailed(AttachmentError::Write { .. })
        ));
        assert!(!dir.path().join("2024").join(".notes_.._q1.txt.part").exists());
    }

    #[tokio::test]
    async fn test_unwritable_root_fails_message() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let archiver = Archiver::new(&blocker);

        let err = archiver
            .archive(&record(WITH_ATTACHMENT), &mut MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::CreateFolder { .. }));
    }
}
