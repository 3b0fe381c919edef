//! # mailsweep-core
//!
//! Archive every message of one mailbox for a calendar year to disk, then
//! delete it from the server, until the server reports none left.
//!
//! This crate provides:
//! - [`Year`] and [`YearWindow`]: validated input and the search window
//! - [`sanitize`] and [`safe_file_name`]: header text to path components
//! - [`MessageRecord`]: the parts of a raw message the archiver needs
//! - [`Archiver`]: durable, idempotent writes of messages and attachments
//! - [`SessionManager`]: bounded connect retries over a [`Connector`]
//! - [`Reconciler`]: the search, archive, delete loop with per-message retry
//! - [`Config`]: JSON configuration with whole-file validation
//!
//! The mail server sits behind the [`Connector`] and [`MailSession`] traits;
//! [`ImapConnector`] is the production implementation.
//!
//! ## Ordering guarantee
//!
//! A message is deleted only after its `.eml` file has been written, synced
//! and renamed into place. A crash between the two steps leaves the message
//! on the server; the next run archives it again to the same path.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod backend;
pub mod config;
mod error;
pub mod reconcile;
pub mod record;
pub mod report;
mod sanitize;
pub mod session;
mod year;

pub use archive::{ArchiveError, ArchivedMessage, Archiver, AttachmentError};
pub use backend::{BackendError, Connector, ImapConnector, ImapMailSession, MailSession, MessageRef};
pub use config::{Config, ConfigError, ValidationError};
pub use error::{Error, Result};
pub use reconcile::{MessageError, Reconciler, StopFlag};
pub use record::{AttachmentPart, MessageRecord};
pub use report::{Event, LogSink, MemorySink, Outcome, PassSummary, ReportSink, RunSummary};
pub use sanitize::{safe_file_name, sanitize};
pub use session::{RetryPolicy, SessionManager};
pub use year::{Year, YearError, YearWindow};
