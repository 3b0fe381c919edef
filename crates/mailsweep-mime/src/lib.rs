//! # mailsweep-mime
//!
//! Lenient MIME parsing for archiving raw email messages.
//!
//! The parser never rejects a message: malformed structure degrades to a
//! single-part body and malformed encodings decode lossily. It extracts only
//! what an archiver needs: headers, the part tree, attachment names and
//! transfer-decoded payloads, and the year of the `Date` header.
//!
//! ## Quick Start
//!
//! ```
//! use mailsweep_mime::Message;
//!
//! let raw = b"Subject: =?utf-8?B?SMOpbGxv?=\r\n\
//!             Date: Tue, 2 Jan 2024 10:00:00 +0000\r\n\
//!             \r\n\
//!             Body";
//!
//! let message = Message::parse(raw);
//! assert_eq!(message.subject().as_deref(), Some("Héllo"));
//! assert_eq!(message.year(), Some(2024));
//! ```
//!
//! ## Walking parts
//!
//! ```
//! use mailsweep_mime::Message;
//!
//! let raw = b"Content-Type: multipart/mixed; boundary=XX\r\n\
//!             \r\n\
//!             --XX\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             hello\r\n\
//!             --XX\r\n\
//!             Content-Type: application/pdf; name=\"report.pdf\"\r\n\
//!             Content-Disposition: attachment\r\n\
//!             \r\n\
//!             %PDF\r\n\
//!             --XX--\r\n";
//!
//! let message = Message::parse(raw);
//! let names: Vec<_> = message.walk().filter_map(|p| p.filename()).collect();
//! assert_eq!(names, ["report.pdf"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod date;
pub mod encoding;

pub use content_type::{ContentDisposition, ContentType, Parameters};
pub use encoding::decode_header;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding, Walk};
