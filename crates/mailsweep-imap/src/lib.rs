//! # mailsweep-imap
//!
//! The IMAP-over-TLS transport used by mailsweep.
//!
//! This crate is deliberately narrow: it opens an implicit-TLS connection with
//! a configurable cipher policy, logs in, selects one mailbox and exposes the
//! four operations an archiver needs.
//!
//! - `UID SEARCH SINCE .. BEFORE ..` for a date window
//! - `UID FETCH <uid> BODY.PEEK[]` for the raw message
//! - `UID STORE <uid> +FLAGS (\Deleted)` followed by `EXPUNGE`
//! - `LOGOUT`
//!
//! Every network step is bounded by a timeout. A timeout surfaces as
//! [`Error::Timeout`] and, like I/O failures, reports `true` from
//! [`Error::is_transport`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use chrono::NaiveDate;
//! use mailsweep_imap::{Config, ImapSession};
//!
//! #[tokio::main]
//! async fn main() -> mailsweep_imap::Result<()> {
//!     let config = Config::builder("imap.example.com").mailbox("INBOX").build();
//!     let mut session = ImapSession::connect(&config, "user@example.com", "secret").await?;
//!
//!     let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!     let before = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//!     for uid in session.uid_search(since, before).await? {
//!         let raw = session.fetch(uid).await?;
//!         println!("{uid}: {} bytes", raw.len());
//!     }
//!
//!     session.logout().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod connection;
mod error;
mod session;

pub use connection::{CipherPolicy, Config, ConfigBuilder, ImapStream, connect_tls};
pub use error::{Error, Result};
pub use session::{ImapSession, search_query};
