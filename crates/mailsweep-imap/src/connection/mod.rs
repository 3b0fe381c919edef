//! IMAP connection management.
//!
//! This module provides:
//! - Configuration (host, port, mailbox, cipher policy, timeouts)
//! - The TLS stream and connector built from a [`CipherPolicy`]

mod config;
mod stream;

pub use config::{CipherPolicy, Config, ConfigBuilder};
pub use stream::{ImapStream, connect_tls, create_tls_connector};
