//! The mail server boundary.
//!
//! The reconciliation loop only talks to a server through these two traits,
//! which lets tests script a server without a network.

mod imap;

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::year::YearWindow;

pub use imap::{ImapConnector, ImapMailSession};

/// Server-assigned identifier of one message in the selected mailbox.
///
/// For IMAP this is the UID. The loop still re-searches after every pass
/// instead of carrying references across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageRef(pub u32);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors reported by a mail backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The connection failed; the session must be replaced.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server refused or could not complete the request.
    #[error("Server error: {0}")]
    Server(String),

    /// The message is no longer in the mailbox.
    #[error("Message not found: {0}")]
    NotFound(String),
}

impl BackendError {
    /// Returns true if the operation may succeed on a fresh session.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<mailsweep_imap::Error> for BackendError {
    fn from(err: mailsweep_imap::Error) -> Self {
        match err {
            err if err.is_transport() => Self::Transport(err.to_string()),
            mailsweep_imap::Error::Auth(msg) => Self::Auth(msg),
            err @ mailsweep_imap::Error::MissingBody(_) => Self::NotFound(err.to_string()),
            err => Self::Server(err.to_string()),
        }
    }
}

/// An authenticated session with the target mailbox selected.
pub trait MailSession: Send {
    /// Returns every message whose date falls inside `window`.
    ///
    /// No matches is an empty vector, not an error.
    fn search(
        &mut self,
        window: YearWindow,
    ) -> impl Future<Output = Result<Vec<MessageRef>, BackendError>> + Send;

    /// Returns the complete raw message.
    fn fetch(
        &mut self,
        message: MessageRef,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    /// Marks the message deleted and expunges it.
    fn delete(&mut self, message: MessageRef)
    -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Ends the session.
    fn logout(self) -> impl Future<Output = Result<(), BackendError>> + Send
    where
        Self: Sized;
}

/// Opens new sessions.
pub trait Connector: Send + Sync {
    /// Session type produced by this connector.
    type Session: MailSession;

    /// Connects, authenticates and selects the mailbox. Makes one attempt.
    fn connect(&self) -> impl Future<Output = Result<Self::Session, BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_imap_error_classification() {
        let err = BackendError::from(mailsweep_imap::Error::Timeout(Duration::from_secs(30)));
        assert!(err.is_transient());

        let err = BackendError::from(mailsweep_imap::Error::Auth("bad password".into()));
        assert!(matches!(err, BackendError::Auth(ref msg) if msg == "bad password"));
        assert!(!err.is_transient());

        let err = BackendError::from(mailsweep_imap::Error::MissingBody(4));
        assert!(matches!(err, BackendError::NotFound(_)));
        assert!(!err.is_transient());

        let err = BackendError::from(mailsweep_imap::Error::No("SEARCH failed".into()));
        assert!(matches!(err, BackendError::Server(_)));
    }

    #[test]
    fn test_message_ref_display() {
        assert_eq!(MessageRef(42).to_string(), "42");
    }
}
