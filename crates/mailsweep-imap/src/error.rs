//! Error types for the IMAP transport.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration or handshake error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// The server closed the connection.
    #[error("Connection lost")]
    ConnectionLost,

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A FETCH completed without returning the message body.
    #[error("No body returned for UID {0}")]
    MissingBody(u32),

    /// Protocol violation or unparsable server data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true for failures of the connection itself.
    ///
    /// After a transport error the session must be discarded and a new one
    /// opened; the server may never have seen the command.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::ConnectionLost | Self::Timeout(_)
        )
    }
}

impl From<async_imap::error::Error> for Error {
    fn from(err: async_imap::error::Error) -> Self {
        use async_imap::error::Error as ImapError;
        match err {
            ImapError::Io(e) => Self::Io(e),
            ImapError::ConnectionLost => Self::ConnectionLost,
            ImapError::No(msg) => Self::No(msg),
            ImapError::Bad(msg) => Self::Bad(msg),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::ConnectionLost.is_transport());
        assert!(Error::Timeout(Duration::from_secs(30)).is_transport());
        assert!(Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).is_transport());

        assert!(!Error::No("no such message".into()).is_transport());
        assert!(!Error::MissingBody(7).is_transport());
        assert!(!Error::Auth("bad credentials".into()).is_transport());
    }

    #[test]
    fn test_from_imap_error() {
        let err: Error = async_imap::error::Error::ConnectionLost.into();
        assert!(matches!(err, Error::ConnectionLost));

        let err: Error = async_imap::error::Error::No("[NONEXISTENT]".into()).into();
        assert!(matches!(err, Error::No(msg) if msg == "[NONEXISTENT]"));
    }
}
