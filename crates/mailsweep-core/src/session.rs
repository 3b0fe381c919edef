//! Connection lifecycle with bounded retries.

use std::time::Duration;

use crate::backend::Connector;
use crate::error::{Error, Result};

/// Attempt counts and delays for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts before the run is aborted.
    pub connect_attempts: u32,
    /// Delay between connection attempts.
    pub connect_delay: Duration,
    /// Extra attempts for a message after a transport error.
    pub message_retries: u32,
    /// Delay before reconnecting for a retry.
    pub retry_delay: Duration,
    /// Delay between passes.
    pub rescan_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            connect_delay: Duration::from_secs(3),
            message_retries: 2,
            retry_delay: Duration::from_secs(3),
            rescan_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Total attempts per message, the first one included.
    #[must_use]
    pub const fn message_attempts(&self) -> u32 {
        self.message_retries.saturating_add(1)
    }
}

/// Opens sessions, retrying failed connection attempts.
///
/// Sessions are never repaired: after a transport error the caller drops
/// the session and asks for a new one.
#[derive(Debug)]
pub struct SessionManager<C> {
    connector: C,
    policy: RetryPolicy,
}

impl<C: Connector> SessionManager<C> {
    /// Creates a session manager.
    pub const fn new(connector: C, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    /// Returns the retry policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Connects, logs in and selects the mailbox.
    ///
    /// Makes up to `connect_attempts` attempts with `connect_delay` between
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reconnect`] carrying the last failure when every
    /// attempt fails.
    pub async fn connect(&self) -> Result<C::Session> {
        let attempts = self.policy.connect_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.connector.connect().await {
                Ok(session) => {
                    tracing::debug!(attempt, "Connected");
                    return Ok(session);
                }
                Err(source) if attempt >= attempts => {
                    tracing::error!(attempt, error = %source, "Giving up connecting");
                    return Err(Error::Reconnect { attempts, source });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Connection attempt failed, retrying");
                    tokio::time::sleep(self.policy.connect_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
