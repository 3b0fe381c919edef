//! IMAP implementation of the backend traits.

use std::fmt;

use mailsweep_imap::ImapSession;

use super::{BackendError, Connector, MailSession, MessageRef};
use crate::config::Config;
use crate::year::YearWindow;

/// Connects to the configured IMAP server.
#[derive(Clone)]
pub struct ImapConnector {
    config: mailsweep_imap::Config,
    username: String,
    password: String,
}

impl fmt::Debug for ImapConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConnector")
            .field("config", &self.config)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ImapConnector {
    /// Creates a connector from loaded configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.imap_config(),
            username: config.account.username.clone(),
            password: config.account.password.clone().unwrap_or_default(),
        }
    }
}

impl Connector for ImapConnector {
    type Session = ImapMailSession;

    async fn connect(&self) -> Result<ImapMailSession, BackendError> {
        let inner = ImapSession::connect(&self.config, &self.username, &self.password).await?;
        Ok(ImapMailSession { inner })
    }
}

/// A live IMAP session.
#[derive(Debug)]
pub struct ImapMailSession {
    inner: ImapSession,
}

impl MailSession for ImapMailSession {
    async fn search(&mut self, window: YearWindow) -> Result<Vec<MessageRef>, BackendError> {
        let uids = self.inner.uid_search(window.since, window.before).await?;
        Ok(uids.into_iter().map(MessageRef).collect())
    }

    async fn fetch(&mut self, message: MessageRef) -> Result<Vec<u8>, BackendError> {
        Ok(self.inner.fetch(message.0).await?)
    }

    async fn delete(&mut self, message: MessageRef) -> Result<(), BackendError> {
        Ok(self.inner.delete(message.0).await?)
    }

    async fn logout(self) -> Result<(), BackendError> {
        Ok(self.inner.logout().await?)
    }
}
