//! Configuration model.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use mailsweep_imap::CipherPolicy;
use serde::{Deserialize, Serialize};

use crate::session::RetryPolicy;

/// Default server host.
pub const DEFAULT_HOST: &str = "export.imap.mail.yahoo.com";

/// Complete mailsweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Account credentials.
    pub account: AccountSettings,
    /// Server connection settings.
    #[serde(default)]
    pub server: ServerSettings,
    /// Directory that receives one folder per year.
    pub archive_root: PathBuf,
    /// Retry and delay settings.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Account credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Login name.
    pub username: String,
    /// App password. May instead come from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSettings")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Server connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server hostname.
    pub host: String,
    /// Server port (implicit TLS).
    pub port: u16,
    /// Mailbox to archive.
    pub mailbox: String,
    /// TLS cipher policy.
    pub cipher_policy: CipherPolicy,
    /// Connect plus handshake timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Per-command timeout in seconds.
    pub io_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
            cipher_policy: CipherPolicy::Hardened,
            connect_timeout_secs: 30,
            io_timeout_secs: 30,
        }
    }
}

/// Retry and delay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Connection attempts before giving up.
    pub connect_attempts: u32,
    /// Delay between connection attempts in seconds.
    pub connect_delay_secs: u64,
    /// Extra attempts per message after a transport error.
    pub message_retries: u32,
    /// Delay before retrying a message in seconds.
    pub retry_delay_secs: u64,
    /// Delay between passes in seconds.
    pub rescan_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            connect_delay_secs: 3,
            message_retries: 2,
            retry_delay_secs: 3,
            rescan_delay_secs: 5,
        }
    }
}

impl Config {
    /// Creates a configuration with default server and retry settings.
    #[must_use]
    pub fn new(username: impl Into<String>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            account: AccountSettings {
                username: username.into(),
                password: None,
            },
            server: ServerSettings::default(),
            archive_root: archive_root.into(),
            retry: RetrySettings::default(),
        }
    }

    /// Replaces the password when `password` is set and non-empty.
    #[must_use]
    pub fn with_password_override(mut self, password: Option<String>) -> Self {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.account.password = Some(password);
        }
        self
    }

    /// Builds the IMAP connection settings.
    #[must_use]
    pub fn imap_config(&self) -> mailsweep_imap::Config {
        mailsweep_imap::Config::builder(self.server.host.trim())
            .port(self.server.port)
            .mailbox(self.server.mailbox.clone())
            .cipher_policy(self.server.cipher_policy)
            .connect_timeout(Duration::from_secs(self.server.connect_timeout_secs))
            .io_timeout(Duration::from_secs(self.server.io_timeout_secs))
            .build()
    }

    /// Builds the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connect_attempts: self.retry.connect_attempts,
            connect_delay: Duration::from_secs(self.retry.connect_delay_secs),
            message_retries: self.retry.message_retries,
            retry_delay: Duration::from_secs(self.retry.retry_delay_secs),
            rescan_delay: Duration::from_secs(self.retry.rescan_delay_secs),
        }
    }
}
