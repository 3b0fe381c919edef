//! Connection configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default IMAP over implicit TLS port.
pub const DEFAULT_PORT: u16 = 993;

/// Default mailbox to select after login.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// TLS cipher policy for the server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherPolicy {
    /// TLS 1.2 and 1.3 restricted to ECDHE key exchange with AEAD ciphers.
    #[default]
    Hardened,
    /// TLS 1.3 only.
    Tls13,
    /// The TLS provider's default suites and versions.
    Default,
}

impl CipherPolicy {
    /// Returns the configuration name of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hardened => "hardened",
            Self::Tls13 => "tls13",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for CipherPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardened" => Ok(Self::Hardened),
            "tls13" => Ok(Self::Tls13),
            "default" => Ok(Self::Default),
            other => Err(format!("unknown cipher policy: {other}")),
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Mailbox selected after login.
    pub mailbox: String,
    /// TLS cipher policy.
    pub cipher_policy: CipherPolicy,
    /// Timeout for TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Timeout for each command round trip.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: u16,
    mailbox: String,
    cipher_policy: CipherPolicy,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            mailbox: DEFAULT_MAILBOX.to_string(),
            cipher_policy: CipherPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the mailbox to select.
    #[must_use]
    pub fn mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Sets the cipher policy.
    #[must_use]
    pub const fn cipher_policy(mut self, policy: CipherPolicy) -> Self {
        self.cipher_policy = policy;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            mailbox: self.mailbox,
            cipher_policy: self.cipher_policy,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
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

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.cipher_policy, CipherPolicy::Hardened);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.io_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1993)
            .mailbox("Archive")
            .cipher_policy(CipherPolicy::Tls13)
            .connect_timeout(Duration::from_secs(10))
            .io_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.port, 1993);
        assert_eq!(config.mailbox, "Archive");
        assert_eq!(config.cipher_policy, CipherPolicy::Tls13);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_cipher_policy_names() {
        for policy in [CipherPolicy::Hardened, CipherPolicy::Tls13, CipherPolicy::Default] {
            assert_eq!(policy.as_str().parse::<CipherPolicy>().unwrap(), policy);
        }
        assert_eq!(" TLS13 ".parse::<CipherPolicy>().unwrap(), CipherPolicy::Tls13);
        assert!("export".parse::<CipherPolicy>().is_err());
    }

    #[test]
    fn test_cipher_policy_serde() {
        let policy: CipherPolicy = serde_json::from_str("\"tls13\"").unwrap();
        assert_eq!(policy, CipherPolicy::Tls13);
        assert_eq!(serde_json::to_string(&CipherPolicy::Hardened).unwrap(), "\"hardened\"");
    }
}
