//! Configuration loading.
//!
//! The configuration is a JSON file read once at startup. Its location is
//! `$MAILSWEEP_CONFIG` if set, otherwise `mailsweep/config.json` under the
//! platform configuration directory. `MAILSWEEP_PASSWORD` supplies or
//! overrides the account password so it need not be stored on disk.

mod model;
mod validation;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use model::{AccountSettings, Config, DEFAULT_HOST, RetrySettings, ServerSettings};
pub use validation::{ValidationError, ValidationResult, validate};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MAILSWEEP_CONFIG";

/// Environment variable carrying the account password.
pub const PASSWORD_ENV: &str = "MAILSWEEP_PASSWORD";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("Cannot parse config file {}: {source}", .path.display())]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The configuration parsed but has invalid values.
    #[error("Invalid configuration: {}", join(.0))]
    Invalid(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Returns the configuration file path.
#[must_use]
pub fn default_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(
        || {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailsweep")
                .join("config.json")
        },
        PathBuf::from,
    )
}

/// Parses and validates configuration JSON.
///
/// `password` overrides the password from the file when set.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed JSON and
/// [`ConfigError::Invalid`] listing every invalid value.
pub fn from_json(path: &Path, text: &str, password: Option<String>) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let config = config.with_password_override(password);
    validate(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Loads configuration from `path`, applying the password from
/// `MAILSWEEP_PASSWORD` if set.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub async fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let config = from_json(path, &text, std::env::var(PASSWORD_ENV).ok())?;
    tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailsweep_imap::CipherPolicy;
    use std::time::Duration;

    const MINIMAL: &str = r#"{
        "account": { "username": "me@yahoo.com", "password": "app-password" },
        "archive_root": "/home/me/MailArchive"
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = from_json(Path::new("config.json"), MINIMAL, None).unwrap();
        assert_eq!(config.server.host, "export.imap.mail.yahoo.com");
        assert_eq!(config.server.port, 993);
        assert_eq!(config.server.mailbox, "INBOX");
        assert_eq!(config.server.cipher_policy, CipherPolicy::Hardened);
        assert_eq!(config.retry, RetrySettings::default());

        let policy = config.retry_policy();
        assert_eq!(policy.connect_attempts, 3);
        assert_eq!(policy.connect_delay, Duration::from_secs(3));
        assert_eq!(policy.message_retries, 2);
        assert_eq!(policy.rescan_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_full_config() {
        let text = r#"{
            "account": { "username": "me@example.com", "password": "pw" },
            "server": {
                "host": "imap.example.com",
                "port": 1993,
                "mailbox": "Archive",
                "cipher_policy": "tls13",
                "connect_timeout_secs": 10,
                "io_timeout_secs": 20
            },
            "archive_root": "/srv/mail",
            "retry": { "message_retries": 5 }
        }"#;
        let config = from_json(Path::new("config.json"), text, None).unwrap();
        let imap = config.imap_config();
        assert_eq!(imap.host, "imap.example.com");
        assert_eq!(imap.port, 1993);
        assert_eq!(imap.mailbox, "Archive");
        assert_eq!(imap.cipher_policy, CipherPolicy::Tls13);
        assert_eq!(imap.connect_timeout, Duration::from_secs(10));
        assert_eq!(imap.io_timeout, Duration::from_secs(20));
        assert_eq!(config.retry.message_retries, 5);
        assert_eq!(config.retry.connect_attempts, 3);
    }

    #[test]
    fn test_password_from_environment_value() {
        let text = r#"{ "account": { "username": "me" }, "archive_root": "/a" }"#;
        let config = from_json(Path::new("c.json"), text, Some("from-env".into())).unwrap();
        assert_eq!(config.account.password.as_deref(), Some("from-env"));

        let err = from_json(Path::new("c.json"), text, None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref e) if e == &[ValidationError::MissingPassword]));
    }

    #[test]
    fn test_malformed_json() {
        let err = from_json(Path::new("c.json"), "{ not json", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Cannot parse config file c.json"));
    }

    #[test]
    fn test_unknown_cipher_policy_is_rejected() {
        let text = r#"{
            "account": { "username": "me", "password": "pw" },
            "server": { "cipher_policy": "export" },
            "archive_root": "/a"
        }"#;
        assert!(matches!(
            from_json(Path::new("c.json"), text, None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = from_json(Path::new("c.json"), MINIMAL, None).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("app-password"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_message_lists_problems() {
        let text = r#"{
            "account": { "username": "", "password": "pw" },
            "server": { "port": 0 },
            "archive_root": "/a"
        }"#;
        let err = from_json(Path::new("c.json"), text, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: account.username: Username is required; \
             server.port: Server port must be 1-65535"
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/mailsweep/config.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
