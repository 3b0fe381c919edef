//! Configuration validation.

use super::model::Config;

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty.
    EmptyUsername,
    /// No password in the file or the environment.
    MissingPassword,
    /// Server host is empty.
    EmptyHost,
    /// Server port is 0.
    InvalidPort,
    /// Mailbox name is empty.
    EmptyMailbox,
    /// Archive root is empty.
    EmptyArchiveRoot,
    /// Connect attempts is 0.
    NoConnectAttempts,
    /// A timeout is 0.
    ZeroTimeout,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "Username is required",
            Self::MissingPassword => "Password is required (config file or MAILSWEEP_PASSWORD)",
            Self::EmptyHost => "Server host is required",
            Self::InvalidPort => "Server port must be 1-65535",
            Self::EmptyMailbox => "Mailbox name is required",
            Self::EmptyArchiveRoot => "Archive root directory is required",
            Self::NoConnectAttempts => "Connect attempts must be at least 1",
            Self::ZeroTimeout => "Timeouts must be at least 1 second",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "account.username",
            Self::MissingPassword => "account.password",
            Self::EmptyHost => "server.host",
            Self::InvalidPort => "server.port",
            Self::EmptyMailbox => "server.mailbox",
            Self::EmptyArchiveRoot => "archive_root",
            Self::NoConnectAttempts => "retry.connect_attempts",
            Self::ZeroTimeout => "server.io_timeout_secs",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();

    if config.account.username.trim().is_empty() {
        errors.push(ValidationError::EmptyUsername);
    }
    if config.account.password.as_deref().is_none_or(str::is_empty) {
        errors.push(ValidationError::MissingPassword);
    }

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.server.mailbox.trim().is_empty() {
        errors.push(ValidationError::EmptyMailbox);
    }
    if config.server.connect_timeout_secs == 0 || config.server.io_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.archive_root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyArchiveRoot);
    }

    if config.retry.connect_attempts == 0 {
        errors.push(ValidationError::NoConnectAttempts);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
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

    fn valid() -> Config {
        Config::new("me@yahoo.com", "/tmp/archive").with_password_override(Some("secret".into()))
    }

    #[test]
    fn test_validate_complete_config() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = Config::new("  ", "");
        config.server.host = String::new();
        config.server.port = 0;
        config.server.mailbox = String::new();
        config.server.io_timeout_secs = 0;
        config.retry.connect_attempts = 0;

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyUsername,
                ValidationError::MissingPassword,
                ValidationError::EmptyHost,
                ValidationError::InvalidPort,
                ValidationError::EmptyMailbox,
                ValidationError::ZeroTimeout,
                ValidationError::EmptyArchiveRoot,
                ValidationError::NoConnectAttempts,
            ]
        );
    }

    #[test]
    fn test_empty_password_is_missing() {
        let mut config = valid();
        config.account.password = Some(String::new());
        assert_eq!(
            validate(&config).unwrap_err(),
            vec![ValidationError::MissingPassword]
        );
    }

    #[test]
    fn test_display_names_field() {
        assert_eq!(
            ValidationError::InvalidPort.to_string(),
            "server.port: Server port must be 1-65535"
        );
    }
}
