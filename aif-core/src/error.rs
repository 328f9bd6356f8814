use std::fmt;
use std::time::Duration;

/// Database error codes reported by persistence collaborators.
///
/// Codes `DB004`..=`DB007` describe constraint and validation problems that a
/// retry cannot fix; the rest are transient from the caller's point of view.
pub mod db_codes {
    pub const CONNECTION: &str = "DB001";
    pub const QUERY: &str = "DB002";
    pub const TRANSACTION_ABORTED: &str = "DB003";
    pub const NOT_FOUND: &str = "DB004";
    pub const UNIQUE_VIOLATION: &str = "DB005";
    pub const FOREIGN_KEY_VIOLATION: &str = "DB006";
    pub const INVALID_INPUT: &str = "DB007";

    /// Codes that must never be retried.
    pub const NON_RETRYABLE: [&str; 4] =
        [NOT_FOUND, UNIQUE_VIOLATION, FOREIGN_KEY_VIOLATION, INVALID_INPUT];
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AifError {
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String, retry_after: Option<Duration> },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },

    #[error("{service} error{}: {message}", status_suffix(.status_code))]
    ExternalService { service: String, status_code: Option<u16>, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{message}")]
    Unknown { message: String },
}

fn status_suffix(status_code: &Option<u16>) -> String {
    status_code.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl AifError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit { message: message.into(), retry_after: None }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database { code: code.into(), message: message.into() }
    }

    pub fn external_service(
        service: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExternalService { service: service.into(), status_code, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown { message: message.into() }
    }

    /// The failure kind tag, without payload.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation { .. } => FailureKind::Validation,
            Self::Authentication { .. } => FailureKind::Authentication,
            Self::RateLimit { .. } => FailureKind::RateLimit,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Database { .. } => FailureKind::Database,
            Self::ExternalService { .. } => FailureKind::ExternalService,
            Self::Network { .. } => FailureKind::Network,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Unknown { .. } => FailureKind::Unknown,
        }
    }

    /// The human-readable message carried by the failure.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::Authentication { message }
            | Self::RateLimit { message, .. }
            | Self::Timeout { message }
            | Self::Database { message, .. }
            | Self::ExternalService { message, .. }
            | Self::Network { message }
            | Self::Unknown { message } => message,
            Self::Cancelled => "operation cancelled",
        }
    }
}

impl From<std::io::Error> for AifError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::TimedOut => Self::timeout(err.to_string()),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => Self::network(err.to_string()),
            _ => Self::unknown(err.to_string()),
        }
    }
}

/// Payload-free tag of an [`AifError`], used for logs and retry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Authentication,
    RateLimit,
    Timeout,
    Database,
    ExternalService,
    Network,
    Cancelled,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Database => "database",
            Self::ExternalService => "external_service",
            Self::Network => "network",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, AifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AifError::database(db_codes::QUERY, "select failed");
        assert_eq!(err.to_string(), "Database error [DB002]: select failed");

        let err = AifError::external_service("anthropic", Some(503), "overloaded");
        assert_eq!(err.to_string(), "anthropic error (HTTP 503): overloaded");

        let err = AifError::external_service("anthropic", None, "bad payload");
        assert_eq!(err.to_string(), "anthropic error: bad payload");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err: AifError = io_err.into();
        assert_eq!(err.kind(), FailureKind::Network);

        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        let err: AifError = io_err.into();
        assert_eq!(err.kind(), FailureKind::Timeout);

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AifError = io_err.into();
        assert_eq!(err.kind(), FailureKind::Unknown);
    }

    #[test]
    fn test_kind_and_message() {
        let err = AifError::rate_limit("slow down");
        assert_eq!(err.kind(), FailureKind::RateLimit);
        assert_eq!(err.kind().to_string(), "rate_limit");
        assert_eq!(err.message(), "slow down");
        assert_eq!(AifError::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_non_retryable_codes() {
        assert!(db_codes::NON_RETRYABLE.contains(&db_codes::UNIQUE_VIOLATION));
        assert!(!db_codes::NON_RETRYABLE.contains(&db_codes::CONNECTION));
    }
}
