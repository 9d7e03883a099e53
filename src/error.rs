//! Error types for the augmentation engine

use thiserror::Error;

/// Result type for augmentation operations
pub type AssistResult<T> = Result<T, AssistError>;

/// Everything that can go wrong while injecting the control or generating a reply
#[derive(Error, Debug, Clone)]
pub enum AssistError {
    #[error("No toolbar anchor matched any of: {candidates}")]
    AnchorNotFound { candidates: String },

    #[error("Edit surface not found using pattern: {pattern}")]
    SurfaceNotFound { pattern: String },

    #[error("Network error: {message}")]
    NetworkFailure { message: String },

    #[error("Generation endpoint returned status: {status}")]
    HttpStatus { status: u16 },

    #[error("Generation request timed out after {timeout:?}")]
    Timeout { timeout: std::time::Duration },

    #[error("Invalid candidate pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("A reply is already being generated")]
    AlreadyGenerating,

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl AssistError {
    /// Create an anchor-not-found error from the patterns that were tried
    pub fn anchor_not_found<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = candidates
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        AssistError::AnchorNotFound { candidates }
    }

    /// Create a surface-not-found error
    pub fn surface_not_found(pattern: impl Into<String>) -> Self {
        AssistError::SurfaceNotFound {
            pattern: pattern.into(),
        }
    }

    /// Create a network error
    pub fn network_failure(message: impl Into<String>) -> Self {
        AssistError::NetworkFailure {
            message: message.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        AssistError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        AssistError::Configuration {
            message: message.into(),
        }
    }

    /// True for every failure of the outbound generation request itself
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            AssistError::NetworkFailure { .. }
                | AssistError::HttpStatus { .. }
                | AssistError::Timeout { .. }
        )
    }

    /// True for host-structure misses that are silently retried
    pub fn is_transient_host_state(&self) -> bool {
        matches!(self, AssistError::AnchorNotFound { .. })
    }
}

impl From<std::io::Error> for AssistError {
    fn from(err: std::io::Error) -> Self {
        AssistError::Io {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AssistError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            AssistError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            AssistError::network_failure(err.to_string())
        }
    }
}

impl From<toml::de::Error> for AssistError {
    fn from(err: toml::de::Error) -> Self {
        AssistError::config_error(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for AssistError {
    fn from(err: toml::ser::Error) -> Self {
        AssistError::config_error(format!("TOML serialization error: {}", err))
    }
}
