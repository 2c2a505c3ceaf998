//! Error types for the course generation orchestrator.
//!
//! Variants are grouped by subsystem. Only [`GenerationError::MalformedResponse`]
//! is recoverable: the control loop replaces the unusable response with the
//! last known-good draft or a deterministic default and keeps going.

use std::path::PathBuf;

use coursegen_olx::OlxError;

/// A specialized `Result` type for orchestrator operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur while generating a course.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your coursegen.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The selected provider needs an API key that is not set.
    #[error("Missing API key: environment variable '{variable}' is not set\n\nSuggestion: Export {variable} or add it to a .env file, or use the 'template' provider")]
    MissingApiKey {
        /// Name of the environment variable.
        variable: String,
    },

    // ========================================================================
    // Content Provider Errors
    // ========================================================================
    /// The content provider call failed outright.
    #[error("Content provider error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    ProviderError {
        /// The kind of failure.
        kind: ProviderErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The provider answered, but not in the expected shape.
    #[error("Malformed response from '{call}': {message}")]
    MalformedResponse {
        /// Which provider call produced the response.
        call: String,
        /// What was wrong with it.
        message: String,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid stage transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current stage.
        from: String,
        /// The attempted target stage.
        to: String,
    },

    // ========================================================================
    // Course Tree and I/O Errors
    // ========================================================================
    /// Building, rendering or exporting the course tree failed.
    #[error(transparent)]
    Olx(#[from] OlxError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of content provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Authentication failure (invalid or expired API key).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues or timeouts.
    Network,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl ProviderErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check your API key",
            Self::RateLimit => "Wait and retry, or reduce maxIterations",
            Self::Server => "Retry later; the model service may be experiencing issues",
            Self::Network => "Check your network connection or raise requestTimeoutSecs",
            Self::Other => "Check the provider's status page and the request settings",
        }
    }
}

impl GenerationError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(variable: impl Into<String>) -> Self {
        Self::MissingApiKey {
            variable: variable.into(),
        }
    }

    /// Creates a new `ProviderError` with automatic suggestion based on kind.
    #[must_use]
    pub fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::ProviderError {
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `MalformedResponse` error.
    #[must_use]
    pub fn malformed(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            call: call.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if the session can continue with a fallback value.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    /// Returns `true` if this error ends the session.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}
