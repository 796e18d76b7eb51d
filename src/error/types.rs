//! Error types for OTP validation.

use thiserror::Error;

/// Main error type for the validator.
///
/// Only failures that prevent a verdict from being determined are errors.
/// An OTP the servers reject is a `false` verdict, not an error.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Configuration-related errors.
    #[error("Configuration error: {kind}")]
    Config { kind: ConfigErrorKind },

    /// Caller input errors, raised before any network activity.
    #[error("Input error: {kind}")]
    Input { kind: InputErrorKind },

    /// Signing errors.
    #[error("Authentication error: {kind}")]
    Auth { kind: AuthErrorKind },

    /// Protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// Transport setup errors (never raised for a single unreachable host).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Report serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration error kinds.
#[derive(Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Invalid API key: not valid base64")]
    InvalidApiKey,

    #[error("Client ID cannot be empty")]
    MissingClientId,

    #[error("Invalid host: '{host}'")]
    InvalidHost { host: String },

    #[error("{message}")]
    File { message: String },

    #[error("{message}")]
    Invalid { message: String },
}

/// Input error kinds.
#[derive(Error, Debug)]
pub enum InputErrorKind {
    #[error("Invalid OTP length: {length} (expected 32 to 48 characters)")]
    InvalidOtpLength { length: usize },
}

/// Signing error kinds.
#[derive(Error, Debug)]
pub enum AuthErrorKind {
    #[error("Invalid API key: signing key is empty")]
    InvalidKey,
}

/// Protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl ValidateError {
    pub(crate) fn config(kind: ConfigErrorKind) -> Self {
        Self::Config { kind }
    }

    /// Whether this error is a configuration problem the caller must fix.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Auth { .. })
    }
}

/// Result type alias for validation operations.
pub type ValidateResult<T> = Result<T, ValidateError>;
