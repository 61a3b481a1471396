//! Error types for brevity.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias using brevity's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// User-facing message for failures of the record store or identity provider.
pub const UPSTREAM_USER_MESSAGE: &str =
    "The service is temporarily unavailable. Please try again later.";

/// User-facing message for a summary stream that ended abnormally.
pub const STREAM_INTERRUPTED_USER_MESSAGE: &str =
    "Failed to generate summary. Please try again later.";

/// Core error type for brevity operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input failed schema validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No valid caller session
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Resource absent or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator (identity provider, completion model) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The completion stream ended abnormally mid-fragment
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-visible category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    Upstream,
    StreamInterrupted,
    Internal,
}

impl Error {
    /// Shorthand for a not-found error on a note.
    ///
    /// The message never says whether the note exists for another owner.
    pub fn note_not_found() -> Self {
        Error::NotFound("Note not found".to_string())
    }

    /// No session, or an unknown or expired one.
    pub fn not_authenticated() -> Self {
        Error::Unauthenticated("Not authenticated".to_string())
    }

    /// Sign-in rejected. Identical for unknown emails and wrong passwords.
    pub fn invalid_credentials() -> Self {
        Error::Unauthenticated("Invalid login credentials".to_string())
    }

    /// Sign-up with an email that already has an account.
    pub fn duplicate_email() -> Self {
        Error::invalid_field("email", "An account with this email already exists")
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Error::Validation(ValidationErrors::single(field, message))
    }

    /// Category used by the presentation layer to pick a status and message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Unauthenticated(_) => ErrorKind::Authentication,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Upstream(_) | Error::Database(_) => ErrorKind::Upstream,
            Error::StreamInterrupted(_) => ErrorKind::StreamInterrupted,
            Error::Serialization(_) | Error::Config(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to show to an end user.
    ///
    /// Collaborator error text is never included; it belongs in logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errors) => errors.first_message().to_string(),
            Error::Unauthenticated(msg) | Error::NotFound(msg) => msg.clone(),
            Error::Upstream(_) | Error::Database(_) => UPSTREAM_USER_MESSAGE.to_string(),
            Error::StreamInterrupted(_) => STREAM_INTERRUPTED_USER_MESSAGE.to_string(),
            Error::Serialization(_) | Error::Config(_) | Error::Internal(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Error::Validation(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}
