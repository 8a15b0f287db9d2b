//! Error types for Outpost.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Common error type for Outpost.
///
/// Every failure a send or list operation can produce maps to exactly one
/// variant, so callers can distinguish "not sent" from "sent but not
/// recorded" without parsing message text.
#[derive(Error, Debug)]
pub enum OutpostError {
    /// No resolvable identity for the request.
    #[error("unauthorized")]
    Unauthorized,

    /// Missing or malformed request field.
    #[error("validation error on {field}: {message}")]
    Validation {
        /// Name of the offending field ("to", "cc", "bcc", "subject", "body").
        field: String,
        /// Human-readable description.
        message: String,
    },

    /// Send quota exhausted for the current window.
    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimited {
        /// When the current window ends and sending is allowed again.
        reset_at: DateTime<Utc>,
    },

    /// The relay rejected the message or was unreachable.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Record write failed after the relay accepted the message.
    ///
    /// The email was delivered; only the audit record is missing.
    #[error("delivered but not recorded: {0}")]
    Persistence(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unanticipated fault caught at the boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OutpostError {
    /// Message safe to return to the caller.
    ///
    /// Internal and database details are logged by the pipeline and replaced
    /// with a generic message here.
    pub fn public_message(&self) -> String {
        match self {
            OutpostError::Internal(_) | OutpostError::Database(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        OutpostError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for OutpostError {
    fn from(e: sqlx::Error) -> Self {
        OutpostError::Database(e.to_string())
    }
}

/// Result type alias for Outpost operations.
pub type Result<T> = std::result::Result<T, OutpostError>;
