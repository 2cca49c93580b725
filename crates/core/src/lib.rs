//! Shared primitives for all Rust crates in schemabridge.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across schemabridge crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input, configuration or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write was rejected because it raced another writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credentials were rejected by the remote system.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote system could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote system answered with an unexpected status.
    #[error("http error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// A simple metric references a field the target table does not have.
    #[error("no field found for metric '{metric}' in table '{table}'")]
    FieldNotFound {
        /// Metric name.
        metric: String,
        /// Target table name.
        table: String,
    },

    /// A metric formula uses a form the target query language cannot express.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the error concerns a single item (one field, one metric)
    /// rather than the whole run.
    #[must_use]
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::FieldNotFound { .. } | Self::UnsupportedExpression(_)
        )
    }
}
