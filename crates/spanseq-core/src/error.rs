//! Error types for `spanseq`.
//!
//! A single error enum covers clause construction, optimization and execution.
//! Exhausting the combiner rules is not an error: the optimizer simply stops.

use thiserror::Error;

/// Result type alias for `spanseq` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, optimizing or executing span queries.
///
/// Error codes follow the pattern `SPQ-XXX`.
#[derive(Error, Debug)]
pub enum Error {
    /// Repetition or expansion bounds with `min > max` (SPQ-001).
    #[error("[SPQ-001] Invalid bounds: min {min} is greater than max {max}")]
    InvalidBounds {
        /// Requested minimum.
        min: u32,
        /// Requested maximum.
        max: u32,
    },

    /// Clause tree that cannot be executed as given (SPQ-002).
    #[error("[SPQ-002] Invalid clause: {0}")]
    InvalidClause(String),

    /// Field (annotation) not present in the index (SPQ-003).
    #[error("[SPQ-003] Field '{0}' not found")]
    UnknownField(String),

    /// Index collaborator failure (SPQ-004).
    #[error("[SPQ-004] Index error: {0}")]
    Index(String),

    /// IO error (SPQ-005).
    #[error("[SPQ-005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (SPQ-006).
    #[error("[SPQ-006] Configuration error: {0}")]
    Config(String),

    /// Serialization error (SPQ-007).
    #[error("[SPQ-007] Serialization error: {0}")]
    Serialization(String),

    /// Search cancelled or past its deadline (SPQ-008).
    #[error("[SPQ-008] Search cancelled: {0}")]
    Cancelled(String),

    /// Internal contract violation (SPQ-009).
    ///
    /// Raised for example when a combiner is asked to combine a pair it
    /// rejected, or when a join is built over wrongly ordered streams.
    #[error("[SPQ-009] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "SPQ-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidBounds { .. } => "SPQ-001",
            Self::InvalidClause(_) => "SPQ-002",
            Self::UnknownField(_) => "SPQ-003",
            Self::Index(_) => "SPQ-004",
            Self::Io(_) => "SPQ-005",
            Self::Config(_) => "SPQ-006",
            Self::Serialization(_) => "SPQ-007",
            Self::Cancelled(_) => "SPQ-008",
            Self::Internal(_) => "SPQ-009",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Contract violations are never recoverable: the query plan itself is wrong.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
