//! Error types for the statistics layer.
//!
//! Three outcomes are kept apart: an empty result (not an error at all),
//! a rejected scope, and a failure of the data source underneath.

use thiserror::Error;

/// Failure reported by a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend could not be reached.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured deadline.
    #[error("query timed out after {0}s")]
    Timeout(u64),

    /// The backend answered but the query failed.
    #[error("query execution failed: {0}")]
    Execution(String),

    /// A query referenced a parameter that was not supplied.
    #[error("missing query parameter ${0}")]
    MissingParameter(String),
}

/// Error returned by the statistics operations.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Scope parameters were missing or invalid; no query was run.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A returned record did not have the expected shape.
    #[error("malformed record from query '{query}': {detail}")]
    MalformedRecord { query: String, detail: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl StatsError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StatsError::Source(SourceError::Unavailable(_)) | StatsError::Source(SourceError::Timeout(_))
        )
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, StatsError::InvalidScope(_))
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
