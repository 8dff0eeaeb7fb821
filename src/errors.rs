//! Unified error type for the estimate pricing engine.
//!
//! Every fallible function in the crate returns [`Result`]. Database errors are
//! converted automatically from `SeaORM`'s `DbErr`, serialization errors from
//! `serde_json`. Domain failures carry just enough context to be logged and shown
//! to an operator.

use thiserror::Error;

/// All errors the engine can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file could not be read or parsed, or a configuration value is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Any error reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON encoding or decoding of a persisted snapshot failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure, e.g. reading the settings file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No estimate with this id exists
    #[error("Estimate not found: {id}")]
    EstimateNotFound {
        /// Requested estimate id
        id: i64,
    },

    /// The export cache for this estimate has not been generated yet.
    ///
    /// This is an expected state: the caller should trigger a recompute.
    #[error("Export cache for estimate {estimate_id} does not exist; ask an administrator to recompute it")]
    MissingCache {
        /// Estimate whose cache was requested
        estimate_id: i64,
    },

    /// The estimate graph is structurally invalid (unknown type, dangling references)
    #[error("Invalid estimate: {message}")]
    InvalidEstimate {
        /// Human-readable description
        message: String,
    },

    /// A quantity or price handed to the pricing core is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending value
        amount: f64,
    },
}

impl Error {
    /// Whether this error is the expected "cache not generated yet" state
    /// rather than a fault.
    #[must_use]
    pub const fn is_missing_cache(&self) -> bool {
        matches!(self, Self::MissingCache { .. })
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cache_is_recoverable() {
        let err = Error::MissingCache { estimate_id: 7 };
        assert!(err.is_missing_cache());
        assert!(err.to_string().contains("recompute"));

        let err = Error::EstimateNotFound { id: 7 };
        assert!(!err.is_missing_cache());
    }
}
