//! Error types for multi-policy training.

use thiserror::Error;

/// Result type alias for multi-policy operations.
pub type Result<T> = std::result::Result<T, MultiPolicyError>;

/// Errors that can occur while coordinating a policy pool.
#[derive(Error, Debug)]
pub enum MultiPolicyError {
    /// Invalid or unknown configuration (raised at construction time).
    #[error("invalid config: {0}")]
    Configuration(String),

    /// The operation is undefined in the current state (e.g. empty pool).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A weight, value or reference vector has the wrong number of objectives.
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which vector was being checked.
        context: &'static str,
        /// Number of objectives the coordinator was built for.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// Pool and frontier went out of sync. Not recoverable.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The environment rejected an interaction.
    #[error("environment error: {0}")]
    Environment(String),

    /// Metric sink or config file I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MultiPolicyError {
    /// Shorthand for a [`MultiPolicyError::DimensionMismatch`].
    pub fn dimension(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }
}

/// Fail with [`MultiPolicyError::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn ensure_dim(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MultiPolicyError::dimension(context, expected, actual));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_message() {
        let err = MultiPolicyError::dimension("weight", 2, 3);
        assert_eq!(
            err.to_string(),
            "dimension mismatch for weight: expected 2, got 3"
        );
    }

    #[test]
    fn test_ensure_dim() {
        assert!(ensure_dim("value", 3, 3).is_ok());
        assert!(matches!(
            ensure_dim("value", 3, 2),
            Err(MultiPolicyError::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
    }
}
