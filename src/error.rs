use thiserror::Error;

/// Validation failures raised while building demographic operators.
#[derive(Debug, Error, PartialEq)]
pub enum DemographyError {
    /// A rate vector or matrix did not have one entry per size class.
    #[error("expected {expected} entries, but got {found}")]
    InvalidDimension { expected: usize, found: usize },

    /// A transition matrix column is not a probability distribution.
    #[error("transition matrix column {column} must sum to 1.0 with no negative entries, but sums to {sum}")]
    InvalidTransitionMatrix { column: usize, sum: f64 },
}
