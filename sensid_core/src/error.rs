// sensid_core/src/error.rs

use thiserror::Error;

/// Every fatal condition an identification run can hit.
///
/// None of these are retried anywhere in the library: the same inputs would
/// reproduce the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentificationError {
    /// The model needs a symbol that neither the fixed nor the free set supplies.
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    /// A name appears in both the fixed and the free set, or twice in the free set.
    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    /// Mismatched matrix/vector shapes. Always a caller defect.
    #[error("dimension mismatch in {context}: expected {expected:?}, got {actual:?}")]
    Dimension {
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The normal equations could not be solved for this iteration.
    #[error(
        "Gram matrix is singular at iteration {iteration} (reciprocal condition {reciprocal_condition:e})"
    )]
    SingularGramMatrix {
        iteration: usize,
        reciprocal_condition: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for all fallible operations in this crate.
pub type IdentificationResult<T> = Result<T, IdentificationError>;

impl IdentificationError {
    /// Convenience constructor for shape mismatches.
    pub fn dimension(
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        IdentificationError::Dimension {
            context,
            expected,
            actual,
        }
    }
}
