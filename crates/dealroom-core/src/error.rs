//! # Validation Errors
//!
//! Errors raised when constructing domain primitives from untrusted input.
//! All errors use `thiserror` for derive-based `Display` and `Error`.

use thiserror::Error;

/// A domain primitive rejected its input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Priority outside 1..=5.
    #[error("priority must be between 1 and 5, got {0}")]
    PriorityOutOfRange(i64),

    /// Flexibility outside 1..=5.
    #[error("flexibility must be between 1 and 5, got {0}")]
    FlexibilityOutOfRange(i64),

    /// Bias outside −1..=1 or not finite.
    #[error("bias must be a finite value between -1 and 1, got {0}")]
    BiasOutOfRange(f64),

    /// Satisfaction outside 0..=100.
    #[error("satisfaction must be between 0 and 100, got {0}")]
    SatisfactionOutOfRange(i64),

    /// A string identifier failed format validation.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidIdentifier {
        /// Which identifier type was being built.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
