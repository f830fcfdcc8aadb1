//! Errors raised by deal room operations.
//!
//! Every error is synchronous and local to one operation. An operation that
//! returns an error has changed nothing.

use dealroom_negotiation::CompromiseError;
use thiserror::Error;

/// Why a deal room operation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// A deal, clause, round, suggestion or proposal does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The actor is not a party to the deal, lacks the role the operation
    /// needs, or is not entitled.
    #[error("{0}")]
    Forbidden(String),

    /// A precondition is violated. The message is shown to the caller as is.
    #[error("{0}")]
    BadRequest(String),

    /// The caller acted on stale state (version token or round number).
    #[error("{0}")]
    Conflict(String),
}

impl NegotiationError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<CompromiseError> for NegotiationError {
    fn from(err: CompromiseError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Result type alias for deal room operations.
pub type NegotiationResult<T> = Result<T, NegotiationError>;
