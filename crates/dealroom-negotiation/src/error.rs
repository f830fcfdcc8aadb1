//! Errors raised by the compromise algorithms.

use dealroom_core::{ClauseId, OptionId};
use thiserror::Error;

/// The algorithm was asked to reason about something the clause does not
/// offer. Nothing is suggested when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompromiseError {
    /// The clause has no options at all.
    #[error("clause {clause_id} offers no options")]
    NoOptions { clause_id: ClauseId },

    /// A selection or counter-proposal references an option outside the clause.
    #[error("option {option_id} is not valid for clause {clause_id}")]
    UnknownOption {
        clause_id: ClauseId,
        option_id: OptionId,
    },
}
