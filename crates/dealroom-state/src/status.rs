//! # Lifecycle States
//!
//! Five entity types move through their own state machines. Each state
//! enum exposes the same surface: `as_str()` for the canonical wire name,
//! `is_terminal()`, and `valid_transitions()` listing legal targets.
//!
//! ## Deal
//!
//! ```text
//! DRAFT ──invite──▶ AWAITING_RESPONSE ──generate──▶ NEGOTIATING ──all agreed──▶ AGREED
//!                                                                                 │
//!                              COMPLETED ◀──both signed── SIGNING ◀──initiate─────┘
//!
//! any non-terminal state ──cancel──▶ CANCELLED
//! ```
//!
//! ## Party
//!
//! `PENDING → SUBMITTED → REVIEWING → ACCEPTED`, with `SUBMITTED → ACCEPTED`
//! when every clause is agreed without a round.
//!
//! ## Clause
//!
//! `PENDING → SUGGESTED → AGREED`, or `PENDING → AGREED` when both parties
//! picked the same option. `AGREED` is terminal.
//!
//! ## Round
//!
//! Only `PENDING_RESPONSE` exists. A round is superseded implicitly by the
//! next one.
//!
//! ## Counter-proposal
//!
//! `PENDING → ACCEPTED | REJECTED | SUPERSEDED`.

use serde::{Deserialize, Serialize};

macro_rules! display_as_str {
    ($($name:ident),*) => {
        $(
            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

/// Lifecycle state of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    /// Created by the initiator; respondent not yet invited.
    Draft,
    /// Invitation sent; waiting for selections.
    AwaitingResponse,
    /// At least one round has been generated.
    Negotiating,
    /// Every clause is agreed.
    Agreed,
    /// Signatures are being collected.
    Signing,
    /// Both parties signed. Terminal.
    Completed,
    /// Abandoned by either party. Terminal.
    Cancelled,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::AwaitingResponse => "AWAITING_RESPONSE",
            Self::Negotiating => "NEGOTIATING",
            Self::Agreed => "AGREED",
            Self::Signing => "SIGNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn valid_transitions(&self) -> &'static [DealStatus] {
        match self {
            Self::Draft => &[Self::AwaitingResponse, Self::Cancelled],
            Self::AwaitingResponse => &[Self::Negotiating, Self::Cancelled],
            Self::Negotiating => &[Self::Agreed, Self::Cancelled],
            Self::Agreed => &[Self::Signing, Self::Cancelled],
            Self::Signing => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: DealStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

/// Lifecycle state of one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    /// Still selecting. The only state in which selections may be written.
    Pending,
    /// Every clause selected and submitted.
    Submitted,
    /// A round has been generated for the party to review.
    Reviewing,
    /// Every clause is agreed.
    Accepted,
}

impl PartyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Reviewing => "REVIEWING",
            Self::Accepted => "ACCEPTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn valid_transitions(&self) -> &'static [PartyStatus] {
        match self {
            Self::Pending => &[Self::Submitted],
            Self::Submitted => &[Self::Reviewing, Self::Accepted],
            Self::Reviewing => &[Self::Accepted],
            Self::Accepted => &[],
        }
    }
}

/// Negotiation state of one clause within a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClauseStatus {
    Pending,
    Suggested,
    /// Terminal. `agreed_option_id` is set.
    Agreed,
}

impl ClauseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Suggested => "SUGGESTED",
            Self::Agreed => "AGREED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Agreed)
    }

    pub fn valid_transitions(&self) -> &'static [ClauseStatus] {
        match self {
            Self::Pending => &[Self::Suggested, Self::Agreed],
            Self::Suggested => &[Self::Agreed],
            Self::Agreed => &[],
        }
    }
}

/// State of a negotiation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    PendingResponse,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingResponse => "PENDING_RESPONSE",
        }
    }
}

/// Resolution state of a counter-proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    /// Replaced by a newer round or a newer proposal from the same party.
    Superseded,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Superseded => "SUPERSEDED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn valid_transitions(&self) -> &'static [ProposalStatus] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Rejected, Self::Superseded],
            _ => &[],
        }
    }
}

display_as_str!(DealStatus, PartyStatus, ClauseStatus, RoundStatus, ProposalStatus);
