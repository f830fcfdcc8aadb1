//! # Deal Room Entities
//!
//! Plain records held by the [`DealRoom`](crate::DealRoom) aggregate. They
//! carry no behavior beyond small accessors; every mutation goes through
//! the aggregate so derived statuses stay consistent.

use dealroom_catalog::ClauseOption;
use dealroom_core::{
    ClauseId, ClauseKey, DealId, Flexibility, OptionId, PartyId, PartyRole, Priority, ProposalId,
    RoundId, Satisfaction, SuggestionId, Timestamp, UserId,
};
use dealroom_negotiation::Strategy;
use serde::{Deserialize, Serialize};

use crate::status::{ClauseStatus, DealStatus, PartyStatus, ProposalStatus, RoundStatus};

/// One negotiation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub contract_type: String,
    pub template_version: String,
    pub title: String,
    pub governing_law: Option<String>,
    pub status: DealStatus,
    /// Number of the latest round, 0 before the first one.
    pub current_round_number: u32,
    pub cancel_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One negotiating side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub role: PartyRole,
    pub name: String,
    pub email: Option<String>,
    /// Linked on creation (initiator) or on invitation acceptance.
    pub user_id: Option<UserId>,
    pub status: PartyStatus,
    /// Single-use code, cleared once accepted.
    pub invitation_code: Option<String>,
    pub submitted_at: Option<Timestamp>,
    pub signed_at: Option<Timestamp>,
}

/// A clause instantiated from the catalog for one deal. Options are copied
/// at creation and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseInstance {
    pub id: ClauseId,
    pub key: ClauseKey,
    pub title: String,
    pub description: String,
    pub position: usize,
    pub options: Vec<ClauseOption>,
    pub status: ClauseStatus,
    /// Set if and only if `status` is `AGREED`.
    pub agreed_option_id: Option<OptionId>,
}

impl ClauseInstance {
    pub fn option(&self, id: &OptionId) -> Option<&ClauseOption> {
        self.options.iter().find(|o| &o.id == id)
    }

    pub fn is_agreed(&self) -> bool {
        self.status == ClauseStatus::Agreed
    }
}

/// One party's choice for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub clause_id: ClauseId,
    pub party_id: PartyId,
    pub option_id: OptionId,
    pub priority: Priority,
    pub flexibility: Flexibility,
    pub updated_at: Timestamp,
}

/// How a round came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundKind {
    Generated,
    Regenerated,
}

/// One negotiation iteration. Rounds are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub round_number: u32,
    pub initiating_party_role: PartyRole,
    pub kind: RoundKind,
    pub status: RoundStatus,
    /// Suggestions whose option the fairness pass changed.
    pub fairness_adjustments: usize,
    pub created_at: Timestamp,
}

/// One round's proposal for one clause, plus both parties' responses.
///
/// Each acceptance slot is written only by its own party: unset, accepted
/// or rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompromiseSuggestion {
    pub id: SuggestionId,
    pub round_id: RoundId,
    pub round_number: u32,
    pub clause_id: ClauseId,
    pub suggested_option_id: OptionId,
    pub satisfaction_a: Satisfaction,
    pub satisfaction_b: Satisfaction,
    pub reasoning: String,
    /// `None` when both parties already chose the same option.
    pub strategy: Option<Strategy>,
    pub fairness_adjusted: bool,
    pub party_a_accepted: Option<bool>,
    pub party_b_accepted: Option<bool>,
    pub created_at: Timestamp,
}

impl CompromiseSuggestion {
    pub fn acceptance(&self, role: PartyRole) -> Option<bool> {
        match role {
            PartyRole::Initiator => self.party_a_accepted,
            PartyRole::Respondent => self.party_b_accepted,
        }
    }

    pub(crate) fn set_acceptance(&mut self, role: PartyRole, accepted: bool) {
        match role {
            PartyRole::Initiator => self.party_a_accepted = Some(accepted),
            PartyRole::Respondent => self.party_b_accepted = Some(accepted),
        }
    }

    pub fn both_accepted(&self) -> bool {
        self.party_a_accepted == Some(true) && self.party_b_accepted == Some(true)
    }

    pub fn satisfaction(&self, role: PartyRole) -> Satisfaction {
        match role {
            PartyRole::Initiator => self.satisfaction_a,
            PartyRole::Respondent => self.satisfaction_b,
        }
    }
}

/// A party's alternative to a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterProposal {
    pub id: ProposalId,
    pub round_id: RoundId,
    pub round_number: u32,
    pub clause_id: ClauseId,
    pub suggestion_id: SuggestionId,
    pub proposing_party_id: PartyId,
    pub proposing_role: PartyRole,
    pub proposed_option_id: OptionId,
    pub rationale: Option<String>,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// A recorded deal status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_status: DealStatus,
    pub to_status: DealStatus,
    pub timestamp: Timestamp,
    pub reason: String,
}
