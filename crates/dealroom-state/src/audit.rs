//! # Audit Actions
//!
//! Every committed operation on a deal room produces one or more
//! [`AuditRecord`]s. The aggregate only queues them; the host drains the
//! queue after a successful commit and hands the records to its audit sink,
//! so a failed operation never emits anything.

use dealroom_core::{DealId, PartyRole, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Name of a state-changing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    DealRoomCreated,
    PartyInvited,
    InvitationAccepted,
    SelectionSaved,
    SelectionsSaved,
    SelectionsSubmitted,
    CompromiseGenerated,
    CompromiseAccepted,
    CompromiseRejected,
    ClauseAgreed,
    CounterProposalSubmitted,
    CounterProposalAccepted,
    CounterProposalRejected,
    CompromiseRegenerated,
    DealAgreed,
    SigningInitiated,
    SignatureRecorded,
    DealCompleted,
    DealCancelled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DealRoomCreated => "DEAL_ROOM_CREATED",
            Self::PartyInvited => "PARTY_INVITED",
            Self::InvitationAccepted => "INVITATION_ACCEPTED",
            Self::SelectionSaved => "SELECTION_SAVED",
            Self::SelectionsSaved => "SELECTIONS_SAVED",
            Self::SelectionsSubmitted => "SELECTIONS_SUBMITTED",
            Self::CompromiseGenerated => "COMPROMISE_GENERATED",
            Self::CompromiseAccepted => "COMPROMISE_ACCEPTED",
            Self::CompromiseRejected => "COMPROMISE_REJECTED",
            Self::ClauseAgreed => "CLAUSE_AGREED",
            Self::CounterProposalSubmitted => "COUNTER_PROPOSAL_SUBMITTED",
            Self::CounterProposalAccepted => "COUNTER_PROPOSAL_ACCEPTED",
            Self::CounterProposalRejected => "COUNTER_PROPOSAL_REJECTED",
            Self::CompromiseRegenerated => "COMPROMISE_REGENERATED",
            Self::DealAgreed => "DEAL_AGREED",
            Self::SigningInitiated => "SIGNING_INITIATED",
            Self::SignatureRecorded => "SIGNATURE_RECORDED",
            Self::DealCompleted => "DEAL_COMPLETED",
            Self::DealCancelled => "DEAL_CANCELLED",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub deal_id: DealId,
    /// User who triggered the action. `None` for derived actions.
    pub actor: Option<UserId>,
    pub actor_role: Option<PartyRole>,
    pub action: AuditAction,
    pub detail: serde_json::Value,
    pub at: Timestamp,
}
