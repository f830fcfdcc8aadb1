//! # Deal Room Aggregate
//!
//! [`DealRoom`] owns every record of one negotiation: the deal, both
//! parties, the clause instances, selections, the append-only round log,
//! suggestions and counter-proposals. All mutations go through it.
//!
//! ## Consistency
//!
//! - Operations are run through [`DealRoom::transact`], which checks the
//!   optional version token, runs the operation on a working copy and
//!   commits only on success. A failed operation leaves the room untouched
//!   and queues no audit records.
//! - Derived statuses (party ACCEPTED, deal AGREED) are never set directly
//!   by an operation. [`DealRoom::reconcile`] re-derives them from clause
//!   state after every clause-level mutation.
//! - The current suggestion of a clause is the entry with the highest round
//!   number, found by query. There is no separate pointer.

use dealroom_catalog::ContractTemplate;
use dealroom_core::{ClauseId, DealId, PartyId, PartyRole, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditRecord};
use crate::error::{NegotiationError, NegotiationResult};
use crate::model::{
    ClauseInstance, CompromiseSuggestion, CounterProposal, Deal, Party, Round, Selection,
    TransitionRecord,
};
use crate::status::{ClauseStatus, DealStatus, PartyStatus};

/// Input for creating a deal room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub title: String,
    /// Falls back to the template's default when absent.
    pub governing_law: Option<String>,
    pub initiator_name: String,
    pub initiator_email: Option<String>,
}

/// The party acting in an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Acting {
    pub user: UserId,
    pub party_id: PartyId,
    pub role: PartyRole,
}

/// Aggregate root for one negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRoom {
    pub(crate) deal: Deal,
    pub(crate) parties: Vec<Party>,
    pub(crate) clauses: Vec<ClauseInstance>,
    pub(crate) selections: Vec<Selection>,
    pub(crate) rounds: Vec<Round>,
    pub(crate) suggestions: Vec<CompromiseSuggestion>,
    pub(crate) counter_proposals: Vec<CounterProposal>,
    pub(crate) transitions: Vec<TransitionRecord>,
    pub(crate) version: u64,
    #[serde(skip)]
    pending_audit: Vec<AuditRecord>,
}

impl DealRoom {
    /// Instantiate a deal from a catalog template. The creator becomes the
    /// initiator. Entitlement is checked by the caller before this runs.
    pub fn create(
        template: &ContractTemplate,
        request: NewDeal,
        creator: UserId,
    ) -> NegotiationResult<Self> {
        if request.title.trim().is_empty() {
            return Err(NegotiationError::bad_request("deal title must not be empty"));
        }
        if request.initiator_name.trim().is_empty() {
            return Err(NegotiationError::bad_request("initiator name must not be empty"));
        }
        template
            .validate()
            .map_err(|e| NegotiationError::BadRequest(e.to_string()))?;

        let now = Timestamp::now();
        let deal = Deal {
            id: DealId::new(),
            contract_type: template.contract_type.clone(),
            template_version: template.version.clone(),
            title: request.title.trim().to_string(),
            governing_law: request
                .governing_law
                .or_else(|| template.default_governing_law.clone()),
            status: DealStatus::Draft,
            current_round_number: 0,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };
        let initiator = Party {
            id: PartyId::new(),
            role: PartyRole::Initiator,
            name: request.initiator_name.trim().to_string(),
            email: request.initiator_email,
            user_id: Some(creator),
            status: PartyStatus::Pending,
            invitation_code: None,
            submitted_at: None,
            signed_at: None,
        };
        let clauses = template
            .clauses
            .iter()
            .enumerate()
            .map(|(position, c)| ClauseInstance {
                id: ClauseId::new(),
                key: c.key.clone(),
                title: c.title.clone(),
                description: c.description.clone(),
                position,
                options: c.options.clone(),
                status: ClauseStatus::Pending,
                agreed_option_id: None,
            })
            .collect::<Vec<_>>();

        let mut room = Self {
            deal,
            parties: vec![initiator],
            clauses,
            selections: Vec::new(),
            rounds: Vec::new(),
            suggestions: Vec::new(),
            counter_proposals: Vec::new(),
            transitions: Vec::new(),
            version: 0,
            pending_audit: Vec::new(),
        };
        let acting = room.acting(creator)?;
        room.emit(
            Some(acting),
            AuditAction::DealRoomCreated,
            json!({
                "contract_type": template.contract_type,
                "template_version": template.version,
                "clause_count": room.clauses.len(),
            }),
        );
        Ok(room)
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn id(&self) -> DealId {
        self.deal.id
    }

    pub fn deal(&self) -> &Deal {
        &self.deal
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn clauses(&self) -> &[ClauseInstance] {
        &self.clauses
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn suggestions(&self) -> &[CompromiseSuggestion] {
        &self.suggestions
    }

    pub fn counter_proposals(&self) -> &[CounterProposal] {
        &self.counter_proposals
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Optimistic concurrency token, incremented once per committed mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn party(&self, role: PartyRole) -> Option<&Party> {
        self.parties.iter().find(|p| p.role == role)
    }

    /// The party linked to `user`.
    pub fn party_for_user(&self, user: UserId) -> NegotiationResult<&Party> {
        self.parties
            .iter()
            .find(|p| p.user_id == Some(user))
            .ok_or_else(|| NegotiationError::Forbidden("you are not a party to this deal".into()))
    }

    /// Whether `user` is linked to either party.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.parties.iter().any(|p| p.user_id == Some(user))
    }

    pub fn clause(&self, id: ClauseId) -> NegotiationResult<&ClauseInstance> {
        self.clauses
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| NegotiationError::not_found("clause", id))
    }

    /// The latest round's suggestion for a clause.
    pub fn current_suggestion(&self, clause_id: ClauseId) -> Option<&CompromiseSuggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.clause_id == clause_id)
            .max_by_key(|s| s.round_number)
    }

    pub fn agreed_count(&self) -> usize {
        self.clauses.iter().filter(|c| c.is_agreed()).count()
    }

    pub fn all_clauses_agreed(&self) -> bool {
        self.clauses.iter().all(ClauseInstance::is_agreed)
    }

    // ── Transactions ───────────────────────────────────────────────────

    /// Reject a stale version token.
    pub fn check_version(&self, expected: Option<u64>) -> NegotiationResult<()> {
        match expected {
            Some(v) if v != self.version => Err(NegotiationError::Conflict(format!(
                "deal version is {}, request expected {v}",
                self.version
            ))),
            _ => Ok(()),
        }
    }

    /// Run `op` atomically: on success the working copy replaces `self` and
    /// the version advances by one; on error nothing changes.
    pub fn transact<T>(
        &mut self,
        expected_version: Option<u64>,
        op: impl FnOnce(&mut DealRoom) -> NegotiationResult<T>,
    ) -> NegotiationResult<T> {
        self.check_version(expected_version)?;
        let mut working = self.clone();
        let out = op(&mut working)?;
        working.version += 1;
        working.deal.updated_at = Timestamp::now();
        *self = working;
        Ok(out)
    }

    /// Drain the audit records queued by committed operations.
    pub fn take_audit(&mut self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.pending_audit)
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Invite the respondent. Initiator only, draft deals only. Returns the
    /// new party; its invitation code is what the respondent must present.
    pub fn invite(
        &mut self,
        actor: UserId,
        respondent_name: &str,
        respondent_email: Option<String>,
    ) -> NegotiationResult<Party> {
        let acting = self.acting(actor)?;
        if acting.role != PartyRole::Initiator {
            return Err(NegotiationError::Forbidden(
                "only the initiator can invite a respondent".into(),
            ));
        }
        if self.deal.status != DealStatus::Draft {
            return Err(NegotiationError::bad_request(
                "invitations can only be sent while the deal is a draft",
            ));
        }
        if self.party(PartyRole::Respondent).is_some() {
            return Err(NegotiationError::bad_request("a respondent has already been invited"));
        }
        if respondent_name.trim().is_empty() {
            return Err(NegotiationError::bad_request("respondent name must not be empty"));
        }

        let party = Party {
            id: PartyId::new(),
            role: PartyRole::Respondent,
            name: respondent_name.trim().to_string(),
            email: respondent_email,
            user_id: None,
            status: PartyStatus::Pending,
            invitation_code: Some(Uuid::new_v4().simple().to_string()),
            submitted_at: None,
            signed_at: None,
        };
        self.parties.push(party.clone());
        self.transition(DealStatus::AwaitingResponse, "respondent invited")?;
        self.emit(
            Some(acting),
            AuditAction::PartyInvited,
            json!({ "respondent_party_id": party.id, "respondent_name": party.name }),
        );
        Ok(party)
    }

    /// Link `actor` to the respondent party by presenting the invitation code.
    pub fn accept_invitation(&mut self, actor: UserId, code: &str) -> NegotiationResult<Party> {
        if self.deal.status.is_terminal() {
            return Err(NegotiationError::bad_request(format!(
                "deal is {} and no longer accepts participants",
                self.deal.status
            )));
        }
        if self
            .party(PartyRole::Initiator)
            .is_some_and(|p| p.user_id == Some(actor))
        {
            return Err(NegotiationError::bad_request(
                "the initiator cannot accept their own invitation",
            ));
        }
        let deal_id = self.deal.id;
        let respondent = self
            .parties
            .iter_mut()
            .find(|p| p.role == PartyRole::Respondent)
            .ok_or_else(|| NegotiationError::not_found("invitation for deal", deal_id))?;
        if respondent.user_id.is_some() {
            return Err(NegotiationError::bad_request("invitation has already been accepted"));
        }
        let valid = respondent
            .invitation_code
            .as_deref()
            .is_some_and(|expected| bool::from(expected.as_bytes().ct_eq(code.as_bytes())));
        if !valid {
            return Err(NegotiationError::bad_request("invalid invitation code"));
        }
        respondent.user_id = Some(actor);
        respondent.invitation_code = None;
        let party = respondent.clone();

        let acting = self.acting(actor)?;
        self.emit(
            Some(acting),
            AuditAction::InvitationAccepted,
            json!({ "party_id": party.id }),
        );
        Ok(party)
    }

    /// Open the signature stage. Requires every clause to be agreed.
    pub fn initiate_signing(&mut self, actor: UserId) -> NegotiationResult<()> {
        let acting = self.acting(actor)?;
        if self.deal.status != DealStatus::Agreed || !self.all_clauses_agreed() {
            return Err(NegotiationError::bad_request(
                "signing requires every clause to be agreed",
            ));
        }
        self.transition(DealStatus::Signing, "signing initiated")?;
        self.emit(Some(acting), AuditAction::SigningInitiated, json!({}));
        Ok(())
    }

    /// Record the acting party's signature. Returns true once both parties
    /// have signed and the deal is complete.
    pub fn record_signature(&mut self, actor: UserId) -> NegotiationResult<bool> {
        let acting = self.acting(actor)?;
        if self.deal.status != DealStatus::Signing {
            return Err(NegotiationError::bad_request(format!(
                "signatures can only be recorded while the deal is SIGNING, it is {}",
                self.deal.status
            )));
        }
        let party = self.party_mut(acting.role)?;
        if party.signed_at.is_some() {
            return Err(NegotiationError::bad_request("you have already signed"));
        }
        party.signed_at = Some(Timestamp::now());
        self.emit(Some(acting), AuditAction::SignatureRecorded, json!({}));

        let both_signed = PartyRole::BOTH
            .iter()
            .all(|r| self.party(*r).is_some_and(|p| p.signed_at.is_some()));
        if both_signed {
            self.transition(DealStatus::Completed, "both parties signed")?;
            self.emit(None, AuditAction::DealCompleted, json!({}));
        }
        Ok(both_signed)
    }

    /// Cancel the deal from any non-terminal state.
    pub fn cancel(&mut self, actor: UserId, reason: Option<String>) -> NegotiationResult<()> {
        let acting = self.acting(actor)?;
        if self.deal.status.is_terminal() {
            return Err(NegotiationError::bad_request(format!(
                "deal is already {}",
                self.deal.status
            )));
        }
        let why = reason.clone().unwrap_or_else(|| "cancelled by party".to_string());
        self.transition(DealStatus::Cancelled, &why)?;
        self.deal.cancel_reason = reason;
        self.emit(Some(acting), AuditAction::DealCancelled, json!({ "reason": why }));
        Ok(())
    }

    // ── Internal helpers ───────────────────────────────────────────────

    pub(crate) fn acting(&self, user: UserId) -> NegotiationResult<Acting> {
        let party = self.party_for_user(user)?;
        Ok(Acting {
            user,
            party_id: party.id,
            role: party.role,
        })
    }

    pub(crate) fn party_mut(&mut self, role: PartyRole) -> NegotiationResult<&mut Party> {
        let deal_id = self.deal.id;
        self.parties
            .iter_mut()
            .find(|p| p.role == role)
            .ok_or_else(|| NegotiationError::not_found("party for deal", deal_id))
    }

    pub(crate) fn clause_index(&self, id: ClauseId) -> NegotiationResult<usize> {
        self.clauses
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| NegotiationError::not_found("clause", id))
    }

    /// Both parties exist and the respondent has joined.
    pub(crate) fn require_both_parties(&self) -> NegotiationResult<()> {
        let joined = self
            .party(PartyRole::Respondent)
            .is_some_and(|p| p.user_id.is_some());
        if self.parties.len() != 2 || !joined {
            return Err(NegotiationError::bad_request(
                "both parties must have joined the deal",
            ));
        }
        Ok(())
    }

    /// Move the deal to `to`, recording the transition.
    pub(crate) fn transition(&mut self, to: DealStatus, reason: &str) -> NegotiationResult<()> {
        let from = self.deal.status;
        if !from.can_transition_to(to) {
            return Err(NegotiationError::bad_request(format!(
                "cannot move deal from {from} to {to}"
            )));
        }
        self.deal.status = to;
        self.transitions.push(TransitionRecord {
            from_status: from,
            to_status: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        tracing::debug!(deal_id = %self.deal.id, %from, %to, reason, "deal transition");
        Ok(())
    }

    /// Move a party forward. Staying in the same state is a no-op.
    pub(crate) fn set_party_status(
        &mut self,
        role: PartyRole,
        to: PartyStatus,
    ) -> NegotiationResult<()> {
        let party = self.party_mut(role)?;
        if party.status == to {
            return Ok(());
        }
        if !party.status.valid_transitions().contains(&to) {
            return Err(NegotiationError::bad_request(format!(
                "{} cannot move from {} to {to}",
                role.label(),
                party.status
            )));
        }
        party.status = to;
        Ok(())
    }

    /// Mark a clause agreed on `option`. Agreement is permanent.
    pub(crate) fn agree_clause(
        &mut self,
        index: usize,
        option: dealroom_core::OptionId,
    ) -> NegotiationResult<()> {
        let clause = &mut self.clauses[index];
        if clause.is_agreed() {
            return Err(NegotiationError::bad_request(format!(
                "clause {} is already agreed",
                clause.title
            )));
        }
        if clause.option(&option).is_none() {
            return Err(NegotiationError::bad_request(format!(
                "option {option} is not valid for clause {}",
                clause.title
            )));
        }
        clause.status = ClauseStatus::Agreed;
        clause.agreed_option_id = Some(option.clone());
        let clause_id = clause.id;
        self.emit(
            None,
            AuditAction::ClauseAgreed,
            json!({ "clause_id": clause_id, "option_id": option }),
        );
        Ok(())
    }

    /// Re-derive party and deal statuses from clause state.
    pub(crate) fn reconcile(&mut self) -> NegotiationResult<()> {
        if !self.all_clauses_agreed() {
            return Ok(());
        }
        for role in PartyRole::BOTH {
            if self.party(role).is_some() {
                self.set_party_status(role, PartyStatus::Accepted)?;
            }
        }
        if self.deal.status == DealStatus::Negotiating {
            self.transition(DealStatus::Agreed, "every clause agreed")?;
            self.emit(
                None,
                AuditAction::DealAgreed,
                json!({ "clause_count": self.clauses.len() }),
            );
        }
        Ok(())
    }

    pub(crate) fn emit(
        &mut self,
        acting: Option<Acting>,
        action: AuditAction,
        detail: serde_json::Value,
    ) {
        tracing::info!(
            deal_id = %self.deal.id,
            actor_role = acting.map(|a| a.role.as_str()).unwrap_or("SYSTEM"),
            action = action.as_str(),
            "deal room action"
        );
        self.pending_audit.push(AuditRecord {
            deal_id: self.deal.id,
            actor: acting.map(|a| a.user),
            actor_role: acting.map(|a| a.role),
            action,
            detail,
            at: Timestamp::now(),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dealroom_catalog::{ClauseCatalog, InMemoryCatalog};

    pub(crate) fn nda() -> ContractTemplate {
        InMemoryCatalog::with_builtin()
            .unwrap()
            .get_template("mutual-nda")
            .unwrap()
    }

    pub(crate) fn new_deal() -> NewDeal {
        NewDeal {
            title: "Project Falcon NDA".into(),
            governing_law: None,
            initiator_name: "Acme Ltd".into(),
            initiator_email: Some("legal@acme.test".into()),
        }
    }

    /// Room with both parties joined. Returns (room, initiator, respondent).
    pub(crate) fn joined_room() -> (DealRoom, UserId, UserId) {
        let alice = UserId::new();
        let bob = UserId::new();
        let mut room = DealRoom::create(&nda(), new_deal(), alice).unwrap();
        let code = room
            .invite(alice, "Globex", None)
            .unwrap()
            .invitation_code
            .unwrap();
        room.accept_invitation(bob, &code).unwrap();
        (room, alice, bob)
    }

    #[test]
    fn create_instantiates_clauses_and_initiator() {
        let alice = UserId::new();
        let mut room = DealRoom::create(&nda(), new_deal(), alice).unwrap();
        assert_eq!(room.deal().status, DealStatus::Draft);
        assert_eq!(room.deal().governing_law.as_deref(), Some("New York"));
        assert_eq!(room.clauses().len(), 4);
        assert!(room.clauses().iter().all(|c| c.status == ClauseStatus::Pending));
        assert_eq!(room.party_for_user(alice).unwrap().role, PartyRole::Initiator);
        assert_eq!(room.version(), 0);
        let audit = room.take_audit();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::DealRoomCreated);
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut req = new_deal();
        req.title = "  ".into();
        assert!(matches!(
            DealRoom::create(&nda(), req, UserId::new()),
            Err(NegotiationError::BadRequest(_))
        ));
    }

    #[test]
    fn only_initiator_invites_and_only_once() {
        let (mut room, alice, bob) = joined_room();
        assert_eq!(room.deal().status, DealStatus::AwaitingResponse);
        assert!(matches!(
            room.invite(bob, "Other", None),
            Err(NegotiationError::Forbidden(_))
        ));
        assert!(matches!(
            room.invite(alice, "Other", None),
            Err(NegotiationError::BadRequest(_))
        ));
    }

    #[test]
    fn stranger_is_forbidden() {
        let (room, _, _) = joined_room();
        assert!(matches!(
            room.party_for_user(UserId::new()),
            Err(NegotiationError::Forbidden(_))
        ));
    }

    #[test]
    fn accept_invitation_checks_code_and_linking() {
        let alice = UserId::new();
        let bob = UserId::new();
        let mut room = DealRoom::create(&nda(), new_deal(), alice).unwrap();
        let code = room.invite(alice, "Globex", None).unwrap().invitation_code.unwrap();

        assert_eq!(
            room.accept_invitation(bob, "wrong"),
            Err(NegotiationError::BadRequest("invalid invitation code".into()))
        );
        assert!(room.accept_invitation(alice, &code).is_err());
        room.accept_invitation(bob, &code).unwrap();
        assert_eq!(
            room.accept_invitation(UserId::new(), &code),
            Err(NegotiationError::BadRequest(
                "invitation has already been accepted".into()
            ))
        );
        let respondent = room.party(PartyRole::Respondent).unwrap();
        assert_eq!(respondent.user_id, Some(bob));
        assert!(respondent.invitation_code.is_none());
    }

    #[test]
    fn transact_rolls_back_on_error() {
        let (mut room, alice, _) = joined_room();
        room.take_audit();
        let before = room.clone();
        let result = room.transact(None, |r| {
            r.cancel(alice, Some("changed plans".into()))?;
            Err::<(), _>(NegotiationError::bad_request("boom"))
        });
        assert!(result.is_err());
        assert_eq!(room, before);
        assert!(room.take_audit().is_empty());
    }

    #[test]
    fn transact_bumps_version_once_and_checks_token() {
        let (mut room, alice, _) = joined_room();
        let v = room.version();
        room.transact(Some(v), |r| r.cancel(alice, None)).unwrap();
        assert_eq!(room.version(), v + 1);
        assert!(matches!(
            room.transact(Some(v), |r| r.cancel(alice, None)),
            Err(NegotiationError::Conflict(_))
        ));
    }

    #[test]
    fn cancel_is_terminal() {
        let (mut room, _, bob) = joined_room();
        room.cancel(bob, Some("walked away".into())).unwrap();
        assert_eq!(room.deal().status, DealStatus::Cancelled);
        assert_eq!(room.deal().cancel_reason.as_deref(), Some("walked away"));
        assert!(room.cancel(bob, None).is_err());
        let last = room.transitions().last().unwrap();
        assert_eq!(last.to_status, DealStatus::Cancelled);
    }

    #[test]
    fn signing_requires_agreement() {
        let (mut room, alice, _) = joined_room();
        assert_eq!(
            room.initiate_signing(alice),
            Err(NegotiationError::BadRequest(
                "signing requires every clause to be agreed".into()
            ))
        );
    }

    #[test]
    fn serde_snapshot_preserves_state_but_not_queue() {
        let (mut room, _, _) = joined_room();
        let json = serde_json::to_string(&room).unwrap();
        let mut restored: DealRoom = serde_json::from_str(&json).unwrap();
        assert!(restored.take_audit().is_empty());
        assert!(!room.take_audit().is_empty());
        assert_eq!(restored.deal(), room.deal());
        assert_eq!(restored.parties(), room.parties());
        assert_eq!(restored.version(), room.version());
        assert_eq!(restored.clauses().len(), room.clauses().len());
    }
}
