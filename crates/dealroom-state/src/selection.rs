//! # Selection Store
//!
//! Each party records an option, a priority and a flexibility per clause,
//! and then submits. Submission is a one-way gate: once a party is
//! SUBMITTED no selection of theirs may change.

use dealroom_core::{ClauseId, Flexibility, OptionId, PartyRole, Priority, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::AuditAction;
use crate::error::{NegotiationError, NegotiationResult};
use crate::model::Selection;
use crate::room::{Acting, DealRoom};
use crate::status::{ClauseStatus, DealStatus, PartyStatus};

/// One selection to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionInput {
    pub clause_id: ClauseId,
    pub option_id: OptionId,
    pub priority: Priority,
    pub flexibility: Flexibility,
}

/// Result of submitting a party's selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub both_submitted: bool,
    /// Clauses agreed on submission because both parties chose the same
    /// option and nothing else remained to negotiate.
    pub agreed_on_submit: usize,
}

impl DealRoom {
    /// Save or replace the acting party's selection for one clause.
    pub fn submit_selection(
        &mut self,
        actor: UserId,
        input: SelectionInput,
    ) -> NegotiationResult<Selection> {
        let acting = self.acting(actor)?;
        self.require_selectable(acting)?;
        let selection = self.upsert_selection(acting, &input)?;
        self.emit(
            Some(acting),
            AuditAction::SelectionSaved,
            json!({
                "clause_id": input.clause_id,
                "option_id": input.option_id,
                "priority": input.priority,
                "flexibility": input.flexibility,
            }),
        );
        Ok(selection)
    }

    /// Save several selections at once. Every entry is validated before any
    /// is written; one invalid entry rejects the whole batch.
    pub fn bulk_save_selections(
        &mut self,
        actor: UserId,
        inputs: &[SelectionInput],
    ) -> NegotiationResult<usize> {
        let acting = self.acting(actor)?;
        self.require_selectable(acting)?;
        if inputs.is_empty() {
            return Err(NegotiationError::bad_request("no selections supplied"));
        }
        for input in inputs {
            self.validate_selection(input)?;
        }
        for input in inputs {
            self.upsert_selection(acting, input)?;
        }
        self.emit(
            Some(acting),
            AuditAction::SelectionsSaved,
            json!({ "count": inputs.len() }),
        );
        Ok(inputs.len())
    }

    /// Submit the acting party's selections. Fails if any clause lacks one.
    pub fn submit_all(&mut self, actor: UserId) -> NegotiationResult<SubmitOutcome> {
        let acting = self.acting(actor)?;
        self.require_selectable(acting)?;

        let missing: Vec<&str> = self
            .clauses
            .iter()
            .filter(|c| self.selection_for(c.id, acting.role).is_none())
            .map(|c| c.title.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(NegotiationError::bad_request(format!(
                "missing selections for {} clause(s): {}",
                missing.len(),
                missing.join(", ")
            )));
        }

        self.set_party_status(acting.role, PartyStatus::Submitted)?;
        self.party_mut(acting.role)?.submitted_at = Some(Timestamp::now());
        self.emit(Some(acting), AuditAction::SelectionsSubmitted, json!({}));

        let both_submitted = PartyRole::BOTH.iter().all(|r| {
            self.party(*r)
                .is_some_and(|p| p.status != PartyStatus::Pending)
        });
        let mut agreed_on_submit = 0;
        if both_submitted && self.all_choices_identical() {
            agreed_on_submit = self.agree_identical_choices()?;
        }
        Ok(SubmitOutcome {
            both_submitted,
            agreed_on_submit,
        })
    }

    /// The selection of one party for one clause.
    pub fn selection_for(&self, clause_id: ClauseId, role: PartyRole) -> Option<&Selection> {
        let party_id = self.party(role)?.id;
        self.selections
            .iter()
            .find(|s| s.clause_id == clause_id && s.party_id == party_id)
    }

    fn require_selectable(&self, acting: Acting) -> NegotiationResult<()> {
        if !matches!(
            self.deal.status,
            DealStatus::Draft | DealStatus::AwaitingResponse
        ) {
            return Err(NegotiationError::bad_request(format!(
                "selections cannot be changed while the deal is {}",
                self.deal.status
            )));
        }
        let party = self.require_party(acting.role)?;
        if party.status != PartyStatus::Pending {
            return Err(NegotiationError::bad_request(
                "you have already submitted your selections",
            ));
        }
        Ok(())
    }

    fn require_party(&self, role: PartyRole) -> NegotiationResult<&crate::model::Party> {
        self.party(role)
            .ok_or_else(|| NegotiationError::not_found("party for deal", self.deal.id))
    }

    fn validate_selection(&self, input: &SelectionInput) -> NegotiationResult<()> {
        let clause = self.clause(input.clause_id)?;
        if clause.option(&input.option_id).is_none() {
            return Err(NegotiationError::bad_request(format!(
                "option {} is not valid for clause {}",
                input.option_id, clause.title
            )));
        }
        Ok(())
    }

    fn upsert_selection(
        &mut self,
        acting: Acting,
        input: &SelectionInput,
    ) -> NegotiationResult<Selection> {
        self.validate_selection(input)?;
        let selection = Selection {
            clause_id: input.clause_id,
            party_id: acting.party_id,
            option_id: input.option_id.clone(),
            priority: input.priority,
            flexibility: input.flexibility,
            updated_at: Timestamp::now(),
        };
        match self
            .selections
            .iter_mut()
            .find(|s| s.clause_id == input.clause_id && s.party_id == acting.party_id)
        {
            Some(existing) => *existing = selection.clone(),
            None => self.selections.push(selection.clone()),
        }
        Ok(selection)
    }

    fn all_choices_identical(&self) -> bool {
        self.clauses.iter().all(|c| {
            match (
                self.selection_for(c.id, PartyRole::Initiator),
                self.selection_for(c.id, PartyRole::Respondent),
            ) {
                (Some(a), Some(b)) => a.option_id == b.option_id,
                _ => false,
            }
        })
    }

    /// Agree every clause outright and move the deal through NEGOTIATING to
    /// AGREED. Only called when both parties chose identically everywhere.
    fn agree_identical_choices(&mut self) -> NegotiationResult<usize> {
        self.transition(DealStatus::Negotiating, "both parties submitted identical selections")?;
        let mut agreed = 0;
        for index in 0..self.clauses.len() {
            if self.clauses[index].status == ClauseStatus::Agreed {
                continue;
            }
            let clause_id = self.clauses[index].id;
            let option = self
                .selection_for(clause_id, PartyRole::Initiator)
                .map(|s| s.option_id.clone())
                .ok_or_else(|| NegotiationError::not_found("selection for clause", clause_id))?;
            self.agree_clause(index, option)?;
            agreed += 1;
        }
        self.reconcile()?;
        Ok(agreed)
    }
}
