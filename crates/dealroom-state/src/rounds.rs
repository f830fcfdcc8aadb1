//! # Round Management
//!
//! Generation and regeneration of rounds, per-party responses to
//! suggestions, and the counter-proposal loop.
//!
//! ## Stale suggestions
//!
//! `respond` and `counter_propose` accept the round number the caller was
//! looking at. If a newer round has replaced that clause's suggestion in
//! the meantime the call is rejected with `Conflict` instead of writing to
//! a suggestion the caller never saw.

use std::collections::HashMap;

use dealroom_core::{
    ClauseId, OptionId, PartyRole, Priority, ProposalId, RoundId, Satisfaction, SuggestionId,
    Timestamp, UserId,
};
use dealroom_negotiation::{
    plan_round, ClauseInput, CounterCandidate, FairnessRebalancer, PartyChoice,
    SAME_CHOICE_REASONING,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::AuditAction;
use crate::error::{NegotiationError, NegotiationResult};
use crate::model::{CompromiseSuggestion, CounterProposal, Round, RoundKind};
use crate::room::{Acting, DealRoom};
use crate::status::{ClauseStatus, DealStatus, PartyStatus, ProposalStatus, RoundStatus};

/// Result of generating or regenerating a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_number: u32,
    pub suggestions: Vec<CompromiseSuggestion>,
    /// Clauses agreed outright because both parties chose the same option.
    pub agreed_clause_ids: Vec<ClauseId>,
    /// Clauses whose pending counter-proposal shaped the new suggestion.
    pub counters_applied: Vec<ClauseId>,
    pub fairness_adjustments: usize,
}

impl RoundOutcome {
    pub fn suggestion_count(&self) -> usize {
        self.suggestions.len()
    }
}

/// Result of answering a counter-proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResponse {
    pub accepted: bool,
    pub all_agreed: bool,
}

/// Input for filing a counter-proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterProposalInput {
    pub clause_id: ClauseId,
    pub option_id: OptionId,
    pub rationale: Option<String>,
    /// Replaces the proposer's priority for this clause when present.
    pub priority: Option<Priority>,
    /// Round the caller is responding to.
    pub round_number: Option<u32>,
}

impl DealRoom {
    /// Generate a round for every clause not yet agreed. Both parties must
    /// have submitted. Resets both parties to REVIEWING.
    pub fn generate(
        &mut self,
        actor: UserId,
        rebalancer: &FairnessRebalancer,
    ) -> NegotiationResult<RoundOutcome> {
        let acting = self.acting(actor)?;
        if !matches!(
            self.deal.status,
            DealStatus::AwaitingResponse | DealStatus::Negotiating
        ) {
            return Err(NegotiationError::bad_request(format!(
                "a round cannot be generated while the deal is {}",
                self.deal.status
            )));
        }
        self.require_both_parties()?;
        if self
            .parties
            .iter()
            .any(|p| p.status == PartyStatus::Pending)
        {
            return Err(NegotiationError::bad_request(
                "both parties must submit their selections before a compromise can be generated",
            ));
        }
        self.require_open_clauses()?;

        self.supersede_pending_proposals();
        let outcome = self.run_round(acting, RoundKind::Generated, HashMap::new(), rebalancer)?;

        if self.deal.status == DealStatus::AwaitingResponse {
            self.transition(DealStatus::Negotiating, "first round generated")?;
        }
        for role in PartyRole::BOTH {
            self.set_party_status(role, PartyStatus::Reviewing)?;
        }
        self.reconcile()?;

        self.emit(
            Some(acting),
            AuditAction::CompromiseGenerated,
            json!({
                "round_number": outcome.round_number,
                "suggestion_count": outcome.suggestion_count(),
                "agreed_clause_count": outcome.agreed_clause_ids.len(),
                "fairness_adjustments": outcome.fairness_adjustments,
            }),
        );
        Ok(outcome)
    }

    /// Record the acting party's accept or reject on the clause's current
    /// suggestion. The clause is agreed once both parties accept.
    pub fn respond(
        &mut self,
        actor: UserId,
        clause_id: ClauseId,
        accept: bool,
        round_number: Option<u32>,
    ) -> NegotiationResult<CompromiseSuggestion> {
        let acting = self.acting(actor)?;
        let index = self.clause_index(clause_id)?;
        if self.clauses[index].is_agreed() {
            return Err(NegotiationError::bad_request(format!(
                "clause {} is already agreed",
                self.clauses[index].title
            )));
        }
        let s_index = self.current_suggestion_index(clause_id, round_number)?;
        self.require_negotiating()?;

        let suggestion = &mut self.suggestions[s_index];
        suggestion.set_acceptance(acting.role, accept);
        let snapshot = suggestion.clone();

        self.emit(
            Some(acting),
            if accept {
                AuditAction::CompromiseAccepted
            } else {
                AuditAction::CompromiseRejected
            },
            json!({
                "clause_id": clause_id,
                "round_number": snapshot.round_number,
                "suggestion_id": snapshot.id,
            }),
        );

        if snapshot.both_accepted() {
            self.agree_clause(index, snapshot.suggested_option_id.clone())?;
            self.reconcile()?;
        }
        Ok(snapshot)
    }

    /// Reject the clause's current suggestion in favour of another option.
    pub fn counter_propose(
        &mut self,
        actor: UserId,
        input: CounterProposalInput,
    ) -> NegotiationResult<CounterProposal> {
        let acting = self.acting(actor)?;
        let index = self.clause_index(input.clause_id)?;
        let clause = &self.clauses[index];
        if clause.is_agreed() {
            return Err(NegotiationError::bad_request(format!(
                "clause {} is already agreed",
                clause.title
            )));
        }
        if clause.option(&input.option_id).is_none() {
            return Err(NegotiationError::bad_request(format!(
                "option {} is not valid for clause {}",
                input.option_id, clause.title
            )));
        }
        let s_index = self.current_suggestion_index(input.clause_id, input.round_number)?;
        self.require_negotiating()?;
        let round = self
            .rounds
            .last()
            .map(|r| (r.id, r.round_number))
            .ok_or_else(|| NegotiationError::bad_request("no active negotiation round"))?;
        if self.suggestions[s_index].suggested_option_id == input.option_id {
            return Err(NegotiationError::bad_request(
                "a counter-proposal must differ from the current suggestion",
            ));
        }

        self.suggestions[s_index].set_acceptance(acting.role, false);
        let suggestion_id = self.suggestions[s_index].id;

        let now = Timestamp::now();
        for older in self.counter_proposals.iter_mut().filter(|p| {
            p.clause_id == input.clause_id
                && p.proposing_party_id == acting.party_id
                && p.status == ProposalStatus::Pending
        }) {
            older.status = ProposalStatus::Superseded;
            older.resolved_at = Some(now);
        }

        if let Some(priority) = input.priority {
            let party_id = acting.party_id;
            if let Some(selection) = self
                .selections
                .iter_mut()
                .find(|s| s.clause_id == input.clause_id && s.party_id == party_id)
            {
                selection.priority = priority;
                selection.updated_at = now;
            }
        }

        let proposal = CounterProposal {
            id: ProposalId::new(),
            round_id: round.0,
            round_number: round.1,
            clause_id: input.clause_id,
            suggestion_id,
            proposing_party_id: acting.party_id,
            proposing_role: acting.role,
            proposed_option_id: input.option_id,
            rationale: input.rationale,
            status: ProposalStatus::Pending,
            created_at: now,
            resolved_at: None,
        };
        self.counter_proposals.push(proposal.clone());
        self.emit(
            Some(acting),
            AuditAction::CounterProposalSubmitted,
            json!({
                "proposal_id": proposal.id,
                "clause_id": proposal.clause_id,
                "option_id": proposal.proposed_option_id,
                "round_number": proposal.round_number,
            }),
        );
        Ok(proposal)
    }

    /// Accept or reject the other party's counter-proposal. Accepting agrees
    /// the clause on the proposed option.
    pub fn respond_to_counter_proposal(
        &mut self,
        actor: UserId,
        proposal_id: ProposalId,
        accept: bool,
    ) -> NegotiationResult<CounterResponse> {
        let acting = self.acting(actor)?;
        self.require_negotiating()?;
        let p_index = self
            .counter_proposals
            .iter()
            .position(|p| p.id == proposal_id)
            .ok_or_else(|| NegotiationError::not_found("counter-proposal", proposal_id))?;
        let proposal = &self.counter_proposals[p_index];
        if proposal.proposing_party_id == acting.party_id {
            return Err(NegotiationError::bad_request(
                "you cannot respond to your own counter-proposal",
            ));
        }
        if proposal.status != ProposalStatus::Pending {
            return Err(NegotiationError::bad_request(format!(
                "counter-proposal is already {}",
                proposal.status
            )));
        }
        let clause_id = proposal.clause_id;
        let option = proposal.proposed_option_id.clone();
        let index = self.clause_index(clause_id)?;
        if accept && self.clauses[index].is_agreed() {
            return Err(NegotiationError::bad_request(format!(
                "clause {} is already agreed",
                self.clauses[index].title
            )));
        }

        let now = Timestamp::now();
        let proposal = &mut self.counter_proposals[p_index];
        proposal.status = if accept {
            ProposalStatus::Accepted
        } else {
            ProposalStatus::Rejected
        };
        proposal.resolved_at = Some(now);

        self.emit(
            Some(acting),
            if accept {
                AuditAction::CounterProposalAccepted
            } else {
                AuditAction::CounterProposalRejected
            },
            json!({ "proposal_id": proposal_id, "clause_id": clause_id }),
        );

        if accept {
            for other in self.counter_proposals.iter_mut().filter(|p| {
                p.clause_id == clause_id && p.status == ProposalStatus::Pending
            }) {
                other.status = ProposalStatus::Superseded;
                other.resolved_at = Some(now);
            }
            self.agree_clause(index, option)?;
            self.reconcile()?;
        }
        Ok(CounterResponse {
            accepted: accept,
            all_agreed: self.all_clauses_agreed(),
        })
    }

    /// Start a new round that incorporates pending counter-proposals lying
    /// between both parties' original choices. Party statuses are left as
    /// they are.
    pub fn regenerate(
        &mut self,
        actor: UserId,
        rebalancer: &FairnessRebalancer,
    ) -> NegotiationResult<RoundOutcome> {
        let acting = self.acting(actor)?;
        self.require_negotiating()?;
        self.require_both_parties()?;
        if self.rounds.is_empty() {
            return Err(NegotiationError::bad_request(
                "no round has been generated yet",
            ));
        }
        self.require_open_clauses()?;

        // Newest pending proposal per clause wins; snapshot before superseding.
        let mut counters: HashMap<ClauseId, CounterCandidate> = HashMap::new();
        for p in self
            .counter_proposals
            .iter()
            .filter(|p| p.status == ProposalStatus::Pending)
        {
            counters.insert(
                p.clause_id,
                CounterCandidate {
                    proposer: p.proposing_role,
                    option_id: p.proposed_option_id.clone(),
                },
            );
        }
        let superseded = self.supersede_pending_proposals();

        let outcome = self.run_round(acting, RoundKind::Regenerated, counters, rebalancer)?;
        self.reconcile()?;

        self.emit(
            Some(acting),
            AuditAction::CompromiseRegenerated,
            json!({
                "round_number": outcome.round_number,
                "suggestion_count": outcome.suggestion_count(),
                "counters_applied": outcome.counters_applied.len(),
                "proposals_superseded": superseded,
                "fairness_adjustments": outcome.fairness_adjustments,
            }),
        );
        Ok(outcome)
    }

    // ── Internal helpers ───────────────────────────────────────────────

    fn require_negotiating(&self) -> NegotiationResult<()> {
        if self.deal.status != DealStatus::Negotiating {
            return Err(NegotiationError::bad_request(format!(
                "the deal is {}, not NEGOTIATING",
                self.deal.status
            )));
        }
        Ok(())
    }

    fn require_open_clauses(&self) -> NegotiationResult<()> {
        if self.all_clauses_agreed() {
            return Err(NegotiationError::bad_request("every clause is already agreed"));
        }
        Ok(())
    }

    /// Index of the clause's latest suggestion, checking the caller's view
    /// of the round when given.
    fn current_suggestion_index(
        &self,
        clause_id: ClauseId,
        round_number: Option<u32>,
    ) -> NegotiationResult<usize> {
        let index = self
            .suggestions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.clause_id == clause_id)
            .max_by_key(|(_, s)| s.round_number)
            .map(|(i, _)| i)
            .ok_or_else(|| NegotiationError::not_found("suggestion for clause", clause_id))?;
        if let Some(seen) = round_number {
            let current = self.suggestions[index].round_number;
            if seen != current {
                return Err(NegotiationError::Conflict(format!(
                    "suggestion from round {seen} is no longer current, the latest is round {current}"
                )));
            }
        }
        Ok(index)
    }

    /// Mark every pending counter-proposal superseded. Returns how many.
    fn supersede_pending_proposals(&mut self) -> usize {
        let now = Timestamp::now();
        let mut count = 0;
        for p in self
            .counter_proposals
            .iter_mut()
            .filter(|p| p.status == ProposalStatus::Pending)
        {
            p.status = ProposalStatus::Superseded;
            p.resolved_at = Some(now);
            count += 1;
        }
        count
    }

    fn clause_inputs(&self) -> NegotiationResult<Vec<ClauseInput>> {
        self.clauses
            .iter()
            .filter(|c| !c.is_agreed())
            .map(|c| {
                let choice = |role: PartyRole| {
                    self.selection_for(c.id, role)
                        .map(|s| PartyChoice {
                            option_id: s.option_id.clone(),
                            priority: s.priority,
                            flexibility: s.flexibility,
                        })
                        .ok_or_else(|| {
                            NegotiationError::bad_request(format!(
                                "{} has no selection for clause {}",
                                role.label(),
                                c.title
                            ))
                        })
                };
                Ok(ClauseInput {
                    clause_id: c.id,
                    title: c.title.clone(),
                    options: c.options.clone(),
                    party_a: choice(PartyRole::Initiator)?,
                    party_b: choice(PartyRole::Respondent)?,
                })
            })
            .collect()
    }

    /// Plan and persist one round. Nothing is written if planning fails.
    fn run_round(
        &mut self,
        acting: Acting,
        kind: RoundKind,
        counters: HashMap<ClauseId, CounterCandidate>,
        rebalancer: &FairnessRebalancer,
    ) -> NegotiationResult<RoundOutcome> {
        let inputs = self.clause_inputs()?;
        let plan = plan_round(&inputs, &counters, rebalancer)?;

        let round_number = self.deal.current_round_number + 1;
        let round_id = RoundId::new();
        let now = Timestamp::now();
        self.deal.current_round_number = round_number;
        self.rounds.push(Round {
            id: round_id,
            round_number,
            initiating_party_role: acting.role,
            kind,
            status: RoundStatus::PendingResponse,
            fairness_adjustments: plan.fairness.adjusted,
            created_at: now,
        });

        let mut persisted = Vec::with_capacity(plan.agreed.len() + plan.suggestions.len());
        let mut agreed_clause_ids = Vec::with_capacity(plan.agreed.len());
        for (clause_id, option_id) in plan.agreed {
            persisted.push(CompromiseSuggestion {
                id: SuggestionId::new(),
                round_id,
                round_number,
                clause_id,
                suggested_option_id: option_id.clone(),
                satisfaction_a: Satisfaction::FULL,
                satisfaction_b: Satisfaction::FULL,
                reasoning: SAME_CHOICE_REASONING.to_string(),
                strategy: None,
                fairness_adjusted: false,
                party_a_accepted: Some(true),
                party_b_accepted: Some(true),
                created_at: now,
            });
            let index = self.clause_index(clause_id)?;
            self.agree_clause(index, option_id)?;
            agreed_clause_ids.push(clause_id);
        }
        for s in plan.suggestions {
            persisted.push(CompromiseSuggestion {
                id: SuggestionId::new(),
                round_id,
                round_number,
                clause_id: s.clause_id,
                suggested_option_id: s.suggested_option_id,
                satisfaction_a: s.satisfaction_a,
                satisfaction_b: s.satisfaction_b,
                reasoning: s.reasoning,
                strategy: Some(s.strategy),
                fairness_adjusted: s.fairness_adjusted,
                party_a_accepted: None,
                party_b_accepted: None,
                created_at: now,
            });
            let index = self.clause_index(s.clause_id)?;
            self.clauses[index].status = ClauseStatus::Suggested;
        }
        self.suggestions.extend(persisted.iter().cloned());

        tracing::info!(
            deal_id = %self.deal.id,
            round_number,
            kind = ?kind,
            suggestions = persisted.len(),
            "round persisted"
        );
        Ok(RoundOutcome {
            round_number,
            suggestions: persisted,
            agreed_clause_ids,
            counters_applied: plan.counters_applied,
            fairness_adjustments: plan.fairness.adjusted,
        })
    }
}
