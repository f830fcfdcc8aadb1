//! # Round Planning
//!
//! Runs the compromise engine over every open clause of a deal, applies
//! pending counter-proposals where they fall inside the parties' span, and
//! finishes with the fairness pass. The result is a plan; persisting it is
//! the caller's job.

use std::collections::HashMap;

use dealroom_core::{ClauseId, OptionId, PartyRole};

use crate::engine::{self, ClauseInput, ClauseSuggestion, CompromiseOutcome};
use crate::error::CompromiseError;
use crate::fairness::{FairnessRebalancer, FairnessReport, SuggestionBatch};

/// A pending counter-proposal to consider for one clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterCandidate {
    pub proposer: PartyRole,
    pub option_id: OptionId,
}

/// Outcome of planning one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPlan {
    /// Clauses where both parties chose the same option.
    pub agreed: Vec<(ClauseId, OptionId)>,
    /// Suggestions for divergent clauses, after the fairness pass.
    pub suggestions: Vec<ClauseSuggestion>,
    /// Clauses whose counter-proposal was incorporated.
    pub counters_applied: Vec<ClauseId>,
    pub fairness: FairnessReport,
}

/// Plan a round. Fails before producing anything if any clause references
/// an option it does not offer.
pub fn plan_round(
    inputs: &[ClauseInput],
    counters: &HashMap<ClauseId, CounterCandidate>,
    rebalancer: &FairnessRebalancer,
) -> Result<RoundPlan, CompromiseError> {
    let mut agreed = Vec::new();
    let mut divergent = Vec::new();
    let mut counters_applied = Vec::new();

    for input in inputs {
        match engine::propose(input)? {
            CompromiseOutcome::SameChoice { option_id } => agreed.push((input.clause_id, option_id)),
            CompromiseOutcome::Suggested(suggestion) => {
                let overridden = match counters.get(&input.clause_id) {
                    Some(counter) => {
                        engine::propose_with_counter(input, counter.proposer, &counter.option_id)?
                    }
                    None => None,
                };
                match overridden {
                    Some(s) => {
                        counters_applied.push(input.clause_id);
                        divergent.push(s);
                    }
                    None => divergent.push(suggestion),
                }
            }
        }
    }

    let mut batch = SuggestionBatch::new(divergent);
    let fairness = rebalancer.apply(&mut batch);

    Ok(RoundPlan {
        agreed,
        suggestions: batch.into_suggestions(),
        counters_applied,
        fairness,
    })
}
