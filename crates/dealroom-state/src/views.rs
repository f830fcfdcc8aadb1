//! Read models computed from a [`DealRoom`] on demand.

use dealroom_core::PartyRole;
use serde::Serialize;

use crate::model::{ClauseInstance, CompromiseSuggestion, Deal, Party, Round};
use crate::room::DealRoom;
use crate::status::ClauseStatus;

/// A clause together with its current suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseView {
    pub clause: ClauseInstance,
    pub current_suggestion: Option<CompromiseSuggestion>,
}

/// Everything a party needs to render a deal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealView {
    pub deal: Deal,
    pub parties: Vec<Party>,
    pub clauses: Vec<ClauseView>,
    pub agreed_count: usize,
    pub total_clauses: usize,
    pub version: u64,
}

/// One round with the suggestions it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundHistoryEntry {
    pub round: Round,
    pub suggestions: Vec<CompromiseSuggestion>,
}

/// Clause counts per status and the latest round's mean satisfaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_clauses: usize,
    pub pending: usize,
    pub suggested: usize,
    pub agreed: usize,
    pub latest_round: Option<u32>,
    /// `None` before the first round.
    pub mean_satisfaction_a: Option<f64>,
    pub mean_satisfaction_b: Option<f64>,
}

impl ProgressSummary {
    pub fn percent_agreed(&self) -> f64 {
        if self.total_clauses == 0 {
            return 0.0;
        }
        self.agreed as f64 * 100.0 / self.total_clauses as f64
    }
}

impl DealRoom {
    pub fn view(&self) -> DealView {
        let clauses = self
            .clauses
            .iter()
            .map(|c| ClauseView {
                clause: c.clone(),
                current_suggestion: self.current_suggestion(c.id).cloned(),
            })
            .collect();
        DealView {
            deal: self.deal.clone(),
            parties: self.parties.clone(),
            clauses,
            agreed_count: self.agreed_count(),
            total_clauses: self.clauses.len(),
            version: self.version,
        }
    }

    /// Rounds in round-number order with their suggestions.
    pub fn round_history(&self) -> Vec<RoundHistoryEntry> {
        let mut rounds: Vec<&Round> = self.rounds.iter().collect();
        rounds.sort_by_key(|r| r.round_number);
        rounds
            .into_iter()
            .map(|round| RoundHistoryEntry {
                round: round.clone(),
                suggestions: self
                    .suggestions
                    .iter()
                    .filter(|s| s.round_id == round.id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    pub fn progress(&self) -> ProgressSummary {
        let count = |status: ClauseStatus| self.clauses.iter().filter(|c| c.status == status).count();
        let latest_round = self.rounds.iter().map(|r| r.round_number).max();
        let latest: Vec<&CompromiseSuggestion> = match latest_round {
            Some(n) => self.suggestions.iter().filter(|s| s.round_number == n).collect(),
            None => Vec::new(),
        };
        let mean = |role: PartyRole| -> Option<f64> {
            if latest.is_empty() {
                return None;
            }
            let sum: f64 = latest
                .iter()
                .map(|s| s.satisfaction(role).as_f64())
                .sum();
            Some(sum / latest.len() as f64)
        };
        ProgressSummary {
            total_clauses: self.clauses.len(),
            pending: count(ClauseStatus::Pending),
            suggested: count(ClauseStatus::Suggested),
            agreed: count(ClauseStatus::Agreed),
            latest_round,
            mean_satisfaction_a: mean(PartyRole::Initiator),
            mean_satisfaction_b: mean(PartyRole::Respondent),
        }
    }
}
