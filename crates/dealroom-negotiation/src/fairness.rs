//! # Fairness Pass
//!
//! Per-clause suggestions can each be reasonable while the round as a whole
//! leans toward one party. The pass compares mean satisfaction across a
//! round's divergent clauses and, when the gap exceeds
//! [`FairnessRebalancer::threshold`], nudges every suggestion toward the
//! disadvantaged party's original choice:
//!
//! ```text
//! target = round(current_order * 0.9 + disadvantaged_original_order * 0.1)
//! ```
//!
//! A suggestion whose closest option to `target` differs from the current
//! one is replaced, rescored and marked `fairness_adjusted`. The pass is
//! idempotent on content: a batch that already carries an adjusted
//! suggestion is left alone, even when it is rebuilt from those suggestions.

use dealroom_core::PartyRole;
use serde::Serialize;

use crate::engine::{closest_option, satisfaction, ClauseSuggestion};

/// Text appended to the reasoning of an adjusted suggestion.
pub const FAIRNESS_NOTE: &str = "(Adjusted for overall fairness between parties.)";

/// One round's divergent suggestions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionBatch {
    pub suggestions: Vec<ClauseSuggestion>,
    fairness_applied: bool,
}

impl SuggestionBatch {
    pub fn new(suggestions: Vec<ClauseSuggestion>) -> Self {
        Self {
            suggestions,
            fairness_applied: false,
        }
    }

    /// Whether the fairness pass has already run on this batch or on the
    /// suggestions it holds.
    pub fn fairness_applied(&self) -> bool {
        self.fairness_applied || self.suggestions.iter().any(|s| s.fairness_adjusted)
    }

    /// Mean satisfaction of one party, `None` for an empty batch.
    pub fn mean_satisfaction(&self, role: PartyRole) -> Option<f64> {
        if self.suggestions.is_empty() {
            return None;
        }
        let total: f64 = self
            .suggestions
            .iter()
            .map(|s| s.satisfaction(role).as_f64())
            .sum();
        Some(total / self.suggestions.len() as f64)
    }

    pub fn into_suggestions(self) -> Vec<ClauseSuggestion> {
        self.suggestions
    }
}

/// What a fairness pass observed and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairnessReport {
    pub mean_satisfaction_a: Option<f64>,
    pub mean_satisfaction_b: Option<f64>,
    /// Party with the lower mean when the gap exceeded the threshold.
    pub disadvantaged: Option<PartyRole>,
    /// Number of suggestions whose option changed.
    pub adjusted: usize,
    /// True when the batch had already been processed.
    pub already_applied: bool,
}

/// Batch-level rebalancing of a round's suggestions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairnessRebalancer {
    /// Largest tolerated gap between mean satisfactions.
    pub threshold: f64,
    /// Weight of the disadvantaged party's original order in the target.
    pub pull: f64,
}

impl Default for FairnessRebalancer {
    fn default() -> Self {
        Self {
            threshold: 15.0,
            pull: 0.1,
        }
    }
}

impl FairnessRebalancer {
    /// Run the pass over `batch` in place.
    pub fn apply(&self, batch: &mut SuggestionBatch) -> FairnessReport {
        let mean_a = batch.mean_satisfaction(PartyRole::Initiator);
        let mean_b = batch.mean_satisfaction(PartyRole::Respondent);
        let mut report = FairnessReport {
            mean_satisfaction_a: mean_a,
            mean_satisfaction_b: mean_b,
            disadvantaged: None,
            adjusted: 0,
            already_applied: batch.fairness_applied(),
        };
        if report.already_applied {
            return report;
        }
        batch.fairness_applied = true;

        let (Some(avg_a), Some(avg_b)) = (mean_a, mean_b) else {
            return report;
        };
        if (avg_a - avg_b).abs() <= self.threshold {
            return report;
        }

        let disadvantaged = if avg_a < avg_b {
            PartyRole::Initiator
        } else {
            PartyRole::Respondent
        };
        report.disadvantaged = Some(disadvantaged);

        for suggestion in &mut batch.suggestions {
            if self.nudge(suggestion, disadvantaged) {
                report.adjusted += 1;
            }
        }

        tracing::debug!(
            avg_a,
            avg_b,
            disadvantaged = %disadvantaged,
            adjusted = report.adjusted,
            "fairness pass rebalanced round"
        );
        report
    }

    fn nudge(&self, suggestion: &mut ClauseSuggestion, disadvantaged: PartyRole) -> bool {
        let current = f64::from(suggestion.suggested_order);
        let original = f64::from(suggestion.original_order(disadvantaged));
        let target = (current * (1.0 - self.pull) + original * self.pull).round();

        let Some(picked) = closest_option(&suggestion.options, target) else {
            return false;
        };
        if picked.id == suggestion.suggested_option_id {
            return false;
        }

        let picked = picked.clone();
        let n = suggestion.options.len();
        suggestion.satisfaction_a = satisfaction(PartyRole::Initiator, suggestion.order_a, &picked, n);
        suggestion.satisfaction_b = satisfaction(PartyRole::Respondent, suggestion.order_b, &picked, n);
        suggestion.suggested_option_id = picked.id;
        suggestion.suggested_order = picked.order;
        suggestion.reasoning = format!(
            "{} Rebalanced to \"{}\". {}",
            suggestion.reasoning, picked.label, FAIRNESS_NOTE
        );
        suggestion.fairness_adjusted = true;
        true
    }
}
