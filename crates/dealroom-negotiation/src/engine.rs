//! # Compromise Engine
//!
//! Decides a suggested option for one clause from both parties' selections.
//!
//! ## Decision
//!
//! 1. Each party's stake is computed from its priority, flexibility and its
//!    own bias toward the option it chose.
//! 2. If the stakes differ by less than [`SIMILAR_STAKE_THRESHOLD`], the
//!    option closest to the rounded midpoint of both chosen orders wins.
//! 3. Otherwise the higher-stake party is favored: it gets its exact choice
//!    when the other party's flexibility is at least
//!    [`FLEXIBLE_COUNTERPART`], and otherwise the option closest to a point
//!    [`LEAN_FRACTION`] of the way from its choice toward the other's.
//!
//! Identical choices bypass all of this: the clause is agreed outright with
//! full satisfaction for both parties.
//!
//! ## Satisfaction
//!
//! ```text
//! distance = 1 - |own_order - suggested_order| / (option_count - 1)   (1 if one option)
//! bias_adj = party A: bias_a(suggested) * 0.15
//!            party B: -bias_b(suggested) * 0.15
//! satisfaction = clamp(round((distance + bias_adj) * 100), 0, 100)
//! ```
//!
//! A counter-proposal incorporated by a regeneration scores instead
//! `100 - |own_order - counter_order| / span * 50` where `span` is the
//! distance between both original choices (1 when they coincide).

use dealroom_catalog::ClauseOption;
use dealroom_core::{ClauseId, Flexibility, OptionId, PartyRole, Priority, Satisfaction};
use serde::{Deserialize, Serialize};

use crate::error::CompromiseError;
use crate::stake::stake;

/// Stakes closer than this are treated as equal.
pub const SIMILAR_STAKE_THRESHOLD: f64 = 0.1;
/// Flexibility at or above which the lower-stake party is expected to yield.
pub const FLEXIBLE_COUNTERPART: u8 = 4;
/// Share of the distance moved toward the lower-stake party's choice.
pub const LEAN_FRACTION: f64 = 0.3;
/// Weight of the suggested option's bias in a satisfaction score.
pub const BIAS_SATISFACTION_WEIGHT: f64 = 0.15;

/// Reasoning used when both parties picked the same option.
pub const SAME_CHOICE_REASONING: &str = "Both parties selected the same option.";

/// One party's selection for a clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyChoice {
    pub option_id: OptionId,
    pub priority: Priority,
    pub flexibility: Flexibility,
}

/// Everything the engine needs to reason about one clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseInput {
    pub clause_id: ClauseId,
    pub title: String,
    /// Options sorted by `order`.
    pub options: Vec<ClauseOption>,
    pub party_a: PartyChoice,
    pub party_b: PartyChoice,
}

impl ClauseInput {
    fn choice(&self, role: PartyRole) -> &PartyChoice {
        match role {
            PartyRole::Initiator => &self.party_a,
            PartyRole::Respondent => &self.party_b,
        }
    }

    fn resolve(&self, id: &OptionId) -> Result<&ClauseOption, CompromiseError> {
        self.options
            .iter()
            .find(|o| &o.id == id)
            .ok_or_else(|| CompromiseError::UnknownOption {
                clause_id: self.clause_id,
                option_id: id.clone(),
            })
    }
}

/// Which rule produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Similar stakes: closest option to the midpoint.
    MiddleGround,
    /// The favored party's exact choice.
    ExactChoice(PartyRole),
    /// 30% of the way from the favored party's choice toward the other.
    LeanToward(PartyRole),
    /// A pending counter-proposal from this party was incorporated.
    CounterProposal(PartyRole),
}

/// A suggestion for one divergent clause, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseSuggestion {
    pub clause_id: ClauseId,
    pub clause_title: String,
    #[serde(skip)]
    pub options: Vec<ClauseOption>,
    /// Order of party A's original choice.
    pub order_a: u32,
    /// Order of party B's original choice.
    pub order_b: u32,
    pub suggested_option_id: OptionId,
    pub suggested_order: u32,
    pub satisfaction_a: Satisfaction,
    pub satisfaction_b: Satisfaction,
    pub strategy: Strategy,
    pub reasoning: String,
    pub fairness_adjusted: bool,
}

impl ClauseSuggestion {
    /// Original chosen order of one party.
    pub fn original_order(&self, role: PartyRole) -> u32 {
        match role {
            PartyRole::Initiator => self.order_a,
            PartyRole::Respondent => self.order_b,
        }
    }

    /// Current satisfaction of one party.
    pub fn satisfaction(&self, role: PartyRole) -> Satisfaction {
        match role {
            PartyRole::Initiator => self.satisfaction_a,
            PartyRole::Respondent => self.satisfaction_b,
        }
    }
}

/// Result of running the engine on one clause.
#[derive(Debug, Clone, PartialEq)]
pub enum CompromiseOutcome {
    /// Both parties chose this option. The clause is agreed outright.
    SameChoice { option_id: OptionId },
    /// The parties diverge; here is the suggestion.
    Suggested(ClauseSuggestion),
}

/// The option whose order is closest to `target`. Ties go to the option
/// listed first. `None` only when `options` is empty.
pub fn closest_option(options: &[ClauseOption], target: f64) -> Option<&ClauseOption> {
    let mut best: Option<(&ClauseOption, f64)> = None;
    for option in options {
        let distance = (f64::from(option.order) - target).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((option, distance)),
        }
    }
    best.map(|(o, _)| o)
}

/// Satisfaction of `role` with `suggested`, given the order it chose and
/// how many options the clause offers.
pub fn satisfaction(
    role: PartyRole,
    chosen_order: u32,
    suggested: &ClauseOption,
    option_count: usize,
) -> Satisfaction {
    let distance_sat = if option_count <= 1 {
        1.0
    } else {
        let gap = (f64::from(chosen_order) - f64::from(suggested.order)).abs();
        1.0 - gap / (option_count as f64 - 1.0)
    };
    let bias_adj = match role {
        PartyRole::Initiator => suggested.bias_a.value(),
        PartyRole::Respondent => -suggested.bias_b.value(),
    } * BIAS_SATISFACTION_WEIGHT;
    Satisfaction::from_score((distance_sat + bias_adj) * 100.0)
}

/// Satisfaction of a party with an incorporated counter-proposal.
pub fn counter_proposal_satisfaction(own_order: u32, counter_order: u32, span: u32) -> Satisfaction {
    let span = if span == 0 { 1.0 } else { f64::from(span) };
    let gap = (f64::from(own_order) - f64::from(counter_order)).abs();
    Satisfaction::from_score(100.0 - (gap / span) * 50.0)
}

/// Run the engine on one clause.
pub fn propose(input: &ClauseInput) -> Result<CompromiseOutcome, CompromiseError> {
    if input.options.is_empty() {
        return Err(CompromiseError::NoOptions {
            clause_id: input.clause_id,
        });
    }
    let opt_a = input.resolve(&input.party_a.option_id)?;
    let opt_b = input.resolve(&input.party_b.option_id)?;

    if opt_a.id == opt_b.id {
        return Ok(CompromiseOutcome::SameChoice {
            option_id: opt_a.id.clone(),
        });
    }

    let stake_a = stake(input.party_a.priority, input.party_a.flexibility, opt_a.bias_a);
    let stake_b = stake(input.party_b.priority, input.party_b.flexibility, opt_b.bias_b);
    let diff = (stake_a - stake_b).abs();

    let (suggested, strategy) = if diff < SIMILAR_STAKE_THRESHOLD {
        let midpoint = ((f64::from(opt_a.order) + f64::from(opt_b.order)) / 2.0).round();
        (closest(input, midpoint)?, Strategy::MiddleGround)
    } else {
        let favored = if stake_a > stake_b {
            PartyRole::Initiator
        } else {
            PartyRole::Respondent
        };
        let (own, other) = match favored {
            PartyRole::Initiator => (opt_a, opt_b),
            PartyRole::Respondent => (opt_b, opt_a),
        };
        let other_flex = input.choice(favored.counterpart()).flexibility.value();
        if other_flex >= FLEXIBLE_COUNTERPART {
            (own, Strategy::ExactChoice(favored))
        } else {
            let own_order = f64::from(own.order);
            let target = own_order + (f64::from(other.order) - own_order) * LEAN_FRACTION;
            (closest(input, target)?, Strategy::LeanToward(favored))
        }
    };

    let reasoning = reasoning(input, strategy, suggested, stake_a, stake_b);
    Ok(CompromiseOutcome::Suggested(build(
        input, opt_a, opt_b, suggested, strategy, reasoning,
    )))
}

/// Suggestion incorporating a counter-proposal, if its option lies between
/// both parties' original choices (inclusive). `Ok(None)` means the
/// counter-proposal is outside that span and must be ignored.
pub fn propose_with_counter(
    input: &ClauseInput,
    proposer: PartyRole,
    counter_option: &OptionId,
) -> Result<Option<ClauseSuggestion>, CompromiseError> {
    let opt_a = input.resolve(&input.party_a.option_id)?;
    let opt_b = input.resolve(&input.party_b.option_id)?;
    let counter = input.resolve(counter_option)?;

    let low = opt_a.order.min(opt_b.order);
    let high = opt_a.order.max(opt_b.order);
    if counter.order < low || counter.order > high {
        return Ok(None);
    }

    let span = high - low;
    let strategy = Strategy::CounterProposal(proposer);
    let stake_a = stake(input.party_a.priority, input.party_a.flexibility, opt_a.bias_a);
    let stake_b = stake(input.party_b.priority, input.party_b.flexibility, opt_b.bias_b);
    let reasoning = reasoning(input, strategy, counter, stake_a, stake_b);
    let mut suggestion = build(input, opt_a, opt_b, counter, strategy, reasoning);
    suggestion.satisfaction_a = counter_proposal_satisfaction(opt_a.order, counter.order, span);
    suggestion.satisfaction_b = counter_proposal_satisfaction(opt_b.order, counter.order, span);
    Ok(Some(suggestion))
}

fn closest<'a>(input: &'a ClauseInput, target: f64) -> Result<&'a ClauseOption, CompromiseError> {
    closest_option(&input.options, target).ok_or(CompromiseError::NoOptions {
        clause_id: input.clause_id,
    })
}

fn build(
    input: &ClauseInput,
    opt_a: &ClauseOption,
    opt_b: &ClauseOption,
    suggested: &ClauseOption,
    strategy: Strategy,
    reasoning: String,
) -> ClauseSuggestion {
    let n = input.options.len();
    ClauseSuggestion {
        clause_id: input.clause_id,
        clause_title: input.title.clone(),
        options: input.options.clone(),
        order_a: opt_a.order,
        order_b: opt_b.order,
        suggested_option_id: suggested.id.clone(),
        suggested_order: suggested.order,
        satisfaction_a: satisfaction(PartyRole::Initiator, opt_a.order, suggested, n),
        satisfaction_b: satisfaction(PartyRole::Respondent, opt_b.order, suggested, n),
        strategy,
        reasoning,
        fairness_adjusted: false,
    }
}

fn reasoning(
    input: &ClauseInput,
    strategy: Strategy,
    suggested: &ClauseOption,
    stake_a: f64,
    stake_b: f64,
) -> String {
    match strategy {
        Strategy::MiddleGround => format!(
            "Both parties attach similar weight to {} (stakes {:.2} and {:.2}), so the middle-ground option \"{}\" is suggested.",
            input.title, stake_a, stake_b, suggested.label
        ),
        Strategy::ExactChoice(role) => {
            let (own, other) = ordered(role, stake_a, stake_b);
            format!(
                "{} has more at stake in {} ({:.2} vs {:.2}) and {} indicated high flexibility, so {}'s preferred option \"{}\" is suggested.",
                role.label(),
                input.title,
                own,
                other,
                role.counterpart().label(),
                role.label(),
                suggested.label
            )
        }
        Strategy::LeanToward(role) => {
            let (own, other) = ordered(role, stake_a, stake_b);
            format!(
                "{} has more at stake in {} ({:.2} vs {:.2}), so \"{}\" is suggested, moving part of the way toward {}'s choice.",
                role.label(),
                input.title,
                own,
                other,
                suggested.label,
                role.counterpart().label()
            )
        }
        Strategy::CounterProposal(role) => format!(
            "Incorporates {}'s counter-proposal \"{}\" for {}, which lies between both parties' original choices.",
            role.label(),
            suggested.label,
            input.title
        ),
    }
}

fn ordered(role: PartyRole, stake_a: f64, stake_b: f64) -> (f64, f64) {
    match role {
        PartyRole::Initiator => (stake_a, stake_b),
        PartyRole::Respondent => (stake_b, stake_a),
    }
}
