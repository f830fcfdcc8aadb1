//! # dealroom-negotiation: Compromise Algorithms
//!
//! Pure, deterministic functions that turn two parties' clause selections
//! into explainable compromise suggestions. No I/O, no clocks, no
//! randomness: the same inputs always produce the same round.
//!
//! ## Pipeline
//!
//! ```text
//! ClauseInput ─► stake (per party) ─► engine::propose ─┬─► SameChoice (agreed)
//!                                                      └─► ClauseSuggestion
//!                                                              │
//!           counter-proposal override (regeneration only) ◄────┤
//!                                                              ▼
//!                                          FairnessRebalancer (whole round)
//! ```
//!
//! [`round::plan_round`] wires the steps together for one round.

pub mod engine;
pub mod error;
pub mod fairness;
pub mod round;
pub mod stake;

pub use engine::{
    closest_option, counter_proposal_satisfaction, propose, propose_with_counter, satisfaction,
    ClauseInput, ClauseSuggestion, CompromiseOutcome, PartyChoice, Strategy,
    SAME_CHOICE_REASONING,
};
pub use error::CompromiseError;
pub use fairness::{FairnessRebalancer, FairnessReport, SuggestionBatch, FAIRNESS_NOTE};
pub use round::{plan_round, CounterCandidate, RoundPlan};
pub use stake::stake;
