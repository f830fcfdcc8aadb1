//! # dealroom-core: Foundational Types
//!
//! The leaf crate of the dealroom workspace. Every other crate depends on
//! `dealroom-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `DealId`, `PartyId`, `ClauseId`,
//!    `RoundId`, `SuggestionId`, `ProposalId`, `UserId` are distinct types.
//!    You cannot pass a `ClauseId` where a `DealId` is expected.
//!
//! 2. **Validated scores.** `Priority` and `Flexibility` are 1–5, `Bias` is
//!    a finite value in −1..1, `Satisfaction` is 0–100. Out-of-range values
//!    are rejected at construction and at deserialization.
//!
//! 3. **Two roles, never more.** [`PartyRole`] has exactly two variants.
//!    The initiator is "party A", the respondent is "party B".
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dealroom-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod role;
pub mod score;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{ClauseId, ClauseKey, DealId, OptionId, PartyId, ProposalId, RoundId, SuggestionId, UserId};
pub use role::PartyRole;
pub use score::{Bias, Flexibility, Priority, Satisfaction};
pub use temporal::Timestamp;
