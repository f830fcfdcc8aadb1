//! # API Route Modules
//!
//! - `catalog`: contract template listing and lookup.
//! - `deals`: deal room creation, invitation, cancellation and read models
//!   (view, progress, round history, audit trail).
//! - `selections`: per-clause selections, bulk save and submission.
//! - `negotiation`: compromise rounds, responses and counter-proposals.
//! - `signing`: signature gate and completion.
//!
//! Every mutating route accepts `?expected_version=N`; a stale token is
//! rejected with 409 before anything is written.

pub mod catalog;
pub mod deals;
pub mod negotiation;
pub mod selections;
pub mod signing;

use dealroom_core::DealId;
use uuid::Uuid;

pub(crate) fn deal_id(raw: Uuid) -> DealId {
    DealId::from_uuid(raw)
}
