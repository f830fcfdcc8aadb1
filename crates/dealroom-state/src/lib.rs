//! # dealroom-state: Deal Room Aggregate
//!
//! The stateful side of a negotiation. A [`DealRoom`] holds one deal and
//! everything attached to it, and exposes every operation two parties can
//! perform on it:
//!
//! | Stage | Operations |
//! |-------|------------|
//! | Setup | [`DealRoom::create`], [`DealRoom::invite`], [`DealRoom::accept_invitation`] |
//! | Selection | [`DealRoom::submit_selection`], [`DealRoom::bulk_save_selections`], [`DealRoom::submit_all`] |
//! | Rounds | [`DealRoom::generate`], [`DealRoom::respond`], [`DealRoom::counter_propose`], [`DealRoom::respond_to_counter_proposal`], [`DealRoom::regenerate`] |
//! | Closing | [`DealRoom::initiate_signing`], [`DealRoom::record_signature`], [`DealRoom::cancel`] |
//!
//! The compromise math lives in `dealroom-negotiation`; this crate decides
//! when it runs and persists what it returns.
//!
//! ## Deal lifecycle
//!
//! ```text
//! DRAFT ─► AWAITING_RESPONSE ─► NEGOTIATING ─► AGREED ─► SIGNING ─► COMPLETED
//!   └──────────────┴──────────────────┴───────────┴─────────┴──► CANCELLED
//! ```
//!
//! No I/O happens here. Persistence and audit delivery are the host's job:
//! run operations through [`DealRoom::transact`], then drain
//! [`DealRoom::take_audit`].

pub mod audit;
pub mod error;
pub mod model;
pub mod room;
pub mod rounds;
pub mod selection;
pub mod status;
pub mod views;

pub use audit::{AuditAction, AuditRecord};
pub use error::{NegotiationError, NegotiationResult};
pub use model::{
    ClauseInstance, CompromiseSuggestion, CounterProposal, Deal, Party, Round, RoundKind,
    Selection, TransitionRecord,
};
pub use room::{DealRoom, NewDeal};
pub use rounds::{CounterProposalInput, CounterResponse, RoundOutcome};
pub use selection::{SelectionInput, SubmitOutcome};
pub use status::{ClauseStatus, DealStatus, PartyStatus, ProposalStatus, RoundStatus};
pub use views::{ClauseView, DealView, ProgressSummary, RoundHistoryEntry};
