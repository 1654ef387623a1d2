//! The Wildstack game state machine.
//!
//! Pure rules, no IO: every transition here is a plain function over the
//! state, so the rules are unit-testable without a store and can run
//! identically inside a conditional transaction's apply step.
//!
//! # Two layers of state
//!
//! The *persisted shapes* ([`TableState`], [`TurnVector`], [`HandRecord`])
//! are what travels through the shared store — small serde documents, one
//! per path. The *local model* ([`GameState`]) is a client's assembled
//! view: its own visible hand, opponents as counts, the table, and the
//! version counters used for optimistic-concurrency gating.
//!
//! # Invariants
//!
//! - exactly one seat is active in every observed [`TurnVector`] —
//!   violations are state corruption and panic, they are not recoverable
//!   errors;
//! - versions only move forward: stale snapshots are folded away, never
//!   applied backwards;
//! - `finished` is terminal — every operation afterwards returns
//!   [`GameError::Finished`].

mod error;
mod phase;
mod state;
mod table;

pub use error::GameError;
pub use phase::PlayPhase;
pub use state::{DrawOutcome, ForcedDraw, GameState, Hand, PlayOutcome};
pub use table::{Direction, HandRecord, TableState, TurnVector};
