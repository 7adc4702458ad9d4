//! `polling` is the convergence engine shared by every protocol state machine
//!
//! All protocol progress depends on the counterparty, reached through the agency. The only way
//! to observe it is to refresh the local object and compare states. [`await_terminal`] repeats
//! that refresh until a terminal state is reached, bounded by [`PollOptions`] and an optional
//! external [`StopSignal`].
//!
//! The [`graph`] module contains the shared rules to move a local state machine forward
//! when a newer remote state has been observed.
pub mod graph;
pub mod types;

mod engine;

pub use engine::await_terminal;
pub use types::{PollError, PollFailure, PollOptions, StopSignal, Stopper};
