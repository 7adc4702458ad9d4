//! `agency` is an in-process loopback relay
//!
//! It implements every external capability of `prople-courier-core`: agent registration,
//! the connection transport and the credential and proof exchanges. Nothing leaves the process
//! and no real cryptography is involved. It is used to run complete workflows between local
//! agents, by the daemon's demo and by the end to end tests.
//!
//! ```text
//! faber ── AgentClient ──┐                  ┌── AgentClient ── alice
//!                        └──► Agency ◄──────┘
//!                           (routes by pairwise DID)
//! ```
pub mod types;

mod credential;
mod hub;
mod proof;
mod relay;
mod transport;

pub use hub::{Agency, AgentClient};
