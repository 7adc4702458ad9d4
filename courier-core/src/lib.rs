//! `prople-courier-core` is the protocol orchestration layer used by `prople/courier` agents
//!
//! Two (or more) agents never talk to each other directly. Each of them is registered to an
//! intermediary relay, the `agency`, which stores and forwards their messages. Because of that,
//! nothing happens synchronously here: an agent asks the agency what happened since the last
//! time, reacts to it, saves its new local state, and asks again later.
//!
//! The crate is split into these domains:
//!
//! - `store`, the persistent key/value contract used to keep every protocol object resumable
//! - `provisioning`, registers an agent to the agency exactly once per role, endpoint and seed
//! - `connection`, the invitation based handshake between two agents
//! - `credential`, the offer, request and issue sub-protocol, from both the issuer and the holder side
//! - `proof`, the proof request, selection, generation and verification sub-protocol
//! - `polling`, the single convergence loop used to drive all state machines above
//!
//! ---
//!
//! Every external capability (agency registration, connection transport, credential and proof
//! cryptography) is consumed through a trait defined at each domain's `types` module. The
//! implementations live outside of this crate, a loopback agency is provided by `prople-courier-node`.
//!
//! ```text
//! provisioning ──► connection ──► credential
//!                       │
//!                       └───────► proof
//!
//! (all of them persisted through `store`, advanced through `polling`)
//! ```
pub mod connection;
pub mod credential;
pub mod polling;
pub mod proof;
pub mod provisioning;
pub mod session;
pub mod store;
