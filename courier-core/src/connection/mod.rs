//! `connection` is the invitation based handshake between two agents
//!
//! The inviter creates an invitation and publishes it out of band. The invitee accepts it.
//! From there, the handshake only progresses through the agency, both sides observe it by
//! refreshing their own local connection object:
//!
//! ```text
//! inviter: Null -> Invited -> Requested -> Responded -> Accepted
//! invitee: Null ------------> Requested -> Responded -> Accepted
//! ```
//!
//! A connection is keyed by its own agent DID and the counterparty's name, so an existing
//! connection can always be resumed instead of being created again.
mod connection;
mod usecase;

pub mod types;

pub use connection::Connection;
pub use usecase::Usecase;
