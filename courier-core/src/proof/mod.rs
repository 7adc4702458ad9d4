//! `proof` is the proof request and presentation sub-protocol
//!
//! The prover side ([`DisclosedProof`]) receives a proof request, selects one wallet credential
//! for each requested attribute, generates the proof and sends it back:
//!
//! ```text
//! RequestReceived -> CredentialsSelected -> ProofGenerated -> ProofSent -> Verified
//! ```
//!
//! The verifier side ([`VerifierProof`]) sends the request and verifies what it receives:
//!
//! ```text
//! Created -> RequestSent -> ProofReceived -> Verified
//! ```
//!
//! Both sides may end with `Rejected` from any non terminal state.
mod disclosed;
mod usecase;
mod verifier;

pub mod selection;
pub mod types;

pub use disclosed::DisclosedProof;
pub use usecase::Usecase;
pub use verifier::VerifierProof;
