//! `credential` is the offer, request and issue sub-protocol
//!
//! It runs over an `Accepted` connection. Issuer and holder keep their own independent
//! local views, [`IssuerCredential`] and [`HolderCredential`].
//!
//! ```text
//! issuer: Created -> OfferSent -> RequestReceived -> Issued
//! holder: Initialized -> RequestSent -> Accepted
//! ```
//!
//! Both sides may end with `Rejected` from any non terminal state.
mod holder;
mod issuer;
mod usecase;

pub mod types;

pub use holder::HolderCredential;
pub use issuer::IssuerCredential;
pub use usecase::Usecase;
