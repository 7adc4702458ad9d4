//! `provisioning` registers an agent to its agency, once per role, agency endpoint and seed
//!
//! The registration result, the [`ProvisioningRecord`], is persisted so a second call with
//! the same inputs never touches the agency again.
mod record;
mod usecase;

pub mod types;

pub use record::ProvisioningRecord;
pub use usecase::Usecase;
