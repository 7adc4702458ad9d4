//! `store` is the persistent key/value contract used by all protocol domains
//!
//! Every protocol object (provisioning records, connections, credentials, proofs) is saved
//! as a serialized byte payload under its own [`types::Namespace`]. The physical engine is
//! provided by the implementer of [`types::StoreBuilder`]. This crate ships an in-memory
//! implementation, [`MemoryStore`], a RocksDB based one lives in `prople-courier-node`.
pub mod types;

mod key;
mod locker;
mod memory;
mod repository;

pub use key::compose_key;
pub use locker::KeyLocker;
pub use memory::MemoryStore;
pub use repository::EntityRepo;
