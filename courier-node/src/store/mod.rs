//! `store` provides the RocksDB implementation of the core `StoreBuilder` contract
mod rocks;
pub use rocks::RocksStore;
