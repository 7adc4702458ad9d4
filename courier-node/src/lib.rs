//! `prople-courier-node` is the infrastructure side of `prople/courier` agents
//!
//! It provides the pieces `prople-courier-core` leaves to its implementers:
//!
//! - `config`, the TOML node configuration
//! - `store`, the RocksDB implementation of the state store
//! - `agency`, an in-process loopback agency implementing every external capability
//! - [`Node`], the wiring of a store and an agency into provisioned local agents
pub mod agency;
pub mod common;
pub mod config;
pub mod store;

mod db;
pub use db::Builder as DbBuilder;

mod node;
pub use node::{LocalAgent, Node};
