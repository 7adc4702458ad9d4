mod database;
pub use database::{Database, StateDatabase};

mod agent;
pub use agent::Agent;

mod polling;
pub use polling::Polling;

#[allow(clippy::module_inception)]
mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;
