use rst_common::with_logging::log::info;
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use prople_courier_node::agency::Agency;
use prople_courier_node::common::helpers::validate;
use prople_courier_node::config::{Config, Parser};
use prople_courier_node::store::RocksStore;
use prople_courier_node::{DbBuilder, Node};

use crate::errors::CourierError;

pub mod demo;
pub mod inspect;
pub mod provision;

/// `Daemon` holds the parsed configuration and the opened state store
///
/// Every command builds exactly one daemon, the store is shared by all agents it runs.
pub struct Daemon {
    config: Config,
    store: RocksStore,
}

impl Daemon {
    pub fn new(conf_file: String) -> Result<Self, CourierError> {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!(
                        "{}=debug,prople_courier_core=debug,prople_courier_node=debug",
                        env!("CARGO_CRATE_NAME")
                    )
                    .into()
                }),
            )
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();

        let config = Parser::new(conf_file.clone())
            .parse()
            .map_err(|err| CourierError::ConfigError(err.to_string()))?;

        validate(config.clone()).map_err(|err| CourierError::ConfigError(err.to_string()))?;
        info!("courierd: config loaded from {}", conf_file);

        let executor = DbBuilder::new(config.clone())
            .build(|opts| opts.db().state.clone())
            .map_err(|err| CourierError::DbError(err.to_string()))?;

        Ok(Self {
            config,
            store: RocksStore::new(executor),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> RocksStore {
        self.store.clone()
    }

    /// `node` builds a node talking to a fresh loopback agency at the configured endpoint
    pub fn node(&self) -> Node<RocksStore> {
        let (_, endpoint, _) = self.config.agent().get_identity();
        Node::new(
            self.store(),
            Agency::new(endpoint),
            self.config.polling().poll_options(),
        )
    }
}
