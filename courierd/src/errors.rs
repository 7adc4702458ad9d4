use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("db error: {0}")]
    DbError(String),

    #[error("provisioning error: {0}")]
    ProvisioningError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("output error: {0}")]
    OutputError(String),
}
