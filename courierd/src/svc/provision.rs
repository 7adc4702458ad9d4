use cli_table::{print_stdout, Table, WithTitle};
use rst_common::with_logging::log::debug;

use prople_courier_core::provisioning::types::ProvisioningEntityAccessor;

use crate::errors::CourierError;

use super::Daemon;

#[derive(Table, Clone)]
struct ProvisionedAgent {
    #[table(title = "role")]
    role: String,

    #[table(title = "did")]
    did: String,

    #[table(title = "agency")]
    agency: String,

    #[table(title = "wallet")]
    wallet: String,

    #[table(title = "webhook")]
    webhook: String,
}

/// `run` provisions the configured agent, reusing its record when it already exists
pub async fn run(daemon: &Daemon) -> Result<(), CourierError> {
    let agent = daemon.config().agent();
    let (role, _, seed) = agent.get_identity();
    debug!("[provision] role: {}", role);

    let local = daemon
        .node()
        .agent(role, seed, agent.provision_options())
        .await
        .map_err(|err| CourierError::ProvisioningError(err.to_string()))?;

    let record = local.record();
    let rows = vec![ProvisionedAgent {
        role: record.get_role().to_string(),
        did: record.get_institution_did(),
        agency: record.get_agency_endpoint(),
        wallet: record.get_wallet_name(),
        webhook: record.get_webhook_url().unwrap_or_else(|| "-".to_string()),
    }];

    let _ = print_stdout(rows.with_title())
        .map_err(|err| CourierError::OutputError(err.to_string()))?;

    Ok(())
}
