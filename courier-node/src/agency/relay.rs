use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::info;

use prople_courier_core::provisioning::types::{
    AgentKeys, ProvisionConfig, ProvisioningEntityAccessor, ProvisioningError, RelayBuilder,
    RelayIdentity,
};
use prople_courier_core::provisioning::ProvisioningRecord;

use super::hub::{Agency, Registration};
use super::types::{generate_identifier, AgencyError};

#[async_trait]
impl RelayBuilder for Agency {
    async fn discover_identity(&self, endpoint: String) -> Result<RelayIdentity, ProvisioningError> {
        if endpoint != self.endpoint {
            return Err(AgencyError::UnknownEndpoint(endpoint).into());
        }

        Ok(self.identity())
    }

    async fn register(&self, config: ProvisionConfig) -> Result<ProvisioningRecord, ProvisioningError> {
        if config.agency_url != self.endpoint {
            return Err(AgencyError::UnknownEndpoint(config.agency_url).into());
        }

        if config.agency_did != self.identity.did || config.agency_verkey != self.identity.verkey {
            return Err(ProvisioningError::ValidationError(
                "agency identity mismatch".to_string(),
            ));
        }

        let (sdk_to_remote_did, sdk_to_remote_verkey) = generate_identifier();
        let (remote_to_sdk_did, remote_to_sdk_verkey) = generate_identifier();
        let (institution_did, institution_verkey) = generate_identifier();

        let keys = AgentKeys {
            sdk_to_remote_did,
            sdk_to_remote_verkey,
            remote_to_sdk_did,
            remote_to_sdk_verkey,
            institution_did: institution_did.clone(),
            institution_verkey,
        };

        let record = ProvisioningRecord::new(&config, keys.clone());

        let mut mailbox = self.mailbox.write().await;
        mailbox
            .agents
            .insert(institution_did.clone(), Registration { config, keys });

        info!("agency: agent registered: {}", institution_did);
        Ok(record)
    }

    async fn update_webhook(
        &self,
        record: ProvisioningRecord,
        url: String,
    ) -> Result<(), ProvisioningError> {
        let mut mailbox = self.mailbox.write().await;
        let registration = mailbox
            .agents
            .get_mut(&record.get_institution_did())
            .ok_or_else(|| {
                ProvisioningError::WebhookError(
                    AgencyError::UnknownAgent(record.get_institution_did()).to_string(),
                )
            })?;

        if registration.keys != record.get_agent_keys() {
            return Err(ProvisioningError::WebhookError(
                "agent keys mismatch".to_string(),
            ));
        }

        registration.config.webhook_url = Some(url);
        Ok(())
    }
}
